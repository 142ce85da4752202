// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tracing subscriber setup.
//!
//! Format: `timestamp file:line LEVEL message fields`, e.g.
//! `2025-11-29T23:45:00.123456Z poll.rs:255 INFO Resource converged resource=co/dns`.
//!
//! `RUST_LOG` filters as usual (default `info`); `RUST_LOG_FORMAT=json` switches to
//! one JSON object per line for CI log collectors.

use crate::constants::LOG_FORMAT_ENV;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Output format of the subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Text,
    /// JSON lines
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "" => Ok(LogFormat::Text),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl LogFormat {
    /// Read `RUST_LOG_FORMAT`; anything unrecognised means text.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_target(false)
            .json()
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_target(false)
            .with_ansi(true)
            .compact()
            .try_init(),
    }
}
