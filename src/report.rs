// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Human-readable timeout diagnostics.
//!
//! A failed wait must say what was waited on, what was expected and what was last
//! seen, so a test log explains itself without re-running against the cluster:
//!
//! ```text
//! timed out after 300s (budget 300s) waiting for co/kube-apiserver
//!   expected (exact): {Available="True", Degraded="False", Progressing="False"}
//!   last observed at 2025-03-01T10:15:00Z: {Available="True", Degraded="False", Progressing="True"}
//!   mismatched:
//!     Progressing: expected "False", observed "True"
//!   attempts: 21 (0 failed)
//! ```

use crate::matcher::mismatches;
use crate::poll::TimedOut;
use chrono::SecondsFormat;
use std::fmt::{self, Write as _};

/// Render the multi-line report for a timed-out poll.
#[must_use]
pub fn format_timed_out(report: &TimedOut) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &TimedOut) -> fmt::Result {
    writeln!(
        out,
        "timed out after {}s (budget {}s) waiting for {}",
        report.elapsed.as_secs(),
        report.timeout.as_secs(),
        report.target
    )?;
    writeln!(out, "  expected ({}): {}", report.mode, report.expected)?;

    match report.last.observed_at() {
        Some(at) => writeln!(
            out,
            "  last observed at {}: {}",
            at.to_rfc3339_opts(SecondsFormat::Secs, true),
            report.last
        )?,
        None => writeln!(out, "  last observed: {}", report.last)?,
    }

    let missing = mismatches(&report.last, &report.expected, report.mode);
    if !missing.is_empty() && !report.last.is_empty() {
        writeln!(out, "  mismatched:")?;
        for m in missing {
            match m.observed {
                Some(observed) => writeln!(
                    out,
                    "    {}: expected {:?}, observed {:?}",
                    m.key, m.expected, observed
                )?,
                None => writeln!(out, "    {}: expected {:?}, not observed", m.key, m.expected)?,
            }
        }
    }

    write!(
        out,
        "  attempts: {} ({} failed)",
        report.attempts, report.failed_attempts
    )?;
    if let Some(err) = &report.last_error {
        write!(out, "\n  last error: {err}")?;
    }
    Ok(())
}

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_timed_out(self))
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod report_tests;
