// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # clusterwait - convergence polling for OpenShift end-to-end tests
//!
//! clusterwait waits for a cluster to reach a declared state: poll a resource at a
//! fixed interval, compare what it reports against an expected set of condition
//! values, and either return the matching observation or time out with a report
//! that says exactly what was last seen.
//!
//! ## Overview
//!
//! - A caller declares an expected [`condition::ConditionSet`] and a
//!   [`client::Target`]
//! - [`lifecycle::ResourceLifecycle`] creates or patches a scoped test resource
//! - [`poll::run`] samples a [`query::ConditionQuery`], matches the
//!   [`condition::Snapshot`] with [`matcher::matches`], and returns a
//!   [`poll::Outcome`]
//! - a timeout is rendered by [`report`]; the scoped resource is released on every
//!   exit path
//!
//! ## Modules
//!
//! - [`client`] - the `ClusterClient` seam and resource references
//! - [`oc`] / [`kube_client`] - client backends (`oc` binary, Kubernetes API)
//! - [`condition`] - expected sets, snapshots and field paths
//! - [`jsonpath`] - the kubectl jsonpath subset used by field paths
//! - [`query`] - condition queries
//! - [`matcher`] - snapshot matching
//! - [`poll`] - the bounded-retry loop
//! - [`report`] - timeout diagnostics
//! - [`lifecycle`] - scoped test resources
//! - [`operators`], [`rollout`], [`topology`] - ready-made waits
//! - [`config`], [`logging`] - runtime configuration and tracing setup
//! - [`testing`] - an in-memory cluster for tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use clusterwait::condition::ConditionSet;
//! use clusterwait::oc::OcClient;
//! use clusterwait::operators::wait_co_becomes;
//! use clusterwait::poll::PollSpec;
//!
//! # async fn example() -> Result<(), clusterwait::errors::ConvergenceError> {
//! let oc = OcClient::default().as_admin(true);
//! let expected = ConditionSet::from([("Available", "True"), ("Progressing", "True")]);
//! wait_co_becomes(&oc, "kube-apiserver", &expected, &PollSpec::from_secs(30, 300))
//!     .await
//!     .into_result()?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod condition;
pub mod config;
pub mod constants;
pub mod errors;
pub mod jsonpath;
pub mod kube_client;
pub mod lifecycle;
pub mod logging;
pub mod matcher;
pub mod oc;
pub mod operators;
pub mod poll;
pub mod query;
pub mod report;
pub mod rollout;
pub mod testing;
pub mod topology;
