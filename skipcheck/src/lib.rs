//! Skip decisions for CI workflow runs.
//!
//! Decides whether a workflow run can be skipped because an earlier
//! successful run already covered identical content, because another run of
//! the same workflow is in flight, or because every commit since a successful
//! run only touched paths the configuration does not care about. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (glob matching, duplicate
//!   detection, concurrency policies, per-commit filter rules). No I/O.
//! - **[`io`]**: Adapters for run registries, commit history, cancellation and
//!   configuration. Each adapter sits behind a trait so tests can script it.
//!
//! [`backtrack`] walks commit ancestry through the history adapter and
//! [`decide`] combines every stage into a single [`decide::Decision`].

pub mod backtrack;
pub mod core;
pub mod decide;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
