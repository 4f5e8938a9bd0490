//! I/O adapters for skip decisions.

pub mod cancel;
pub mod config;
pub mod history;
pub mod registry;
