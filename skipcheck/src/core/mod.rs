//! Deterministic, pure logic shared by the decision engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod concurrency;
pub mod duplicate;
pub mod filter;
pub mod glob;
pub mod types;
