//! Logging facility
//!
//! Structured logging via `tracing`. Mutating document operations emit
//! debug events; undo/redo boundaries and consistency failures emit at
//! info/error level.

pub mod init;

pub use init::{init, Profile};
