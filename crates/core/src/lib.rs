//! Domain types and pure logic for the vidshim job handler.
//!
//! Holds the job/result data model, input validation, and the handler
//! configuration. Nothing in this crate performs I/O beyond reading
//! environment variables at startup.

pub mod config;
pub mod error;
pub mod types;
pub mod validation;
