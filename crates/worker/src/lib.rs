//! `vidshim-worker` library crate.
//!
//! Houses the job handler state machine and the surfaces that drive it
//! (local runner, HTTP job endpoint). The binary entrypoint lives in
//! `main.rs`; integration tests link against this library.

pub mod background;
pub mod config;
pub mod error;
pub mod handler;
pub mod routes;
pub mod runner;
pub mod state;
pub mod store;
