//! ComfyUI REST client library.
//!
//! Provides the HTTP API wrapper, a best-effort reachability wait,
//! image staging, history interpretation, and video output extraction
//! for driving a local ComfyUI server from the job handler.

pub mod api;
pub mod history;
pub mod outputs;
pub mod readiness;
pub mod uploads;
