//! Background tasks spawned in serve mode.

pub mod prompt_retention;
