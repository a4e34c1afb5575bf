//! Command handlers.
//!
//! Each handler is a thin wrapper: parse terminal input, call the runtime,
//! print the result.

pub mod config;
pub mod run;
