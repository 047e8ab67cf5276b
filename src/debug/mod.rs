// src/debug/mod.rs

//! Diagnostic printing for debug builds, and fixtures for test builds.
//!
//! Function tracing itself comes from crate `si_trace_print`.

#[cfg(test)]
pub mod helpers;

pub mod printers;
