// src/tests/mod.rs

//! Tests for _krrlib_.
//!
//! Tests are placed at `src/tests/`, inside the `krrlib`, so that they can
//! reach crate-internal items.

pub mod common;
pub mod printers_tests;
pub mod syslogbuffer_tests;
