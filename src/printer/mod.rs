// src/printer/mod.rs

//! The `printer` module is for printing user-facing kernel records
//! ([`RawRecord`s]) with a facility and level prefix, a time prefix in one
//! of several [`TimeFormat`s], and optional color.
//!
//! [`RawRecord`s]: crate::data::record::RawRecord
//! [`TimeFormat`s]: crate::data::datetime::TimeFormat

pub mod printers;
