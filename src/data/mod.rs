// src/data/mod.rs

//! The `data` module is data containers and codecs for kernel log
//! records: [`RawRecord`]s, their [`Timestamp`]s, and the wall-clock
//! rendering choices of [`TimeFormat`].
//!
//! ## Definitions of data
//!
//! ### Record
//!
//! A "record" is one kernel log entry: a severity level, a facility, a
//! time since boot, and a message. It is represented by a [`RawRecord`].
//!
//! A record is decoded from one of two encodings.
//!
//! #### Legacy encoding
//!
//! The `syslog(2)` buffer and saved buffer files hold records like
//!
//! ```text
//! <6>[    1.234567] message text
//! ```
//!
//! separated by a newline that is directly followed by `<`.
//! Decoded by a [`LegacyReader`].
//!
//! #### kmsg encoding
//!
//! Each `read` of `/dev/kmsg` returns one "physical record" like
//!
//! ```text
//! 6,339,5140900,-;message text
//!  SUBSYSTEM=acpi
//! ```
//!
//! A long line may arrive as several physical records ("fragments") which
//! are reassembled into one record by a [`KmsgReader`].
//!
//! [`RawRecord`]: crate::data::record::RawRecord
//! [`Timestamp`]: crate::data::timestamp::Timestamp
//! [`TimeFormat`]: crate::data::datetime::TimeFormat
//! [`LegacyReader`]: crate::readers::legacyreader::LegacyReader
//! [`KmsgReader`]: crate::readers::kmsgreader::KmsgReader

pub mod datetime;
pub mod record;
pub mod timestamp;
