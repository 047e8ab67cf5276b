// src/readers/mod.rs

//! "Readers" for _krrlib_.
//!
//! ## Overview of readers
//!
//! * A [`Session`] chooses one backend and drives its reader to derive
//!   [`RawRecord`s], filtering and printing each.
//! * A [`KmsgReader`] reads `/dev/kmsg` one physical record at a time and
//!   reassembles fragments.
//! * A [`LegacyReader`] decodes one large legacy buffer, either a
//!   `syslog(2)` snapshot taken by [`read_syslog_buffer`] or a saved buffer
//!   file mapped by a [`MappedFile`].
//!
//! <br/>
//!
//! _These are not rust "Readers"; these structs do not implement the trait
//! [`Read`]. These are "readers" in an informal sense._
//!
//! [`Read`]: std::io::Read
//! [`RawRecord`s]: crate::data::record::RawRecord
//! [`Session`]: crate::readers::session::Session
//! [`KmsgReader`]: crate::readers::kmsgreader::KmsgReader
//! [`LegacyReader`]: crate::readers::legacyreader::LegacyReader
//! [`MappedFile`]: crate::readers::mmapreader::MappedFile
//! [`read_syslog_buffer`]: crate::readers::syslogbuffer::read_syslog_buffer

use crate::common::ResultS3;
use crate::data::record::RawRecord;

pub mod config;
pub mod error;
pub mod kmsgreader;
pub mod legacyreader;
pub mod mmapreader;
pub mod session;
pub mod syslogbuffer;

/// Result of [`RecordSource::next_record`].
#[allow(non_camel_case_types)]
pub type ResultS3_Record<'a> = ResultS3<RawRecord<'a>, std::io::Error>;

/// A pull-based source of kernel records.
///
/// The returned record borrows the source, it must be dropped before the
/// next call.
pub trait RecordSource {
    /// Return the next record, `Done` when the source is exhausted.
    fn next_record(&mut self) -> ResultS3_Record<'_>;
}
