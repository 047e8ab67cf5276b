// src/readers/legacyreader.rs

//! Implements [`LegacyReader`], the decoder of the legacy kernel buffer
//! encoding used by `syslog(2)` and by saved buffer files.
//!
//! A legacy buffer is a sequence of records
//!
//! ```text
//! <5>[  100.000000] boot ok
//! <3>[  101.500000] disk error
//! ```
//!
//! A record ends at the end of the buffer or at a newline directly followed
//! by `<`. A message line that itself begins with `<` is therefore taken as
//! the start of a new record; the encoding has no escaping for this.
//!
//! [`LegacyReader`]: self::LegacyReader

use crate::common::{Bytes, Count, ResultS3};
use crate::data::record::{parse_priority, RawRecord};
use crate::data::timestamp::parse_legacy_timestamp;
#[cfg(any(debug_assertions, test))]
use crate::debug::printers::buffer_to_String_noraw;
use crate::readers::mmapreader::MappedFile;
use crate::readers::RecordSource;

use std::io::Error;

use ::bstr::ByteSlice;
use ::memchr::memmem;
#[allow(unused_imports)]
use ::more_asserts::{debug_assert_le, debug_assert_lt};
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

/// Record boundary; a newline followed by the `<` of the next priority.
const BOUNDARY: &[u8; 2] = b"\n<";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RecordBuffer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The bytes a [`LegacyReader`] decodes.
#[derive(Debug)]
pub enum RecordBuffer {
    /// A snapshot of the `syslog(2)` buffer.
    Owned(Bytes),
    /// A saved buffer file, released page by page.
    Mapped(MappedFile),
}

impl RecordBuffer {
    pub fn len(&self) -> usize {
        match self {
            RecordBuffer::Owned(bytes) => bytes.len(),
            RecordBuffer::Mapped(mapped) => mapped.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes from `offset` to the end.
    pub fn bytes_from(&self, offset: usize) -> &[u8] {
        match self {
            RecordBuffer::Owned(bytes) => bytes.get(offset..).unwrap_or(&[]),
            RecordBuffer::Mapped(mapped) => mapped.bytes_from(offset),
        }
    }

    /// Give back consumed memory behind `cursor`, if the buffer can.
    pub fn release_behind(&mut self, cursor: usize) -> Count {
        match self {
            RecordBuffer::Owned(_) => 0,
            RecordBuffer::Mapped(mapped) => mapped.release_behind(cursor),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LegacyReader
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which record prefixes a [`LegacyReader`] parses.
///
/// A prefix that is not parsed is still stepped over; its fields are left
/// absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LegacyDecode {
    /// parse `<priority>`
    pub priority: bool,
    /// parse `[seconds.microseconds]`
    pub timestamp: bool,
}

impl Default for LegacyDecode {
    fn default() -> Self {
        LegacyDecode {
            priority: true,
            timestamp: true,
        }
    }
}

/// Offsets of the next record found in a [`RecordBuffer`].
#[derive(Debug, PartialEq, Eq)]
struct RecordSpan {
    /// first byte of the record
    beg: usize,
    /// one past the last byte of the record
    end: usize,
    /// where the following record is searched from
    next: usize,
}

/// Decoder of a legacy kernel buffer.
///
/// Each call to [`next_record`] returns the next [`RawRecord`] until the
/// buffer is exhausted.
///
/// [`next_record`]: crate::readers::RecordSource::next_record
#[derive(Debug)]
pub struct LegacyReader {
    buffer: RecordBuffer,
    /// offset of the first unconsumed byte
    cursor: usize,
    decode: LegacyDecode,
    records: Count,
}

impl LegacyReader {
    pub fn new(buffer: RecordBuffer) -> LegacyReader {
        LegacyReader::with_decode(buffer, LegacyDecode::default())
    }

    pub fn with_decode(buffer: RecordBuffer, decode: LegacyDecode) -> LegacyReader {
        defñ!("buffer len {}, {:?}", buffer.len(), decode);
        LegacyReader {
            buffer,
            cursor: 0,
            decode,
            records: 0,
        }
    }

    pub fn buffer(&self) -> &RecordBuffer {
        &self.buffer
    }

    /// Offset of the first unconsumed byte.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Count of records returned.
    pub const fn count_records(&self) -> Count {
        self.records
    }

    /// Count of pages unmapped; always `0` for an owned buffer.
    pub fn pages_released(&self) -> Count {
        match &self.buffer {
            RecordBuffer::Owned(_) => 0,
            RecordBuffer::Mapped(mapped) => mapped.pages_released(),
        }
    }

    /// Find the next non-empty record at or after the cursor.
    fn find_span(&self) -> Option<RecordSpan> {
        let mut at = self.cursor;
        loop {
            let rest = self.buffer.bytes_from(at);
            // zero padding at the end of a buffer
            let zeros = rest
                .iter()
                .take_while(|b| **b == 0)
                .count();
            if zeros == rest.len() {
                return None;
            }
            let rest = &rest[zeros..];
            let beg = at + zeros;
            let (end, next) = match memmem::find(rest, BOUNDARY) {
                // the newline is not part of the message
                Some(i) => (beg + i, beg + i + 1),
                None => {
                    // a final record keeps its newline, drops trailing zeros
                    let trailing = rest
                        .iter()
                        .rev()
                        .take_while(|b| **b == 0)
                        .count();
                    (beg + rest.len() - trailing, beg + rest.len())
                }
            };
            if end <= beg {
                defo!("empty record at {}", beg);
                at = next;
                continue;
            }

            return Some(RecordSpan { beg, end, next });
        }
    }
}

/// Decode the prefixes of one legacy record `line`.
///
/// A malformed prefix leaves its fields absent and the message starts
/// where that prefix starts.
pub fn decode_legacy_record<'a>(line: &'a [u8], decode: &LegacyDecode) -> RawRecord<'a> {
    let mut record = RawRecord::new(line);
    let mut at: usize = 0;

    if line.first() == Some(&b'<') {
        if decode.priority {
            if let Some((priority, len)) = parse_priority(&line[1..]) {
                if line.get(1 + len) == Some(&b'>') {
                    record.set_priority(priority);
                    at = 1 + len + 1;
                }
            }
        } else {
            at = match line.find_byte(b'>') {
                Some(i) => i + 1,
                None => line.len(),
            };
        }
    }

    let rest = &line[at..];
    if rest.first() == Some(&b'[') && matches!(rest.get(1), Some(b) if *b == b' ' || b.is_ascii_digit()) {
        if decode.timestamp {
            if let Some((ts, len)) = parse_legacy_timestamp(&rest[1..]) {
                record.timestamp = Some(ts);
                at += 1 + len;
                if line.get(at) == Some(&b' ') {
                    at += 1;
                }
            }
        } else if let Some(i) = rest.find_byte(b']') {
            at += i + 1;
            if line.get(at) == Some(&b' ') {
                at += 1;
            }
        }
    }
    debug_assert_le!(at, line.len());
    record.message = &line[at..];

    record
}

impl RecordSource for LegacyReader {
    fn next_record(&mut self) -> ResultS3<RawRecord<'_>, Error> {
        self.buffer.release_behind(self.cursor);
        let span = match self.find_span() {
            Some(val) => val,
            None => {
                self.cursor = self.buffer.len();
                defñ!("return Done; {} records", self.records);
                return ResultS3::Done;
            }
        };
        debug_assert_lt!(span.beg, span.end);
        self.cursor = span.next;
        self.records += 1;
        let line = &self.buffer.bytes_from(span.beg)[..span.end - span.beg];
        let record = decode_legacy_record(line, &self.decode);
        defñ!("record at [{}‥{}) {:?}", span.beg, span.end, buffer_to_String_noraw(record.message));

        ResultS3::Found(record)
    }
}
