// src/data/record.rs

//! Implements [`RawRecord`], one decoded kernel log entry, and the pieces
//! shared by both record encodings: the packed priority prefix, the
//! severity and facility name tables, the `/dev/kmsg` continuation flags,
//! and reversal of the kernel's `\xHH` escaping.
//!
//! [`RawRecord`]: self::RawRecord

use crate::data::timestamp::{parse_decimal_u64, Timestamp};

use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// severity and facility
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level of a kernel record, `0` (most severe) to `7`.
pub type Level = u8;
/// Facility of a kernel record, `0` to `11`.
pub type Facility = u8;

/// Mask of the severity bits within a packed priority.
pub const LOG_PRIMASK: u64 = 0x07;

/// Least severe level, `debug`.
pub const LEVEL_MAX: Level = 7;

/// Name and description of a severity level or facility.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NameHelp {
    pub name: &'static str,
    pub help: &'static str,
}

/// Severity level names, indexed by [`Level`].
pub const LEVEL_NAMES: [NameHelp; 8] = [
    NameHelp { name: "emerg", help: "system is unusable" },
    NameHelp { name: "alert", help: "action must be taken immediately" },
    NameHelp { name: "crit", help: "critical conditions" },
    NameHelp { name: "err", help: "error conditions" },
    NameHelp { name: "warn", help: "warning conditions" },
    NameHelp { name: "notice", help: "normal but significant condition" },
    NameHelp { name: "info", help: "informational" },
    NameHelp { name: "debug", help: "debug-level messages" },
];

/// Facility names, indexed by [`Facility`].
pub const FACILITY_NAMES: [NameHelp; 12] = [
    NameHelp { name: "kern", help: "kernel messages" },
    NameHelp { name: "user", help: "random user-level messages" },
    NameHelp { name: "mail", help: "mail system" },
    NameHelp { name: "daemon", help: "system daemons" },
    NameHelp { name: "auth", help: "security/authorization messages" },
    NameHelp { name: "syslog", help: "messages generated internally by syslogd" },
    NameHelp { name: "lpr", help: "line printer subsystem" },
    NameHelp { name: "news", help: "network news subsystem" },
    NameHelp { name: "uucp", help: "UUCP subsystem" },
    NameHelp { name: "cron", help: "clock daemon" },
    NameHelp { name: "authpriv", help: "security/authorization messages (private)" },
    NameHelp { name: "ftp", help: "FTP daemon" },
];

pub fn level_name(level: Level) -> Option<&'static str> {
    LEVEL_NAMES
        .get(level as usize)
        .map(|nh| nh.name)
}

pub fn facility_name(facility: Facility) -> Option<&'static str> {
    FACILITY_NAMES
        .get(facility as usize)
        .map(|nh| nh.name)
}

/// Parse a severity level given as a number `0`..=`7` or as a name from
/// [`LEVEL_NAMES`] (case-insensitive).
pub fn parse_level(s: &str) -> Result<Level, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err(String::from("empty level"));
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return match s.parse::<u8>() {
            Ok(val) if val <= LEVEL_MAX => Ok(val),
            _ => Err(format!("level {:?} is not within 0 to {}", s, LEVEL_MAX)),
        };
    }
    match LEVEL_NAMES
        .iter()
        .position(|nh| nh.name.eq_ignore_ascii_case(s))
    {
        Some(at) => Ok(at as Level),
        None => Err(format!("unknown level {:?}", s)),
    }
}

/// Split a packed priority `facility * 8 + level`.
/// A facility outside of [`FACILITY_NAMES`] is `None`.
pub fn split_priority(priority: u64) -> (Option<Facility>, Level) {
    let level = (priority & LOG_PRIMASK) as Level;
    let facility = priority >> 3;
    let facility = if (facility as usize) < FACILITY_NAMES.len() {
        Some(facility as Facility)
    } else {
        None
    };

    (facility, level)
}

/// Parse the decimal packed priority at the start of `buf`.
///
/// Returns the packed priority and the number of bytes consumed
/// (not including any terminator).
pub fn parse_priority(buf: &[u8]) -> Option<(u64, usize)> {
    parse_decimal_u64(buf)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// continuation flags
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Continuation flag of a `/dev/kmsg` physical record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContinuationFlag {
    /// `-`; the record completes a logical line.
    #[default]
    None,
    /// `c`; the record starts or continues a fragment.
    ContinuationStart,
    /// `+`; older kernels use this to continue a fragment.
    ContinuationMore,
    /// missing or unknown flag; any pending fragment is complete.
    ForcedFlush,
}

impl ContinuationFlag {
    pub const fn from_byte(flag: Option<u8>) -> ContinuationFlag {
        match flag {
            Some(b'-') => ContinuationFlag::None,
            Some(b'c') => ContinuationFlag::ContinuationStart,
            Some(b'+') => ContinuationFlag::ContinuationMore,
            _ => ContinuationFlag::ForcedFlush,
        }
    }

    /// Is this a fragment that must be appended to?
    pub const fn is_continuation(&self) -> bool {
        matches!(self, ContinuationFlag::ContinuationStart | ContinuationFlag::ContinuationMore)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RawRecord
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One decoded kernel log record.
///
/// `message` borrows the reader's buffer, so a `RawRecord` must be dropped
/// before asking the reader for the next one.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct RawRecord<'a> {
    pub message: &'a [u8],
    /// packed `facility * 8 + level` as read
    pub priority: Option<u64>,
    pub level: Option<Level>,
    pub facility: Option<Facility>,
    pub timestamp: Option<Timestamp>,
    /// `/dev/kmsg` only
    pub sequence: Option<u64>,
    /// `/dev/kmsg` only
    pub flag: ContinuationFlag,
}

impl<'a> RawRecord<'a> {
    /// A record with only a message; every other field absent.
    pub fn new(message: &'a [u8]) -> RawRecord<'a> {
        RawRecord {
            message,
            ..Default::default()
        }
    }

    /// Set the packed `priority` and the `facility` and `level` split
    /// from it.
    pub fn set_priority(&mut self, priority: u64) {
        let (facility, level) = split_priority(priority);
        self.priority = Some(priority);
        self.facility = facility;
        self.level = Some(level);
    }

    /// The timestamp, or time zero if absent.
    pub fn timestamp_or_zero(&self) -> Timestamp {
        self.timestamp.unwrap_or(Timestamp::ZERO)
    }
}

impl fmt::Debug for RawRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RawRecord")
            .field("priority", &self.priority)
            .field("level", &self.level)
            .field("facility", &self.facility)
            .field("timestamp", &self.timestamp)
            .field("sequence", &self.sequence)
            .field("flag", &self.flag)
            .field("message", &String::from_utf8_lossy(self.message))
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// kernel escaping
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Reverse the kernel's `\xHH` escaping of non-printable bytes, in place.
/// An escape with invalid hex digits is kept verbatim.
///
/// Returns the unescaped length; bytes of `buf` past that length are
/// leftovers.
pub fn unhexmangle_in_place(buf: &mut [u8]) -> usize {
    let mut r: usize = 0;
    let mut w: usize = 0;
    while r < buf.len() {
        if buf[r] == b'\\' && r + 3 < buf.len() && buf[r + 1] == b'x' {
            if let (Some(hi), Some(lo)) = (hex_value(buf[r + 2]), hex_value(buf[r + 3])) {
                buf[w] = (hi << 4) | lo;
                w += 1;
                r += 4;
                continue;
            }
        }
        buf[w] = buf[r];
        w += 1;
        r += 1;
    }

    w
}
