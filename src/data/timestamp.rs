// src/data/timestamp.rs

//! Implements [`Timestamp`], the stream-relative time of a kernel record,
//! and the decode side of the two kernel timestamp encodings.
//!
//! The legacy (syslog buffer) encoding is `[seconds.microseconds]`.
//! The `/dev/kmsg` encoding is a microsecond integer field terminated by
//! `,` or `;`.

use std::fmt;
use std::str::FromStr;

use ::more_asserts::debug_assert_lt;

/// Microseconds per second.
pub const USEC_PER_SEC: u64 = 1_000_000;

/// Time since boot of a kernel record; seconds and microseconds.
///
/// Ordered by `(sec, usec)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub sec: u64,
    /// always less than [`USEC_PER_SEC`]
    pub usec: u32,
}

impl Timestamp {
    /// Time zero of the stream.
    pub const ZERO: Timestamp = Timestamp { sec: 0, usec: 0 };

    /// Create a `Timestamp`. Any whole seconds carried in `usec` are moved
    /// to `sec`.
    pub const fn new(sec: u64, usec: u64) -> Timestamp {
        Timestamp {
            sec: sec.saturating_add(usec / USEC_PER_SEC),
            usec: (usec % USEC_PER_SEC) as u32,
        }
    }

    pub const fn from_micros(micros: u64) -> Timestamp {
        Timestamp {
            sec: micros / USEC_PER_SEC,
            usec: (micros % USEC_PER_SEC) as u32,
        }
    }

    pub const fn as_micros(&self) -> u64 {
        self.sec
            .saturating_mul(USEC_PER_SEC)
            .saturating_add(self.usec as u64)
    }

    /// Signed difference `self - earlier` in seconds.
    pub fn delta_secs(&self, earlier: &Timestamp) -> f64 {
        debug_assert_lt!(self.usec as u64, USEC_PER_SEC);
        (self.sec as f64 - earlier.sec as f64) + (self.usec as f64 - earlier.usec as f64) / 1E6
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:06}", self.sec, self.usec)
    }
}

/// Parse `SECONDS` or `SECONDS.FRACTION`, e.g. `"100"`, `"101.5"`,
/// `"101.500000"`. Fraction digits past six are ignored.
impl FromStr for Timestamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (sec_s, frac_s) = match s.split_once('.') {
            Some((a, b)) => (a, b),
            None => (s, ""),
        };
        let sec: u64 = match sec_s.parse::<u64>() {
            Ok(val) => val,
            Err(err) => {
                return Err(format!("invalid seconds {:?}: {}", sec_s, err));
            }
        };
        if !frac_s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("invalid fraction {:?}", frac_s));
        }
        let usec: u64 = frac_s
            .bytes()
            .chain(std::iter::repeat(b'0'))
            .take(6)
            .fold(0, |acc, b| acc * 10 + (b - b'0') as u64);

        Ok(Timestamp::new(sec, usec))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// decoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse a base-10 unsigned integer at the start of `buf`, like C `strtoul`:
/// leading ASCII whitespace and one `+` are allowed, at least one digit is
/// required.
///
/// Returns the value and the number of bytes consumed. `None` if there are
/// no digits or the value overflows.
pub fn parse_decimal_u64(buf: &[u8]) -> Option<(u64, usize)> {
    let mut at: usize = 0;
    while at < buf.len() && buf[at].is_ascii_whitespace() {
        at += 1;
    }
    if at < buf.len() && buf[at] == b'+' {
        at += 1;
    }
    let digits_beg = at;
    let mut value: u64 = 0;
    while at < buf.len() && buf[at].is_ascii_digit() {
        value = value
            .checked_mul(10)?
            .checked_add((buf[at] - b'0') as u64)?;
        at += 1;
    }
    if at == digits_beg {
        return None;
    }

    Some((value, at))
}

/// Decode a legacy timestamp `seconds.microseconds]`. `buf` starts just
/// after the opening `[`. The microseconds part is optional, `123]` is
/// accepted.
///
/// Returns the `Timestamp` and the number of bytes consumed, including the
/// closing `]`. `None` if the closing `]` does not directly follow the
/// numbers.
pub fn parse_legacy_timestamp(buf: &[u8]) -> Option<(Timestamp, usize)> {
    let (sec, mut at) = parse_decimal_u64(buf)?;
    let mut usec: u64 = 0;
    if at + 1 < buf.len() && buf[at] == b'.' {
        let (usec_, len) = parse_decimal_u64(&buf[at + 1..])?;
        usec = usec_;
        at += 1 + len;
    }
    if buf.get(at) != Some(&b']') {
        return None;
    }

    Some((Timestamp::new(sec, usec), at + 1))
}

/// Decode a `/dev/kmsg` timestamp field, microseconds since boot terminated
/// by `,` or `;`.
///
/// Returns the `Timestamp` and the number of bytes consumed, excluding the
/// terminator.
pub fn parse_kmsg_timestamp(buf: &[u8]) -> Option<(Timestamp, usize)> {
    let (micros, at) = parse_decimal_u64(buf)?;
    match buf.get(at) {
        Some(b',') | Some(b';') => Some((Timestamp::from_micros(micros), at)),
        _ => None,
    }
}
