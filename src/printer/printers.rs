// src/printer/printers.rs

//! Specialized printer struct [`RecordPrinter`] for printing
//! [`RawRecord`s].
//!
//! Byte-oriented printing. Non-printable bytes of a message are written as
//! `\xHH`, and the lines of a multi-line message are indented to the width
//! of the printed prefix.
//!
//! [`RawRecord`s]: crate::data::record::RawRecord

use crate::common::{Bytes, Count, NLu8, SPu8};
use crate::data::datetime::{
    timestamp_to_datetime,
    BootTime,
    DateTimeL,
    FixedOffset,
    TimeBreak,
    TimeFormat,
    CTIME_FORMAT,
    ISO8601_FORMAT,
    SHORT_CTIME_FORMAT,
};
use crate::data::record::{facility_name, level_name, RawRecord};
use crate::data::timestamp::Timestamp;
use crate::debug::printers::de_err;

use std::fmt;
use std::io::Result;
use std::str::FromStr;

use ::bstr::ByteSlice;
#[allow(unused_imports)]
use ::more_asserts::{debug_assert_le, debug_assert_lt};
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};
#[doc(hidden)]
pub use ::termcolor::{Color, ColorChoice, ColorSpec, NoColor, StandardStream, WriteColor};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// globals and constants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// [`Color`] of the printed time prefix.
///
/// [`Color`]: https://docs.rs/termcolor/1.4.1/termcolor/enum.Color.html
pub const COLOR_TIME: Color = Color::Green;

/// [`Color`] of the message of a record at [`LEVEL_ALERT_COLOR`] or more
/// severe.
///
/// [`Color`]: https://docs.rs/termcolor/1.4.1/termcolor/enum.Color.html
pub const COLOR_ALERT: Color = Color::Red;

/// Records at this level (`err`) or more severe are printed in
/// [`COLOR_ALERT`].
pub const LEVEL_ALERT_COLOR: u8 = 3;

/// Printed in place of an absent facility or level.
const ABSENT: &str = "-";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// OutputMode
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The prefix printed before each message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputMode {
    /// `syslog(2)` compatible `<6>[    1.234567] `; the time format is
    /// not used
    Raw,
    /// `kern  :info  (0:6) ` followed by the time prefix
    #[default]
    Decoded,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutputMode::Raw => write!(f, "raw"),
            OutputMode::Decoded => write!(f, "decoded"),
        }
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "raw" => Ok(OutputMode::Raw),
            "decoded" => Ok(OutputMode::Decoded),
            _ => Err(format!("unknown output mode: {}", s)),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// helper functions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Is the single byte `b` printable as-is? Like C `isprint || isspace`.
#[inline(always)]
const fn byte_is_printable(b: u8) -> bool {
    b.is_ascii_graphic() || matches!(b, b' ' | b'\t' | b'\n' | b'\x0B' | b'\x0C' | b'\r')
}

#[inline(always)]
fn push_hex(out: &mut Bytes, bytes: &[u8]) {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    for b in bytes.iter() {
        out.extend_from_slice(&[b'\\', b'x', HEX[(b >> 4) as usize], HEX[(b & 0xF) as usize]]);
    }
}

/// Append `message` to `out`, escaping what should not reach a terminal.
///
/// * each byte of an invalid UTF-8 sequence becomes `\xHH`
/// * each byte of a non-printable character becomes `\xHH`
/// * a newline followed by more text is followed by `indent` spaces
/// * a NUL ends the message
pub fn escape_message(message: &[u8], indent: usize, out: &mut Bytes) {
    for (beg, end, c) in message.char_indices() {
        let bytes: &[u8] = &message[beg..end];
        if c == '\u{FFFD}' && bytes != "\u{FFFD}".as_bytes() {
            // invalid UTF-8
            push_hex(out, bytes);
            continue;
        }
        if c == '\0' {
            return;
        }
        if bytes.len() == 1 {
            let b = bytes[0];
            if !byte_is_printable(b) {
                push_hex(out, bytes);
            } else if b == NLu8 && indent != 0 && !matches!(message.get(end), None | Some(0)) {
                out.push(NLu8);
                out.resize(out.len() + indent, SPu8);
            } else {
                out.push(b);
            }
        } else if c.is_control() {
            push_hex(out, bytes);
        } else {
            out.extend_from_slice(bytes);
        }
    }
}

/// Macro to write to the given `WriteColor`. If there is an error then
/// `return RecordPrinterResult::Err`.
macro_rules! write_or_return {
    ($out:expr, $slice_:expr, $printed:expr) => {
        match $out.write_all($slice_) {
            Ok(_) => {
                $printed += $slice_.len();
            }
            Err(err) => {
                // XXX: prints when stdout is closed early, e.g. `krr | head`
                de_err!(
                    "{}.write({}) (len {}) error {}",
                    stringify!($out),
                    stringify!($slice_),
                    $slice_.len(),
                    err
                );
                return RecordPrinterResult::Err(err);
            }
        }
    };
}

/// Macro that sets output color, only if color is enabled.
macro_rules! setcolor_or_return {
    ($self:expr, $color_spec:expr) => {
        if $self.do_color {
            if let Err(err) = $self.out.set_color(&$color_spec) {
                de_err!("{}.set_color({:?}) returned error {}", stringify!($self.out), $color_spec, err);
                return RecordPrinterResult::Err(err);
            };
        }
    };
}

/// Macro that resets output color, only if color is enabled.
macro_rules! resetcolor_or_return {
    ($self:expr) => {
        if $self.do_color {
            if let Err(err) = $self.out.reset() {
                de_err!("{}.reset() returned error {}", stringify!($self.out), err);
                return RecordPrinterResult::Err(err);
            };
        }
    };
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RecordPrinter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Aliased [`Result`] returned by [`RecordPrinter`] functions; the count
/// of bytes printed.
///
/// [`Result`]: std::io::Result
pub type RecordPrinterResult = Result<usize>;

/// A printer specialized for [`RawRecord`s].
///
/// Keeps the time of the prior printed record for the delta time formats.
///
/// [`RawRecord`s]: crate::data::record::RawRecord
pub struct RecordPrinter<W: WriteColor> {
    out: W,
    mode: OutputMode,
    /// time format after downgrade for a missing boot time
    time_format: TimeFormat,
    boot: Option<BootTime>,
    tz: FixedOffset,
    /// time of the prior printed record
    last_ts: Option<Timestamp>,
    /// local time parts of the prior printed record
    last_break: Option<TimeBreak>,
    do_color: bool,
    color_spec_time: ColorSpec,
    color_spec_timebreak: ColorSpec,
    color_spec_alert: ColorSpec,
    /// reused for composing the prefix
    prefix: String,
    /// reused for composing the escaped message
    message: Bytes,
    printed: Count,
}

impl<W: WriteColor> fmt::Debug for RecordPrinter<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RecordPrinter")
            .field("mode", &self.mode)
            .field("time_format", &self.time_format)
            .field("boot", &self.boot)
            .field("tz", &self.tz)
            .field("last_ts", &self.last_ts)
            .field("do_color", &self.do_color)
            .field("printed", &self.printed)
            .finish()
    }
}

impl RecordPrinter<StandardStream> {
    /// A `RecordPrinter` for stdout.
    pub fn stdout(
        color_choice: ColorChoice,
        mode: OutputMode,
        time_format: TimeFormat,
        boot: Option<BootTime>,
        tz: FixedOffset,
    ) -> RecordPrinter<StandardStream> {
        let do_color: bool = match color_choice {
            ColorChoice::Never => false,
            ColorChoice::Always | ColorChoice::AlwaysAnsi | ColorChoice::Auto => true,
        };
        let out = StandardStream::stdout(color_choice);

        RecordPrinter::new(out, mode, time_format, boot, tz, do_color)
    }
}

impl<W: WriteColor> RecordPrinter<W> {
    /// Create a new `RecordPrinter`.
    ///
    /// A wall-clock `time_format` without a `boot` time is printed as
    /// [`TimeFormat::None`].
    pub fn new(
        out: W,
        mode: OutputMode,
        time_format: TimeFormat,
        boot: Option<BootTime>,
        tz: FixedOffset,
        do_color: bool,
    ) -> RecordPrinter<W> {
        let time_format = time_format.resolve(boot.as_ref());
        let mut color_spec_time = ColorSpec::new();
        color_spec_time.set_fg(Some(COLOR_TIME));
        let mut color_spec_timebreak = color_spec_time.clone();
        color_spec_timebreak.set_bold(true);
        let mut color_spec_alert = ColorSpec::new();
        color_spec_alert.set_fg(Some(COLOR_ALERT));
        defñ!("{:?} {:?} boot {:?} do_color {}", mode, time_format, boot, do_color);

        RecordPrinter {
            out,
            mode,
            time_format,
            boot,
            tz,
            last_ts: None,
            last_break: None,
            do_color,
            color_spec_time,
            color_spec_timebreak,
            color_spec_alert,
            prefix: String::with_capacity(64),
            message: Bytes::with_capacity(1024),
            printed: 0,
        }
    }

    /// The time format in effect.
    pub const fn time_format(&self) -> TimeFormat {
        self.time_format
    }

    /// Count of bytes printed.
    pub const fn count_bytes(&self) -> Count {
        self.printed
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Delta to the prior record that used a delta, and remember `ts`.
    /// `0` for the first.
    fn count_delta(&mut self, ts: &Timestamp) -> f64 {
        let delta = match &self.last_ts {
            Some(last) => ts.delta_secs(last),
            None => 0.0,
        };
        self.last_ts = Some(*ts);

        delta
    }

    fn datetime(&self, ts: &Timestamp) -> Option<DateTimeL> {
        let boot = self.boot.as_ref()?;
        timestamp_to_datetime(boot, ts, &self.tz)
    }

    /// Compose the time prefix of `ts` into `self.prefix`.
    ///
    /// Returns `true` for a [`TimeFormat::Reltime`] time break.
    fn compose_time_prefix(&mut self, ts: &Timestamp) -> bool {
        use std::fmt::Write as FmtWrite;

        let mut timebreak = false;
        // writing to a `String` cannot fail
        let _ = match self.time_format {
            TimeFormat::None => Ok(()),
            TimeFormat::Ctime => match self.datetime(ts) {
                Some(dt) => write!(self.prefix, "[{}] ", dt.format(CTIME_FORMAT)),
                None => write!(self.prefix, "[{:5}.{:06}] ", ts.sec, ts.usec),
            },
            TimeFormat::CtimeDelta => {
                let dt = self.datetime(ts);
                let delta = self.count_delta(ts);
                match dt {
                    Some(dt) => write!(self.prefix, "[{} <{:12.6}>] ", dt.format(CTIME_FORMAT), delta),
                    None => write!(self.prefix, "[{:5}.{:06} <{:12.6}>] ", ts.sec, ts.usec, delta),
                }
            }
            TimeFormat::Delta => {
                let delta = self.count_delta(ts);
                write!(self.prefix, "[<{:12.6}>] ", delta)
            }
            TimeFormat::Reltime => {
                let dt = self.datetime(ts);
                let delta = self.count_delta(ts);
                let cur: Option<TimeBreak> = dt.as_ref().map(TimeBreak::from_datetime);
                let result = match (&dt, &cur) {
                    (Some(dt), Some(cur)) if self.last_break.as_ref() != Some(cur) => {
                        timebreak = true;
                        write!(self.prefix, "[{}] ", dt.format(SHORT_CTIME_FORMAT))
                    }
                    _ => {
                        if delta < 10.0 {
                            write!(self.prefix, "[  {:+8.6}] ", delta)
                        } else {
                            write!(self.prefix, "[ {:+9.6}] ", delta)
                        }
                    }
                };
                self.last_break = cur;
                result
            }
            TimeFormat::Time => write!(self.prefix, "[{:5}.{:06}] ", ts.sec, ts.usec),
            TimeFormat::TimeDelta => {
                let delta = self.count_delta(ts);
                write!(self.prefix, "[{:5}.{:06} <{:12.6}>] ", ts.sec, ts.usec, delta)
            }
            TimeFormat::Iso8601 => match self.datetime(ts) {
                Some(dt) => write!(
                    self.prefix,
                    "{},{:06}{} ",
                    dt.format(ISO8601_FORMAT),
                    ts.usec,
                    dt.format("%:z")
                ),
                None => write!(self.prefix, "[{:5}.{:06}] ", ts.sec, ts.usec),
            },
        };

        timebreak
    }

    /// Compose the facility and level prefix of `record` into `self.prefix`.
    fn compose_decoded_prefix(&mut self, record: &RawRecord) {
        use std::fmt::Write as FmtWrite;

        let fac_name = record
            .facility
            .and_then(facility_name)
            .unwrap_or(ABSENT);
        let lev_name = record
            .level
            .and_then(level_name)
            .unwrap_or(ABSENT);
        let fac_num = match record.facility {
            Some(val) => val.to_string(),
            None => String::from(ABSENT),
        };
        let lev_num = match record.level {
            Some(val) => val.to_string(),
            None => String::from(ABSENT),
        };
        let _ = write!(self.prefix, "{:<6}:{:<6}({}:{}) ", fac_name, lev_name, fac_num, lev_num);
    }

    /// Compose the `syslog(2)` prefix of `record` into `self.prefix`.
    fn compose_raw_prefix(&mut self, record: &RawRecord) {
        use std::fmt::Write as FmtWrite;

        if let Some(priority) = record.priority {
            let _ = write!(self.prefix, "<{}>", priority);
        }
        if let Some(ts) = record.timestamp {
            let _ = write!(self.prefix, "[{:5}.{:06}] ", ts.sec, ts.usec);
        }
    }

    /// Print the [`RawRecord`] based on `RecordPrinter` settings.
    ///
    /// An empty message prints an empty line.
    pub fn print_record(&mut self, record: &RawRecord) -> RecordPrinterResult {
        let mut printed: usize = 0;
        if record.message.is_empty() {
            write_or_return!(self.out, &[NLu8], printed);
            self.printed += printed as Count;
            return RecordPrinterResult::Ok(printed);
        }

        self.prefix.clear();
        let mut timebreak = false;
        let prefix_time_beg: usize;
        match self.mode {
            OutputMode::Raw => {
                self.compose_raw_prefix(record);
                prefix_time_beg = self.prefix.len();
            }
            OutputMode::Decoded => {
                self.compose_decoded_prefix(record);
                prefix_time_beg = self.prefix.len();
                let ts = record.timestamp_or_zero();
                timebreak = self.compose_time_prefix(&ts);
            }
        }
        let indent: usize = self.prefix.len();

        self.message.clear();
        escape_message(record.message, indent, &mut self.message);
        if self.message.last() != Some(&NLu8) {
            self.message.push(NLu8);
        }

        // the prefix
        let prefix = std::mem::take(&mut self.prefix);
        let (prefix_a, prefix_time) = prefix
            .as_bytes()
            .split_at(prefix_time_beg);
        if !prefix_a.is_empty() {
            write_or_return!(self.out, prefix_a, printed);
        }
        if !prefix_time.is_empty() {
            if timebreak {
                setcolor_or_return!(self, self.color_spec_timebreak);
            } else {
                setcolor_or_return!(self, self.color_spec_time);
            }
            write_or_return!(self.out, prefix_time, printed);
            resetcolor_or_return!(self);
        }
        self.prefix = prefix;

        // the message
        let alert = matches!(record.level, Some(level) if level <= LEVEL_ALERT_COLOR);
        if alert {
            setcolor_or_return!(self, self.color_spec_alert);
        }
        let message = std::mem::take(&mut self.message);
        match self.out.write_all(&message) {
            Ok(_) => {
                printed += message.len();
                self.message = message;
            }
            Err(err) => {
                de_err!("write message (len {}) error {}", message.len(), err);
                self.message = message;
                return RecordPrinterResult::Err(err);
            }
        }
        if alert {
            resetcolor_or_return!(self);
        }
        self.printed += printed as Count;

        RecordPrinterResult::Ok(printed)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()
    }
}
