// src/data/datetime.rs

//! Wall-clock side of kernel record timestamps: the boot time, the
//! conversion of a stream [`Timestamp`] to a civil datetime, and the
//! [`TimeFormat`] choices for the printed time prefix.
//!
//! [`Timestamp`]: crate::data::timestamp::Timestamp
//! [`TimeFormat`]: self::TimeFormat

use crate::data::timestamp::Timestamp;

use std::fmt;
use std::str::FromStr;

#[doc(hidden)]
pub use ::chrono::{
    DateTime,
    Datelike, // adds method `.ordinal()` onto `DateTime`
    FixedOffset,
    Local,
    TimeDelta,
    TimeZone,
    Timelike, // adds methods `.hour()`, `.minute()` onto `DateTime`
    Utc,
};
use ::nix::time::{clock_gettime, ClockId};
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

/// A chrono [`DateTime`] type used in _krrlib_.
///
/// [`DateTime`]: https://docs.rs/chrono/0.4.40/chrono/struct.DateTime.html
pub type DateTimeL = DateTime<FixedOffset>;
pub type DateTimeLOpt = Option<DateTimeL>;

/// Wall-clock instant of stream time zero.
pub type BootTime = DateTime<Utc>;

/// strftime pattern for [`TimeFormat::Ctime`].
pub const CTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";
/// strftime pattern for the time break of [`TimeFormat::Reltime`].
pub const SHORT_CTIME_FORMAT: &str = "%b%e %H:%M";
/// strftime pattern for the date and time of [`TimeFormat::Iso8601`];
/// microseconds and offset are appended.
pub const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// The local timezone offset at this moment.
pub fn local_offset() -> FixedOffset {
    *Local::now().offset()
}

/// Resolve the boot time, the current wall clock minus `CLOCK_BOOTTIME`.
///
/// `None` if the clock cannot be read.
pub fn boot_time() -> Option<BootTime> {
    defn!();
    let since_boot = match clock_gettime(ClockId::CLOCK_BOOTTIME) {
        Ok(val) => val,
        Err(_err) => {
            defx!("clock_gettime(CLOCK_BOOTTIME) failed {}; return None", _err);
            return None;
        }
    };
    let delta = TimeDelta::new(since_boot.tv_sec(), since_boot.tv_nsec() as u32)?;
    let boot = Utc::now().checked_sub_signed(delta);
    defx!("return {:?}", boot);

    boot
}

/// Civil datetime of a record at `ts`, in timezone `tz`.
///
/// Sub-second precision is dropped, as kernel wall-clock renderings
/// only print whole seconds.
pub fn timestamp_to_datetime(
    boot: &BootTime,
    ts: &Timestamp,
    tz: &FixedOffset,
) -> DateTimeLOpt {
    let secs: i64 = match i64::try_from(ts.sec) {
        Ok(val) => val,
        Err(_) => return None,
    };
    let dt = boot.checked_add_signed(TimeDelta::try_seconds(secs)?)?;

    Some(dt.with_timezone(tz))
}

/// The local-time parts compared by [`TimeFormat::Reltime`] to decide on
/// a time break: minute, hour, and day of year.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeBreak {
    pub minute: u32,
    pub hour: u32,
    pub yday: u32,
}

impl TimeBreak {
    pub fn from_datetime(dt: &DateTimeL) -> TimeBreak {
        TimeBreak {
            minute: dt.minute(),
            hour: dt.hour(),
            yday: dt.ordinal0(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TimeFormat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How the time of each record is printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimeFormat {
    /// no time prefix
    None,
    /// `[Sat Mar  4 10:02:31 2023] `
    Ctime,
    /// `[Sat Mar  4 10:02:31 2023 <    0.000123>] `
    CtimeDelta,
    /// `[<    0.000123>] `
    Delta,
    /// `[Mar 4 10:02] ` on a time break, else `[  +0.000123] `
    Reltime,
    /// `[  100.000000] `
    #[default]
    Time,
    /// `[  100.000000 <    0.000123>] `
    TimeDelta,
    /// `2023-03-04T10:02:31,000123+01:00 `
    Iso8601,
}

impl TimeFormat {
    /// All formats, in the order of [`TimeFormat::name`]s shown to users.
    pub const ALL: [TimeFormat; 8] = [
        TimeFormat::None,
        TimeFormat::Ctime,
        TimeFormat::CtimeDelta,
        TimeFormat::Delta,
        TimeFormat::Reltime,
        TimeFormat::Time,
        TimeFormat::TimeDelta,
        TimeFormat::Iso8601,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            TimeFormat::None => "notime",
            TimeFormat::Ctime => "ctime",
            TimeFormat::CtimeDelta => "ctime-delta",
            TimeFormat::Delta => "delta",
            TimeFormat::Reltime => "reltime",
            TimeFormat::Time => "time",
            TimeFormat::TimeDelta => "time-delta",
            TimeFormat::Iso8601 => "iso",
        }
    }

    /// Does printing this format require the boot time?
    pub const fn needs_boot_time(&self) -> bool {
        matches!(
            self,
            TimeFormat::Ctime | TimeFormat::CtimeDelta | TimeFormat::Reltime | TimeFormat::Iso8601
        )
    }

    /// Does printing this format use the delta to the prior record?
    pub const fn uses_delta(&self) -> bool {
        matches!(
            self,
            TimeFormat::CtimeDelta | TimeFormat::Delta | TimeFormat::Reltime | TimeFormat::TimeDelta
        )
    }

    /// The format to use for a session. Wall-clock formats fall back to
    /// [`TimeFormat::None`] when the boot time is not known.
    pub fn resolve(self, boot: Option<&BootTime>) -> TimeFormat {
        if self.needs_boot_time() && boot.is_none() {
            defñ!("{:?} requires boot time; downgrade to None", self);
            return TimeFormat::None;
        }

        self
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for TimeFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match TimeFormat::ALL
            .iter()
            .find(|tf| tf.name() == s)
        {
            Some(tf) => Ok(*tf),
            None => Err(format!("unknown time format: {}", s)),
        }
    }
}
