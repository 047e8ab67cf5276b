// src/readers/config.rs

//! Configuration of a [`Session`].
//!
//! [`Session`]: crate::readers::session::Session

use crate::common::FPath;
use crate::data::datetime::{local_offset, FixedOffset, TimeFormat};
use crate::data::record::{Level, LEVEL_MAX};
use crate::data::timestamp::Timestamp;
use crate::printer::printers::{ColorChoice, OutputMode};
use crate::readers::syslogbuffer::ReadAction;

use std::fmt;

/// Where kernel records are read from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// `/dev/kmsg`, falling back to [`BackendKind::Syslog`] if unusable
    #[default]
    Kmsg,
    /// the `syslog(2)` buffer
    Syslog,
    /// a saved buffer file
    File(FPath),
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BackendKind::Kmsg => write!(f, "kmsg"),
            BackendKind::Syslog => write!(f, "syslog"),
            BackendKind::File(path) => write!(f, "file {:?}", path),
        }
    }
}

/// Settings of one read session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub backend: BackendKind,
    pub action: ReadAction,
    /// keep reading `/dev/kmsg` as records arrive
    pub follow: bool,
    /// `syslog(2)` buffer size; queried or grown when `None`
    pub bufsize: Option<usize>,
    pub output_mode: OutputMode,
    pub time_format: TimeFormat,
    /// accept records at this level or more severe
    pub min_severity: Level,
    /// accept records after this time
    pub since: Timestamp,
    /// print accepted records
    pub render: bool,
    pub color: ColorChoice,
    /// timezone of wall-clock time formats
    pub tz: FixedOffset,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            backend: BackendKind::default(),
            action: ReadAction::default(),
            follow: false,
            bufsize: None,
            output_mode: OutputMode::default(),
            time_format: TimeFormat::default(),
            min_severity: LEVEL_MAX,
            since: Timestamp::ZERO,
            render: false,
            color: ColorChoice::Never,
            tz: local_offset(),
        }
    }
}

impl SessionConfig {
    /// A default config with the given filter. `min_severity` past
    /// [`LEVEL_MAX`] is clamped.
    pub fn new(min_severity: Level, since: Timestamp, render: bool) -> Self {
        SessionConfig {
            min_severity: min_severity.min(LEVEL_MAX),
            since,
            render,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.min_severity > LEVEL_MAX {
            return Err(format!(
                "severity {} exceeds maximum {}",
                self.min_severity, LEVEL_MAX
            ));
        }
        if self.bufsize == Some(0) {
            return Err("buffer size must be at least 1, got 0".to_string());
        }
        if let BackendKind::File(path) = &self.backend {
            if path.is_empty() {
                return Err("file path is empty".to_string());
            }
            if self.follow {
                return Err("follow is not possible for a file".to_string());
            }
        }

        Ok(())
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_action(mut self, action: ReadAction) -> Self {
        self.action = action;
        self
    }

    pub fn with_follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    pub fn with_bufsize(mut self, bufsize: Option<usize>) -> Self {
        self.bufsize = bufsize;
        self
    }

    pub fn with_output_mode(mut self, output_mode: OutputMode) -> Self {
        self.output_mode = output_mode;
        self
    }

    pub fn with_time_format(mut self, time_format: TimeFormat) -> Self {
        self.time_format = time_format;
        self
    }

    pub fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    pub fn with_tz(mut self, tz: FixedOffset) -> Self {
        self.tz = tz;
        self
    }
}
