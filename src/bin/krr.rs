// src/bin/krr.rs

//! Driver program _krr_, the kernel ring reader.
//!
//! Maps command-line arguments onto a [`SessionConfig`], scans once, and
//! prints a closing summary line.
//!
//! [`SessionConfig`]: krrlib::readers::config::SessionConfig

#![allow(non_camel_case_types)]

use std::io::{ErrorKind, Write};
use std::process::ExitCode;

use ::anyhow::Context;
use ::clap::{Parser, ValueEnum};
use ::const_format::concatcp;
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

use ::krrlib::common::{Count, FPath};
use ::krrlib::data::datetime::TimeFormat;
use ::krrlib::data::record::{parse_level, Level, LEVEL_MAX};
use ::krrlib::data::timestamp::Timestamp;
use ::krrlib::debug::printers::e_err;
use ::krrlib::printer::printers::{ColorChoice, OutputMode};
use ::krrlib::readers::config::{BackendKind, SessionConfig};
use ::krrlib::readers::session::Session;
use ::krrlib::readers::syslogbuffer::ReadAction;

/// CLI enum that maps to [`termcolor::ColorChoice`].
///
/// [`termcolor::ColorChoice`]: https://docs.rs/termcolor/1.4.1/termcolor/enum.ColorChoice.html
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    ValueEnum, // from `clap`
)]
enum CLI_Color_Choice {
    always,
    auto,
    never,
}

const CLI_HELP_AFTER: &str = concatcp!(
    "LEVEL may be a number 0 to ", LEVEL_MAX, " or a name:
    emerg alert crit err warn notice info debug

TIME_FORMAT may be one of:
    notime ctime ctime-delta delta reltime time time-delta iso

Without --syslog or --file, records are read from /dev/kmsg. If /dev/kmsg
cannot be read then the syslog(2) buffer is read.
"
);

/// `clap` command-line arguments.
#[derive(Parser, Debug)]
#[clap(
    about = env!("CARGO_PKG_DESCRIPTION"),
    author = env!("CARGO_PKG_AUTHORS"),
    name = "krr",
    version = concatcp!(
        "(kernel ring reader)\n",
        "Version: ",
        env!("CARGO_PKG_VERSION_MAJOR"), ".",
        env!("CARGO_PKG_VERSION_MINOR"), ".",
        env!("CARGO_PKG_VERSION_PATCH"), "\n",
        "MSRV: ", env!("CARGO_PKG_RUST_VERSION"), "\n",
        "License: ", env!("CARGO_PKG_LICENSE"), "\n",
        "Author: ", env!("CARGO_PKG_AUTHORS"), "\n",
    ),
    after_help = CLI_HELP_AFTER,
    verbatim_doc_comment,
)]
struct CLI_Args {
    /// Count and print records at this LEVEL or more severe.
    #[clap(
        required = false,
        verbatim_doc_comment,
        value_parser = cli_parse_level,
        default_value_t = LEVEL_MAX,
    )]
    level: Level,

    /// Count and print records after this many seconds since boot.
    /// For example, "12" or "12.000500".
    #[clap(
        short = 's',
        long,
        verbatim_doc_comment,
        value_parser = cli_parse_since,
        default_value_t = Timestamp::ZERO,
    )]
    since: Timestamp,

    /// Read a saved kernel buffer file instead of the running kernel.
    #[clap(
        short = 'F',
        long,
        verbatim_doc_comment,
        conflicts_with_all = ["syslog", "follow"],
    )]
    file: Option<FPath>,

    /// Read the syslog(2) buffer instead of /dev/kmsg.
    #[clap(
        short = 'S',
        long,
        verbatim_doc_comment,
        conflicts_with = "follow",
    )]
    syslog: bool,

    /// Wait for new records from /dev/kmsg.
    #[clap(
        short = 'w',
        long,
        verbatim_doc_comment,
    )]
    follow: bool,

    /// Clear the kernel buffer after reading it.
    #[clap(
        short = 'c',
        long,
        verbatim_doc_comment,
    )]
    clear: bool,

    /// Size of the syslog(2) buffer in bytes.
    /// If not passed then the size is asked of the kernel.
    #[clap(
        short = 'b',
        long,
        verbatim_doc_comment,
        value_parser = cli_parse_buffer_size,
    )]
    buffer_size: Option<usize>,

    /// Print the time of each record in this format.
    #[clap(
        short = 't',
        long,
        verbatim_doc_comment,
        value_parser = cli_parse_time_format,
        default_value_t = TimeFormat::Time,
    )]
    time_format: TimeFormat,

    /// Print records with the syslog(2) prefix "<N>[sec.usec] ".
    #[clap(
        short = 'r',
        long,
        verbatim_doc_comment,
    )]
    raw: bool,

    /// Choose to print using colors.
    #[clap(
        required = false,
        long = "color",
        verbatim_doc_comment,
        value_enum,
        default_value_t = CLI_Color_Choice::never,
    )]
    color_choice: CLI_Color_Choice,

    /// Only count records, do not print them.
    #[clap(
        short = 'q',
        long,
        verbatim_doc_comment,
    )]
    quiet: bool,
}

/// `clap` argument parser for `LEVEL`.
fn cli_parse_level(level: &str) -> std::result::Result<Level, String> {
    parse_level(level)
}

/// `clap` argument parser for `--since`.
fn cli_parse_since(since: &str) -> std::result::Result<Timestamp, String> {
    match since.parse::<Timestamp>() {
        Ok(val) => Ok(val),
        Err(err) => Err(format!("Unable to parse --since {:?}; {}", since, err)),
    }
}

/// `clap` argument parser for `--buffer-size`.
fn cli_parse_buffer_size(bufsize: &str) -> std::result::Result<usize, String> {
    let val: usize = match bufsize.parse::<usize>() {
        Ok(val) => val,
        Err(err) => return Err(format!("Unable to parse a number for --buffer-size {:?}; {}", bufsize, err)),
    };
    if val == 0 {
        return Err(String::from("--buffer-size must be at least 1"));
    }

    Ok(val)
}

/// `clap` argument parser for `--time-format`.
fn cli_parse_time_format(time_format: &str) -> std::result::Result<TimeFormat, String> {
    time_format.parse::<TimeFormat>()
}

/// Map the parsed arguments onto a [`SessionConfig`].
fn cli_process_args(args: CLI_Args) -> SessionConfig {
    let backend: BackendKind = match (args.file, args.syslog) {
        (Some(path), _) => BackendKind::File(path),
        (None, true) => BackendKind::Syslog,
        (None, false) => BackendKind::Kmsg,
    };
    let action: ReadAction = match args.clear {
        true => ReadAction::ReadClear,
        false => ReadAction::ReadAll,
    };
    let output_mode: OutputMode = match args.raw {
        true => OutputMode::Raw,
        false => OutputMode::Decoded,
    };
    // map `CLI_Color_Choice` to `ColorChoice`
    let color_choice: ColorChoice = match args.color_choice {
        CLI_Color_Choice::always => ColorChoice::Always,
        CLI_Color_Choice::auto => ColorChoice::Auto,
        CLI_Color_Choice::never => ColorChoice::Never,
    };

    SessionConfig::new(args.level, args.since, !args.quiet)
        .with_backend(backend)
        .with_action(action)
        .with_follow(args.follow)
        .with_bufsize(args.buffer_size)
        .with_output_mode(output_mode)
        .with_time_format(args.time_format)
        .with_color(color_choice)
}

/// Open the session and scan once. Returns the count of matched records.
fn run(config: SessionConfig) -> anyhow::Result<Count> {
    let backend = config.backend.to_string();
    let mut session = Session::open(config).with_context(|| format!("open of {} failed", backend))?;
    defo!("backend {}", session.backend().name());
    let count = session
        .scan()
        .with_context(|| format!("scan of {} failed", session.backend().name()))?;

    Ok(count)
}

/// Write the closing summary line. A closed `out` is not an error.
fn write_summary<W: Write>(out: &mut W, count: Count, level: Level, since: &Timestamp) -> std::io::Result<()> {
    let result = writeln!(out, "\n{} messages of <= {} level after {} sec", count, level, since.sec)
        .and_then(|_| out.flush());
    match result {
        Err(err) if err.kind() == ErrorKind::BrokenPipe => {
            defo!("output closed; summary dropped");
            Ok(())
        }
        result => result,
    }
}

pub fn main() -> ExitCode {
    defn!();

    let args = CLI_Args::parse();
    defo!("{:?}", args);
    let config = cli_process_args(args);
    let level = config.min_severity;
    let since = config.since;

    let exitcode = match run(config) {
        Ok(count) => match write_summary(&mut std::io::stdout(), count, level, &since) {
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => {
                e_err!("write of summary failed: {}", err);
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            e_err!("{:?}", err);
            ExitCode::FAILURE
        }
    };
    defx!("exitcode {:?}", exitcode);

    exitcode
}

#[cfg(test)]
mod tests {
    use super::*;

    use ::test_case::test_case;

    /// Fails every write and flush with `kind`.
    struct FailWriter(ErrorKind);

    impl Write for FailWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(self.0))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::from(self.0))
        }
    }

    #[test]
    fn test_write_summary() {
        let mut out: Vec<u8> = Vec::new();
        write_summary(&mut out, 12, 3, &Timestamp::new(5, 250)).unwrap();
        assert_eq!(String::from_utf8_lossy(&out), "\n12 messages of <= 3 level after 5 sec\n");
    }

    #[test]
    fn test_write_summary_broken_pipe() {
        let mut out = FailWriter(ErrorKind::BrokenPipe);
        assert!(write_summary(&mut out, 1, LEVEL_MAX, &Timestamp::ZERO).is_ok());
    }

    #[test_case(ErrorKind::PermissionDenied)]
    #[test_case(ErrorKind::Other)]
    fn test_write_summary_error(kind: ErrorKind) {
        let mut out = FailWriter(kind);
        let err = write_summary(&mut out, 1, LEVEL_MAX, &Timestamp::ZERO).unwrap_err();
        assert_eq!(err.kind(), kind);
    }

    #[test_case("err", Ok(3))]
    #[test_case("7", Ok(7))]
    #[test_case("8", Err(()))]
    #[test_case("loud", Err(()))]
    fn test_cli_parse_level(level: &str, expect: Result<Level, ()>) {
        assert_eq!(cli_parse_level(level).map_err(|_| ()), expect);
    }
}
