// src/tests/printers_tests.rs

//! tests for `src/printer/printers.rs`

#![allow(non_snake_case)]

use crate::common::Bytes;
use crate::data::datetime::{BootTime, FixedOffset, TimeFormat, TimeZone, Utc};
use crate::data::record::RawRecord;
use crate::data::timestamp::Timestamp;
use crate::printer::printers::{escape_message, ColorSpec, NoColor, OutputMode, RecordPrinter, WriteColor};
use crate::readers::legacyreader::{decode_legacy_record, LegacyDecode};

use std::io::{Error, ErrorKind, Write};

use ::termcolor::Ansi;
use ::test_case::test_case;

fn boot_2023() -> BootTime {
    Utc.with_ymd_and_hms(2023, 3, 4, 10, 0, 0)
        .single()
        .unwrap()
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn record(level: u8, facility: u8, sec: u64, usec: u64, message: &[u8]) -> RawRecord<'_> {
    RawRecord {
        message,
        priority: Some((facility as u64) << 3 | level as u64),
        level: Some(level),
        facility: Some(facility),
        timestamp: Some(Timestamp::new(sec, usec)),
        ..Default::default()
    }
}

fn printer(mode: OutputMode, time_format: TimeFormat, boot: Option<BootTime>) -> RecordPrinter<NoColor<Vec<u8>>> {
    RecordPrinter::new(NoColor::new(Vec::new()), mode, time_format, boot, utc(), false)
}

/// Print each record, return everything printed.
fn print_all(printer: &mut RecordPrinter<NoColor<Vec<u8>>>, records: &[RawRecord]) -> String {
    for record in records.iter() {
        printer.print_record(record).unwrap();
    }
    String::from_utf8_lossy(printer.get_ref().get_ref()).to_string()
}

fn escaped(message: &[u8], indent: usize) -> String {
    let mut out: Bytes = Bytes::new();
    escape_message(message, indent, &mut out);
    String::from_utf8_lossy(&out).to_string()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// escape_message
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[test_case(b"plain text", "plain text")]
#[test_case(b"tab\there", "tab\there")]
#[test_case(b"a\x01b", "a\\x01b"; "control byte")]
#[test_case(b"del\x7f", "del\\x7f")]
#[test_case(b"bad \xff utf8", "bad \\xff utf8")]
#[test_case(b"bad \xe2\x82 seq", "bad \\xe2\\x82 seq"; "truncated sequence")]
#[test_case("caf\u{e9}".as_bytes(), "caf\u{e9}"; "multibyte kept")]
#[test_case(b"c1 \xc2\x85 ctrl", "c1 \\xc2\\x85 ctrl"; "multibyte control")]
#[test_case(b"ab\0cd", "ab"; "nul ends message")]
#[test_case(b"", "")]
fn test_escape_message(message: &[u8], expect: &str) {
    assert_eq!(escaped(message, 0), expect);
}

#[test_case(b"one\ntwo", 3, "one\n   two")]
#[test_case(b"one\ntwo\n", 2, "one\n  two\n"; "final newline not indented")]
#[test_case(b"one\n\0", 2, "one\n"; "newline before nul not indented")]
#[test_case(b"one\ntwo", 0, "one\ntwo"; "no indent")]
fn test_escape_message_indent(message: &[u8], indent: usize, expect: &str) {
    assert_eq!(escaped(message, indent), expect);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// OutputMode
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[test]
fn test_OutputMode() {
    assert_eq!(OutputMode::default(), OutputMode::Decoded);
    assert_eq!("raw".parse::<OutputMode>(), Ok(OutputMode::Raw));
    assert_eq!(OutputMode::Decoded.to_string(), "decoded");
    assert!("cooked".parse::<OutputMode>().is_err());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RecordPrinter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[test]
fn test_RecordPrinter_raw() {
    let mut p = printer(OutputMode::Raw, TimeFormat::Iso8601, None);
    let out = print_all(&mut p, &[record(6, 0, 100, 0, b"boot ok"), record(6, 3, 1, 5, b"daemon\n")]);
    assert_eq!(out, "<6>[  100.000000] boot ok\n<30>[    1.000005] daemon\n");
}

#[test_case(b"<99>[    5.000000] high facility\n", "<99>[    5.000000] high facility\n"; "facility past the table")]
#[test_case(b"<3>[    5.000000] kernel\n", "<3>[    5.000000] kernel\n"; "facility zero")]
#[test_case(b"<191>[    5.000000] local7 debug\n", "<191>[    5.000000] local7 debug\n"; "local7")]
fn test_RecordPrinter_raw_priority_as_read(line: &[u8], expect: &str) {
    let mut p = printer(OutputMode::Raw, TimeFormat::Time, None);
    let out = print_all(&mut p, &[decode_legacy_record(line, &LegacyDecode::default())]);
    assert_eq!(out, expect);
}

#[test]
fn test_RecordPrinter_raw_level_without_priority() {
    let mut p = printer(OutputMode::Raw, TimeFormat::Time, None);
    let mut r = RawRecord::new(b"no priority");
    r.level = Some(3);
    r.timestamp = Some(Timestamp::new(5, 0));
    let out = print_all(&mut p, &[r]);
    assert_eq!(out, "[    5.000000] no priority\n");
}

#[test]
fn test_RecordPrinter_raw_absent_fields() {
    let mut p = printer(OutputMode::Raw, TimeFormat::Time, None);
    let out = print_all(&mut p, &[RawRecord::new(b"bare")]);
    assert_eq!(out, "bare\n");
}

#[test_case(TimeFormat::Time, "kern  :info  (0:6) [  100.000000] boot ok\n")]
#[test_case(TimeFormat::None, "kern  :info  (0:6) boot ok\n")]
#[test_case(TimeFormat::Delta, "kern  :info  (0:6) [<    0.000000>] boot ok\n")]
#[test_case(TimeFormat::TimeDelta, "kern  :info  (0:6) [  100.000000 <    0.000000>] boot ok\n")]
#[test_case(TimeFormat::Ctime, "kern  :info  (0:6) [Sat Mar  4 10:01:40 2023] boot ok\n")]
#[test_case(TimeFormat::CtimeDelta, "kern  :info  (0:6) [Sat Mar  4 10:01:40 2023 <    0.000000>] boot ok\n")]
#[test_case(TimeFormat::Reltime, "kern  :info  (0:6) [Mar 4 10:01] boot ok\n")]
#[test_case(TimeFormat::Iso8601, "kern  :info  (0:6) 2023-03-04T10:01:40,000000+00:00 boot ok\n")]
fn test_RecordPrinter_decoded_first_record(time_format: TimeFormat, expect: &str) {
    let mut p = printer(OutputMode::Decoded, time_format, Some(boot_2023()));
    assert_eq!(p.time_format(), time_format);
    let out = print_all(&mut p, &[record(6, 0, 100, 0, b"boot ok")]);
    assert_eq!(out, expect);
    assert_eq!(p.count_bytes(), expect.len() as u64);
}

#[test_case(TimeFormat::Ctime)]
#[test_case(TimeFormat::CtimeDelta)]
#[test_case(TimeFormat::Reltime)]
#[test_case(TimeFormat::Iso8601)]
fn test_RecordPrinter_no_boot_time(time_format: TimeFormat) {
    let mut p = printer(OutputMode::Decoded, time_format, None);
    assert_eq!(p.time_format(), TimeFormat::None);
    let out = print_all(&mut p, &[record(3, 0, 100, 0, b"x")]);
    assert_eq!(out, "kern  :err   (0:3) x\n");
}

#[test]
fn test_RecordPrinter_decoded_absent_names() {
    let mut p = printer(OutputMode::Decoded, TimeFormat::None, None);
    let mut rec = RawRecord::new(b"odd");
    rec.level = Some(2);
    rec.facility = None;
    let out = print_all(&mut p, &[rec]);
    assert_eq!(out, "-     :crit  (-:2) odd\n");
}

#[test]
fn test_RecordPrinter_delta() {
    let mut p = printer(OutputMode::Decoded, TimeFormat::Delta, None);
    let out = print_all(
        &mut p,
        &[record(6, 0, 100, 0, b"a"), record(6, 0, 101, 500_000, b"b"), record(6, 0, 101, 500_000, b"c")],
    );
    assert_eq!(
        out,
        "kern  :info  (0:6) [<    0.000000>] a\n\
         kern  :info  (0:6) [<    1.500000>] b\n\
         kern  :info  (0:6) [<    0.000000>] c\n"
    );
}

#[test]
fn test_RecordPrinter_reltime() {
    let mut p = printer(OutputMode::Decoded, TimeFormat::Reltime, Some(boot_2023()));
    let out = print_all(
        &mut p,
        &[
            record(6, 0, 100, 0, b"a"),
            record(6, 0, 101, 500_000, b"b"),
            record(6, 0, 115, 0, b"c"),
            record(6, 0, 130, 0, b"d"),
        ],
    );
    assert_eq!(
        out,
        "kern  :info  (0:6) [Mar 4 10:01] a\n\
         kern  :info  (0:6) [  +1.500000] b\n\
         kern  :info  (0:6) [ +13.500000] c\n\
         kern  :info  (0:6) [Mar 4 10:02] d\n"
    );
}

#[test]
fn test_RecordPrinter_iso_microseconds_offset() {
    let tz = FixedOffset::east_opt(-5 * 3600).unwrap();
    let mut p = RecordPrinter::new(
        NoColor::new(Vec::new()),
        OutputMode::Decoded,
        TimeFormat::Iso8601,
        Some(boot_2023()),
        tz,
        false,
    );
    let out = print_all(&mut p, &[record(6, 0, 100, 5, b"x")]);
    assert_eq!(out, "kern  :info  (0:6) 2023-03-04T05:01:40,000005-05:00 x\n");
}

#[test]
fn test_RecordPrinter_empty_message_skips_delta() {
    let mut p = printer(OutputMode::Decoded, TimeFormat::Delta, None);
    let out = print_all(
        &mut p,
        &[record(6, 0, 100, 0, b"a"), record(6, 0, 200, 0, b""), record(6, 0, 101, 0, b"c")],
    );
    assert_eq!(
        out,
        "kern  :info  (0:6) [<    0.000000>] a\n\
         \n\
         kern  :info  (0:6) [<    1.000000>] c\n"
    );
}

#[test]
fn test_RecordPrinter_indent() {
    let mut p = printer(OutputMode::Decoded, TimeFormat::Time, None);
    let prefix = "kern  :info  (0:6) [  100.000000] ";
    let out = print_all(&mut p, &[record(6, 0, 100, 0, b"line one\nline two\n")]);
    let expect = format!("{}line one\n{}line two\n", prefix, " ".repeat(prefix.len()));
    assert_eq!(out, expect);
}

#[test]
fn test_RecordPrinter_escapes() {
    let mut p = printer(OutputMode::Raw, TimeFormat::Time, None);
    let out = print_all(&mut p, &[record(6, 0, 1, 0, b"bell\x07 \xff")]);
    assert_eq!(out, "<6>[    1.000000] bell\\x07 \\xff\n");
}

#[test]
fn test_RecordPrinter_color() {
    let mut p = RecordPrinter::new(
        Ansi::new(Vec::new()),
        OutputMode::Decoded,
        TimeFormat::Time,
        None,
        utc(),
        true,
    );
    p.print_record(&record(3, 0, 100, 0, b"disk error")).unwrap();
    let out = String::from_utf8_lossy(p.get_ref().get_ref()).to_string();
    assert!(out.contains("\x1b[32m"), "no green time prefix in {:?}", out);
    assert!(out.contains("\x1b[31m"), "no red message in {:?}", out);
    assert!(out.contains("disk error"));

    let mut p = RecordPrinter::new(
        Ansi::new(Vec::new()),
        OutputMode::Decoded,
        TimeFormat::Time,
        None,
        utc(),
        true,
    );
    p.print_record(&record(6, 0, 100, 0, b"boot ok")).unwrap();
    let out = String::from_utf8_lossy(p.get_ref().get_ref()).to_string();
    assert!(!out.contains("\x1b[31m"), "unexpected red in {:?}", out);
}

#[test]
fn test_RecordPrinter_no_color() {
    let mut p = RecordPrinter::new(
        Ansi::new(Vec::new()),
        OutputMode::Decoded,
        TimeFormat::Time,
        None,
        utc(),
        false,
    );
    p.print_record(&record(3, 0, 100, 0, b"disk error")).unwrap();
    let out = String::from_utf8_lossy(p.get_ref().get_ref()).to_string();
    assert!(!out.contains('\x1b'), "{:?}", out);
}

/// A writer whose every write fails.
pub struct FailWriter(pub ErrorKind);

impl Write for FailWriter {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(Error::from(self.0))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Err(Error::from(self.0))
    }
}

impl WriteColor for FailWriter {
    fn supports_color(&self) -> bool {
        false
    }

    fn set_color(&mut self, _spec: &ColorSpec) -> std::io::Result<()> {
        Ok(())
    }

    fn reset(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test_case(ErrorKind::BrokenPipe)]
#[test_case(ErrorKind::PermissionDenied)]
fn test_RecordPrinter_write_error(kind: ErrorKind) {
    let mut p = RecordPrinter::new(FailWriter(kind), OutputMode::Decoded, TimeFormat::Time, None, utc(), false);
    let err = p.print_record(&record(6, 0, 1, 0, b"x")).unwrap_err();
    assert_eq!(err.kind(), kind);
}
