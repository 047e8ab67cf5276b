// benches/bench_legacyreader.rs
//
// benchmark decoding of a legacy kernel buffer by
// `krrlib::readers::legacyreader::LegacyReader`, with and without printing
//

#![allow(non_upper_case_globals, dead_code, non_snake_case)]

extern crate krrlib;

use krrlib::common::Bytes;
use krrlib::data::datetime::{FixedOffset, TimeFormat};
use krrlib::data::timestamp::Timestamp;
use krrlib::printer::printers::{NoColor, OutputMode, RecordPrinter};
use krrlib::readers::legacyreader::{decode_legacy_record, LegacyDecode, LegacyReader, RecordBuffer};
use krrlib::readers::session::{scan, scan_quiet, RecordFilter};

extern crate criterion;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

extern crate lazy_static;
use lazy_static::lazy_static;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const RECORDS: usize = 2000;

lazy_static! {
    /// about the size of a default kernel buffer
    static ref Buffer1: Bytes = {
        let mut data: Bytes = Bytes::with_capacity(RECORDS * 64);
        for i in 0..RECORDS {
            data.extend_from_slice(
                format!("<{}>[{:5}.{:06}] usb 1-{}: new high-speed USB device number {}\n", i % 8, i / 10, i * 7 % 1_000_000, i % 4, i)
                    .as_bytes(),
            );
        }
        data
    };
}

#[inline(never)]
fn legacyreader_scan_quiet() {
    let mut reader = LegacyReader::new(RecordBuffer::Owned(Buffer1.clone()));
    let count = scan_quiet(&mut reader, &RecordFilter::new(7, Timestamp::ZERO)).unwrap();
    black_box(count);
}

#[inline(never)]
fn legacyreader_scan_print() {
    let mut reader = LegacyReader::new(RecordBuffer::Owned(Buffer1.clone()));
    let mut printer = RecordPrinter::new(
        NoColor::new(Vec::with_capacity(Buffer1.len() * 2)),
        OutputMode::Decoded,
        TimeFormat::TimeDelta,
        None,
        FixedOffset::east_opt(0).unwrap(),
        false,
    );
    let count = scan(&mut reader, &RecordFilter::new(7, Timestamp::ZERO), Some(&mut printer)).unwrap();
    black_box(count);
    black_box(printer.into_inner());
}

#[inline(never)]
fn decode_one_record() {
    let record = decode_legacy_record(black_box(b"<6>[  123.456789] eth0: link up"), &LegacyDecode::default());
    black_box(record);
}

// criterion runners

fn criterion_benchmark(c: &mut Criterion) {
    let mut bg = c.benchmark_group("LegacyReader");
    bg.bench_function("decode_one_record", |b| b.iter(decode_one_record));
    bg.bench_function("legacyreader_scan_quiet", |b| b.iter(legacyreader_scan_quiet));
    bg.bench_function("legacyreader_scan_print", |b| b.iter(legacyreader_scan_print));
    bg.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
