// src/tests/syslogbuffer_tests.rs

//! tests for `src/readers/syslogbuffer.rs`

#![allow(non_snake_case)]

use crate::readers::syslogbuffer::{
    clear_syslog_buffer,
    read_syslog_buffer,
    syslog_buffer_size,
    ReadAction,
    SYSLOG_ACTION_CLEAR,
    SYSLOG_ACTION_READ_ALL,
    SYSLOG_ACTION_READ_CLEAR,
    SYSLOG_ACTION_SIZE_BUFFER,
    SYSLOG_BUFSIZE_DEFAULT,
    SYSLOG_BUFSIZE_MAX,
};
use crate::tests::common::{FakeKlogctl, LEGACY_TWO};

use std::io::ErrorKind;

use ::test_case::test_case;

#[test]
fn test_ReadAction() {
    assert_eq!(ReadAction::default(), ReadAction::ReadAll);
    assert_eq!(ReadAction::ReadAll.action(), SYSLOG_ACTION_READ_ALL);
    assert_eq!(ReadAction::ReadClear.action(), SYSLOG_ACTION_READ_CLEAR);
    assert_eq!(ReadAction::ReadClear.to_string(), "read-clear");
}

#[test_case(0, None)]
#[test_case(131072, Some(131072))]
fn test_syslog_buffer_size(size: usize, expect: Option<usize>) {
    let mut ctl = FakeKlogctl {
        size,
        ..Default::default()
    };
    assert_eq!(syslog_buffer_size(&mut ctl), expect);
    assert_eq!(ctl.actions(), vec![SYSLOG_ACTION_SIZE_BUFFER]);
}

#[test]
fn test_read_syslog_buffer_short_read() {
    let mut ctl = FakeKlogctl::new(LEGACY_TWO);
    let data = read_syslog_buffer(&mut ctl, ReadAction::ReadAll, None).unwrap();
    assert_eq!(data, LEGACY_TWO);
    assert_eq!(ctl.read_sizes(), vec![SYSLOG_BUFSIZE_DEFAULT]);
    assert_eq!(ctl.data, LEGACY_TWO, "buffer must not be cleared");
}

#[test]
fn test_read_syslog_buffer_explicit_size() {
    let mut ctl = FakeKlogctl::new(LEGACY_TWO);
    let data = read_syslog_buffer(&mut ctl, ReadAction::ReadAll, Some(10)).unwrap();
    assert_eq!(data, &LEGACY_TWO[..18]);
    assert_eq!(ctl.calls, vec![(SYSLOG_ACTION_READ_ALL, 18)]);
}

#[test]
fn test_read_syslog_buffer_explicit_size_clear() {
    let mut ctl = FakeKlogctl::new(LEGACY_TWO);
    let data = read_syslog_buffer(&mut ctl, ReadAction::ReadClear, Some(4096)).unwrap();
    assert_eq!(data, LEGACY_TWO);
    assert_eq!(ctl.calls, vec![(SYSLOG_ACTION_READ_CLEAR, 4104)]);
    assert!(ctl.data.is_empty());
}

#[test]
fn test_read_syslog_buffer_grows() {
    let mut ctl = FakeKlogctl {
        always_full: true,
        ..Default::default()
    };
    let data = read_syslog_buffer(&mut ctl, ReadAction::ReadAll, None).unwrap();
    let sizes = ctl.read_sizes();
    assert_eq!(sizes[0], 16392);
    assert_eq!(sizes[1], 65568);
    for pair in sizes.windows(2) {
        assert_eq!(pair[1], pair[0] * 4);
    }
    let last = *sizes.last().unwrap();
    assert!(last > SYSLOG_BUFSIZE_MAX);
    assert!(sizes[sizes.len() - 2] <= SYSLOG_BUFSIZE_MAX);
    assert_eq!(data.len(), last);
}

#[test]
fn test_read_syslog_buffer_grow_then_clear() {
    let mut ctl = FakeKlogctl::new(LEGACY_TWO);
    let data = read_syslog_buffer(&mut ctl, ReadAction::ReadClear, None).unwrap();
    assert_eq!(data, LEGACY_TWO);
    assert_eq!(ctl.actions(), vec![SYSLOG_ACTION_READ_ALL, SYSLOG_ACTION_READ_CLEAR]);
    assert!(ctl.data.is_empty());
}

#[test]
fn test_read_syslog_buffer_empty_no_clear() {
    let mut ctl = FakeKlogctl::new(b"");
    let data = read_syslog_buffer(&mut ctl, ReadAction::ReadClear, None).unwrap();
    assert!(data.is_empty());
    assert_eq!(ctl.actions(), vec![SYSLOG_ACTION_READ_ALL]);
}

#[test_case(None)]
#[test_case(Some(100))]
fn test_read_syslog_buffer_error(bufsize: Option<usize>) {
    let mut ctl = FakeKlogctl {
        fail: Some(ErrorKind::PermissionDenied),
        ..Default::default()
    };
    let err = read_syslog_buffer(&mut ctl, ReadAction::ReadAll, bufsize).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[test]
fn test_clear_syslog_buffer() {
    let mut ctl = FakeKlogctl::new(LEGACY_TWO);
    clear_syslog_buffer(&mut ctl).unwrap();
    assert_eq!(ctl.actions(), vec![SYSLOG_ACTION_CLEAR]);
    assert!(ctl.data.is_empty());
}
