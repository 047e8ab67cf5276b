// src/tests/common.rs

//! Fakes of the kernel interfaces and helpers shared by tests.

#![allow(non_snake_case)]

use crate::common::{Bytes, ResultS3};
use crate::data::record::{ContinuationFlag, Facility, Level, RawRecord};
use crate::data::timestamp::Timestamp;
use crate::readers::kmsgreader::KmsgDevice;
use crate::readers::syslogbuffer::{
    KlogCtl,
    SYSLOG_ACTION_CLEAR,
    SYSLOG_ACTION_READ_ALL,
    SYSLOG_ACTION_READ_CLEAR,
    SYSLOG_ACTION_SIZE_BUFFER,
};
use crate::readers::RecordSource;

use std::collections::VecDeque;
use std::io::{Error, ErrorKind, Result};

/// Legacy buffer with two records, severities 5 and 3.
pub const LEGACY_TWO: &[u8] = b"<5>[100.000000] boot ok\n<3>[101.500000] disk error\n";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// OwnedRecord
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A [`RawRecord`] copied out of the reader's buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedRecord {
    pub message: Bytes,
    pub priority: Option<u64>,
    pub level: Option<Level>,
    pub facility: Option<Facility>,
    pub timestamp: Option<Timestamp>,
    pub sequence: Option<u64>,
    pub flag: ContinuationFlag,
}

impl OwnedRecord {
    pub fn message_str(&self) -> String {
        String::from_utf8_lossy(&self.message).to_string()
    }
}

impl From<&RawRecord<'_>> for OwnedRecord {
    fn from(record: &RawRecord<'_>) -> Self {
        OwnedRecord {
            message: record.message.to_vec(),
            priority: record.priority,
            level: record.level,
            facility: record.facility,
            timestamp: record.timestamp,
            sequence: record.sequence,
            flag: record.flag,
        }
    }
}

/// Pull from `source` until `Done` or an error.
pub fn drain<S: RecordSource + ?Sized>(source: &mut S) -> Vec<OwnedRecord> {
    drain_results(source)
        .into_iter()
        .map_while(|result| result.ok())
        .collect()
}

/// Pull from `source` until `Done`, keeping errors. Stops after the second
/// consecutive error.
pub fn drain_results<S: RecordSource + ?Sized>(
    source: &mut S,
) -> Vec<std::result::Result<OwnedRecord, ErrorKind>> {
    let mut results = Vec::new();
    let mut errors_in_a_row: usize = 0;
    for _ in 0..10_000 {
        match source.next_record() {
            ResultS3::Found(record) => {
                errors_in_a_row = 0;
                results.push(Ok(OwnedRecord::from(&record)));
            }
            ResultS3::Done => return results,
            ResultS3::Err(err) => {
                results.push(Err(err.kind()));
                errors_in_a_row += 1;
                if errors_in_a_row == 2 {
                    return results;
                }
            }
        }
    }
    panic!("source never returned Done");
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// FakeKmsg
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One scripted result of [`FakeKmsg::read_record`].
#[derive(Clone, Debug)]
pub enum Read {
    Record(Bytes),
    Fail(ErrorKind),
    /// `Ok(0)`
    Eof,
}

impl Read {
    pub fn rec(data: &[u8]) -> Read {
        Read::Record(data.to_vec())
    }
}

/// A `/dev/kmsg` stand-in returning scripted reads. Once the script is
/// exhausted every read would block.
#[derive(Debug, Default)]
pub struct FakeKmsg {
    pub reads: VecDeque<Read>,
    /// scripted results of `wait_readable`; when empty, readable if any
    /// read remains
    pub waits: VecDeque<std::result::Result<bool, ErrorKind>>,
    pub read_calls: usize,
    pub wait_calls: usize,
}

impl FakeKmsg {
    pub fn new(reads: Vec<Read>) -> FakeKmsg {
        FakeKmsg {
            reads: reads.into(),
            ..Default::default()
        }
    }

    /// Each of `records` is one successful physical read.
    pub fn records(records: &[&[u8]]) -> FakeKmsg {
        FakeKmsg::new(records.iter().map(|r| Read::rec(r)).collect())
    }
}

impl KmsgDevice for FakeKmsg {
    fn read_record(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.read_calls += 1;
        match self.reads.pop_front() {
            None => Err(Error::from(ErrorKind::WouldBlock)),
            Some(Read::Eof) => Ok(0),
            Some(Read::Fail(kind)) => Err(Error::from(kind)),
            Some(Read::Record(data)) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
        }
    }

    fn wait_readable(&mut self, _timeout_ms: u16) -> Result<bool> {
        self.wait_calls += 1;
        match self.waits.pop_front() {
            Some(Ok(readable)) => Ok(readable),
            Some(Err(kind)) => Err(Error::from(kind)),
            None => Ok(!self.reads.is_empty()),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// FakeKlogctl
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A `klogctl` stand-in over an in-memory kernel buffer.
#[derive(Debug, Default)]
pub struct FakeKlogctl {
    /// the kernel buffer
    pub data: Bytes,
    /// answer to `SYSLOG_ACTION_SIZE_BUFFER`
    pub size: usize,
    /// every read reports a full buffer, without writing it
    pub always_full: bool,
    /// every read fails with this
    pub fail: Option<ErrorKind>,
    /// `(action, buffer length)` of each call
    pub calls: Vec<(i32, usize)>,
}

impl FakeKlogctl {
    pub fn new(data: &[u8]) -> FakeKlogctl {
        FakeKlogctl {
            data: data.to_vec(),
            ..Default::default()
        }
    }

    pub fn actions(&self) -> Vec<i32> {
        self.calls.iter().map(|(action, _)| *action).collect()
    }

    pub fn read_sizes(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter(|(action, _)| *action == SYSLOG_ACTION_READ_ALL || *action == SYSLOG_ACTION_READ_CLEAR)
            .map(|(_, len)| *len)
            .collect()
    }
}

impl KlogCtl for FakeKlogctl {
    fn klogctl(&mut self, action: i32, buf: &mut [u8]) -> Result<usize> {
        self.calls.push((action, buf.len()));
        match action {
            SYSLOG_ACTION_SIZE_BUFFER => Ok(self.size),
            SYSLOG_ACTION_CLEAR => {
                if let Some(kind) = self.fail {
                    return Err(Error::from(kind));
                }
                self.data.clear();
                Ok(0)
            }
            SYSLOG_ACTION_READ_ALL | SYSLOG_ACTION_READ_CLEAR => {
                if let Some(kind) = self.fail {
                    return Err(Error::from(kind));
                }
                if self.always_full {
                    return Ok(buf.len());
                }
                let len = self.data.len().min(buf.len());
                buf[..len].copy_from_slice(&self.data[..len]);
                if action == SYSLOG_ACTION_READ_CLEAR {
                    self.data.clear();
                }
                Ok(len)
            }
            _ => Err(Error::from(ErrorKind::InvalidInput)),
        }
    }
}
