// src/readers/kmsgreader.rs

//! Implements [`KmsgReader`], the reader of the `/dev/kmsg` device, and
//! [`DevKmsg`], the device itself.
//!
//! Each `read` of `/dev/kmsg` returns one physical record
//!
//! ```text
//! facility*8+level,sequence,microseconds,flag[,...];message\n TAG=value
//! ```
//!
//! The kernel writes a long line as several physical records ("fragments")
//! marked by the continuation flags `c` and `+`. A `KmsgReader`
//! reassembles the fragments into one [`RawRecord`]. The kernel does not
//! always write the record that ends a fragment; a fragment is also
//! complete when
//!
//! * a record with a missing or unknown flag arrives; that record is set
//!   aside and returned next,
//! * the device has no more records (non-blocking mode),
//! * no record arrives within [`POLL_TIMEOUT_MS`] (follow mode).
//!
//! [`KmsgReader`]: self::KmsgReader
//! [`DevKmsg`]: self::DevKmsg
//! [`RawRecord`]: crate::data::record::RawRecord

use crate::common::{Bytes, Count, ResultS3};
use crate::data::record::{
    parse_priority,
    split_priority,
    unhexmangle_in_place,
    ContinuationFlag,
    Facility,
    Level,
    RawRecord,
};
use crate::data::timestamp::{parse_decimal_u64, parse_kmsg_timestamp, Timestamp};
#[cfg(any(debug_assertions, test))]
use crate::debug::printers::buffer_to_String_noraw;
#[allow(unused_imports)]
use crate::debug::printers::{de_err, de_wrn};
use crate::readers::{RecordSource, ResultS3_Record};

use std::fs::File;
use std::io::{Error, ErrorKind, Read, Result};
use std::os::fd::{AsFd, AsRawFd};
use std::os::unix::fs::OpenOptionsExt;

use ::bstr::ByteSlice;
#[allow(unused_imports)]
use ::more_asserts::{debug_assert_le, debug_assert_lt};
use ::nix::poll::{poll, PollFd, PollFlags, PollTimeout};
#[allow(unused_imports)]
use ::si_trace_print::{def1n, def1x, defn, defo, defx, defñ};

/// Path of the kernel message device.
pub const KMSG_DEVICE_PATH: &str = "/dev/kmsg";

/// Size of the physical read buffer and of the fragment buffer.
pub const BUFSIZ: usize = 8192;

/// Follow mode; how long to wait for the rest of a fragment.
pub const POLL_TIMEOUT_MS: u16 = 100;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// the device
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A source of physical `/dev/kmsg` records.
pub trait KmsgDevice {
    /// Read one physical record into `buf`. `Ok(0)` is the end of data.
    fn read_record(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Wait up to `timeout_ms` for a record to become readable.
    /// `Ok(false)` if the wait timed out.
    fn wait_readable(&mut self, timeout_ms: u16) -> Result<bool>;
}

/// The `/dev/kmsg` device.
#[derive(Debug)]
pub struct DevKmsg {
    /// `None` once closed
    file: Option<File>,
    follow: bool,
}

impl DevKmsg {
    /// Open [`KMSG_DEVICE_PATH`].
    pub fn open(follow: bool) -> Result<DevKmsg> {
        DevKmsg::open_path(KMSG_DEVICE_PATH, follow)
    }

    /// Open a kmsg device at `path`. Non-blocking unless `follow`.
    ///
    /// The read position is moved to the first record after the last
    /// `SYSLOG_ACTION_CLEAR`, so that a clear is honored.
    pub fn open_path(path: &str, follow: bool) -> Result<DevKmsg> {
        defn!("({:?}, follow {})", path, follow);
        let mut options = File::options();
        options.read(true);
        if !follow {
            options.custom_flags(::libc::O_NONBLOCK);
        }
        let file = match options.open(path) {
            Ok(val) => val,
            Err(err) => {
                defx!("open({:?}) error {}", path, err);
                return Err(err);
            }
        };
        // SAFETY: `file` is an open descriptor
        let rc = unsafe { ::libc::lseek(file.as_raw_fd(), 0, ::libc::SEEK_DATA) };
        if rc < 0 {
            defo!("lseek(SEEK_DATA) error {}; ignored", Error::last_os_error());
        }
        defx!();

        Ok(DevKmsg {
            file: Some(file),
            follow,
        })
    }

    pub const fn follow(&self) -> bool {
        self.follow
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Close the device. Later reads fail, which ends a scan.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            defñ!("closed");
        }
    }

    fn file(&self) -> Result<&File> {
        match &self.file {
            Some(file) => Ok(file),
            None => Err(Error::new(ErrorKind::NotConnected, "kmsg device is closed")),
        }
    }
}

impl KmsgDevice for DevKmsg {
    fn read_record(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut file = self.file()?;
        file.read(buf)
    }

    fn wait_readable(&mut self, timeout_ms: u16) -> Result<bool> {
        let file = self.file()?;
        let mut fds = [PollFd::new(file.as_fd(), PollFlags::POLLIN)];
        poll(&mut fds, PollTimeout::from(timeout_ms))?;
        let readable = fds[0]
            .revents()
            .map_or(false, |revents| revents.contains(PollFlags::POLLIN));

        Ok(readable)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// physical record decoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The header fields of a physical `/dev/kmsg` record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KmsgHeader {
    /// packed `facility * 8 + level` as read
    pub priority: Option<u64>,
    pub level: Option<Level>,
    pub facility: Option<Facility>,
    pub sequence: Option<u64>,
    pub timestamp: Option<Timestamp>,
    pub flag: ContinuationFlag,
}

/// Does a header field end at `head[at]`?
fn field_ends(head: &[u8], at: usize) -> bool {
    matches!(head.get(at), Some(b',') | Some(b';'))
}

/// Decode the header of the physical record `buf` and locate its message.
///
/// The header ends at the first `;`. Header fields are parsed in order; the
/// first field that fails to parse leaves itself and all later fields
/// absent. Without a `;` the whole record is the message. The message ends
/// at the first newline.
///
/// Returns the header and the message range `[beg, end)` within `buf`.
/// The message is still kernel-escaped.
pub fn decode_kmsg_header(buf: &[u8]) -> (KmsgHeader, usize, usize) {
    let mut header = KmsgHeader {
        flag: ContinuationFlag::ForcedFlush,
        ..Default::default()
    };
    let msg_beg: usize = match buf.find_byte(b';') {
        None => 0,
        Some(semi) => {
            // the header fields with their `;` terminator
            let head = &buf[..=semi];
            let mut at: usize = 0;
            'fields: {
                match parse_priority(head).filter(|(_, len)| field_ends(head, *len)) {
                    Some((priority, len)) => {
                        let (facility, level) = split_priority(priority);
                        header.priority = Some(priority);
                        header.facility = facility;
                        header.level = Some(level);
                        at += len + 1;
                    }
                    None => break 'fields,
                }
                match parse_decimal_u64(&head[at..]).filter(|(_, len)| field_ends(head, at + *len)) {
                    Some((seq, len)) => {
                        header.sequence = Some(seq);
                        at += len + 1;
                    }
                    None => break 'fields,
                }
                match parse_kmsg_timestamp(&head[at..]) {
                    Some((ts, len)) => {
                        header.timestamp = Some(ts);
                        at += len + 1;
                    }
                    None => break 'fields,
                }
                if at < head.len() {
                    let flag = head[at];
                    header.flag = match flag {
                        b',' | b';' => ContinuationFlag::ForcedFlush,
                        _ => ContinuationFlag::from_byte(Some(flag)),
                    };
                }
            }
            semi + 1
        }
    };
    let msg_end: usize = match buf[msg_beg..].find_byte(b'\n') {
        Some(i) => msg_beg + i,
        None => buf.len(),
    };

    (header, msg_beg, msg_end)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// KmsgReader
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where the next [`RawRecord`] of a [`KmsgReader`] comes from.
enum Next {
    /// the physical record in `read_buf`; header and message range
    Physical(KmsgHeader, usize, usize),
    /// the reassembled fragment
    Fragment,
    Done,
}

/// Reader of `/dev/kmsg` that reassembles fragmented records.
pub struct KmsgReader<D: KmsgDevice> {
    device: D,
    follow: bool,
    /// the physical read buffer
    read_buf: Bytes,
    read_len: usize,
    /// a physical record set aside, returned before anything read later
    saved: Option<Bytes>,
    /// reassembled message, at most [`BUFSIZ`] bytes
    fragment: Bytes,
    /// header of the first fragment; `Some` while a fragment is pending
    fragment_header: Option<KmsgHeader>,
    /// the fragment was returned and must be cleared
    fragment_returned: bool,
    /// an error to return after the pending fragment
    deferred_err: Option<Error>,
    reads: Count,
    retries: Count,
    fragments: Count,
    fragment_overflows: Count,
    records: Count,
}

impl<D: KmsgDevice> std::fmt::Debug for KmsgReader<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("KmsgReader")
            .field("follow", &self.follow)
            .field("saved", &self.saved.as_ref().map(|s| s.len()))
            .field("fragment", &self.fragment.len())
            .field("fragment_header", &self.fragment_header)
            .field("reads", &self.reads)
            .field("retries", &self.retries)
            .field("fragment_overflows", &self.fragment_overflows)
            .field("records", &self.records)
            .finish()
    }
}

impl<D: KmsgDevice> KmsgReader<D> {
    /// Create a `KmsgReader` and do the first read from `device`.
    ///
    /// Some kernels allow opening `/dev/kmsg` yet fail every read, so a
    /// failed first read is an `Err`. A device with no records yet is fine.
    pub fn open(device: D, follow: bool) -> Result<KmsgReader<D>> {
        defn!("follow {}", follow);
        let mut reader = KmsgReader::new(device, follow);
        loop {
            match reader.device.read_record(&mut reader.read_buf) {
                Ok(0) => {
                    defo!("first read is empty");
                }
                Ok(len) => {
                    reader.reads += 1;
                    reader.saved = Some(reader.read_buf[..len].to_vec());
                    defo!("first read {} bytes", len);
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    defo!("first read would block; no records yet");
                }
                Err(err) if matches!(err.kind(), ErrorKind::BrokenPipe | ErrorKind::Interrupted) => {
                    reader.retries += 1;
                    continue;
                }
                Err(err) => {
                    defx!("first read error {}", err);
                    return Err(err);
                }
            }
            break;
        }
        defx!();

        Ok(reader)
    }

    /// Create a `KmsgReader` without a first read.
    pub fn new(device: D, follow: bool) -> KmsgReader<D> {
        KmsgReader {
            device,
            follow,
            read_buf: vec![0; BUFSIZ],
            read_len: 0,
            saved: None,
            fragment: Bytes::with_capacity(BUFSIZ),
            fragment_header: None,
            fragment_returned: false,
            deferred_err: None,
            reads: 0,
            retries: 0,
            fragments: 0,
            fragment_overflows: 0,
            records: 0,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Count of physical records read.
    pub const fn count_reads(&self) -> Count {
        self.reads
    }

    /// Count of reads retried after `EPIPE` or `EINTR`.
    pub const fn count_retries(&self) -> Count {
        self.retries
    }

    /// Count of fragments appended to the fragment buffer.
    pub const fn count_fragments(&self) -> Count {
        self.fragments
    }

    /// Count of fragments truncated because the fragment buffer was full.
    pub const fn fragment_overflows(&self) -> Count {
        self.fragment_overflows
    }

    /// Count of logical records returned.
    pub const fn count_records(&self) -> Count {
        self.records
    }

    /// Is a fragment waiting for its continuation?
    pub const fn fragment_pending(&self) -> bool {
        self.fragment_header.is_some()
    }

    /// Unescape the message of the physical record in `read_buf`, return
    /// the new message end.
    fn unescape(&mut self, msg_beg: usize, msg_end: usize) -> usize {
        msg_beg + unhexmangle_in_place(&mut self.read_buf[msg_beg..msg_end])
    }

    /// Append the message of the physical record in `read_buf` to the
    /// fragment. Bytes past [`BUFSIZ`] are dropped.
    fn append_fragment(&mut self, header: &KmsgHeader, msg_beg: usize, msg_end: usize) {
        let msg_end = self.unescape(msg_beg, msg_end);
        if self.fragment_header.is_none() {
            self.fragment_header = Some(*header);
        }
        let room: usize = BUFSIZ - self.fragment.len();
        let msg_len: usize = msg_end - msg_beg;
        if msg_len > room {
            self.fragment_overflows += 1;
            de_wrn!(
                "fragment buffer full; dropped {} bytes of record sequence {:?}",
                msg_len - room,
                header.sequence
            );
        }
        let take = msg_len.min(room);
        self.fragment
            .extend_from_slice(&self.read_buf[msg_beg..msg_beg + take]);
        self.fragments += 1;
        defo!("fragment now {} bytes", self.fragment.len());
    }

    /// Read physical records until the next logical record is known.
    fn pull(&mut self) -> Result<Next> {
        loop {
            if let Some(saved) = self.saved.take() {
                defo!("replay saved record of {} bytes", saved.len());
                self.read_buf[..saved.len()].copy_from_slice(&saved);
                self.read_len = saved.len();
            } else {
                if self.follow && self.fragment_pending() {
                    match self.device.wait_readable(POLL_TIMEOUT_MS) {
                        Ok(true) => {}
                        Ok(false) => {
                            defo!("no record within {}ms; fragment is complete", POLL_TIMEOUT_MS);
                            return Ok(Next::Fragment);
                        }
                        Err(err) => {
                            self.deferred_err = Some(err);
                            return Ok(Next::Fragment);
                        }
                    }
                }
                match self.device.read_record(&mut self.read_buf) {
                    Ok(0) => {
                        defo!("end of data");
                        return Ok(if self.fragment_pending() { Next::Fragment } else { Next::Done });
                    }
                    Ok(len) => {
                        self.reads += 1;
                        self.read_len = len;
                    }
                    Err(err) => match err.kind() {
                        ErrorKind::WouldBlock => {
                            defo!("would block");
                            return Ok(if self.fragment_pending() { Next::Fragment } else { Next::Done });
                        }
                        // `EPIPE`; the record was overwritten while reading
                        ErrorKind::BrokenPipe | ErrorKind::Interrupted => {
                            self.retries += 1;
                            defo!("read error {}; retry {}", err, self.retries);
                            continue;
                        }
                        _ => {
                            if self.fragment_pending() {
                                defo!("read error {}; return fragment first", err);
                                self.deferred_err = Some(err);
                                return Ok(Next::Fragment);
                            }
                            return Err(err);
                        }
                    },
                }
            }

            let (header, msg_beg, msg_end) = decode_kmsg_header(&self.read_buf[..self.read_len]);
            defo!(
                "physical record {:?} {:?}",
                header,
                buffer_to_String_noraw(&self.read_buf[msg_beg..msg_end])
            );
            match header.flag {
                ContinuationFlag::ContinuationStart | ContinuationFlag::ContinuationMore => {
                    self.append_fragment(&header, msg_beg, msg_end);
                }
                ContinuationFlag::None => {
                    if self.fragment_pending() {
                        self.append_fragment(&header, msg_beg, msg_end);
                        return Ok(Next::Fragment);
                    }
                    let msg_end = self.unescape(msg_beg, msg_end);
                    return Ok(Next::Physical(header, msg_beg, msg_end));
                }
                ContinuationFlag::ForcedFlush => {
                    if self.fragment_pending() {
                        self.saved = Some(self.read_buf[..self.read_len].to_vec());
                        return Ok(Next::Fragment);
                    }
                    let msg_end = self.unescape(msg_beg, msg_end);
                    return Ok(Next::Physical(header, msg_beg, msg_end));
                }
            }
        }
    }
}

impl<D: KmsgDevice> RecordSource for KmsgReader<D> {
    fn next_record(&mut self) -> ResultS3_Record<'_> {
        if self.fragment_returned {
            self.fragment.clear();
            self.fragment_header = None;
            self.fragment_returned = false;
        }
        if let Some(err) = self.deferred_err.take() {
            defñ!("return deferred error {}", err);
            return ResultS3::Err(err);
        }
        match self.pull() {
            Ok(Next::Physical(header, msg_beg, msg_end)) => {
                self.records += 1;
                ResultS3::Found(RawRecord {
                    message: &self.read_buf[msg_beg..msg_end],
                    priority: header.priority,
                    level: header.level,
                    facility: header.facility,
                    timestamp: header.timestamp,
                    sequence: header.sequence,
                    flag: header.flag,
                })
            }
            Ok(Next::Fragment) => {
                let header = self.fragment_header.unwrap_or_default();
                self.fragment_returned = true;
                self.records += 1;
                defñ!("return fragment of {} bytes", self.fragment.len());
                ResultS3::Found(RawRecord {
                    message: &self.fragment,
                    priority: header.priority,
                    level: header.level,
                    facility: header.facility,
                    timestamp: header.timestamp,
                    sequence: header.sequence,
                    flag: header.flag,
                })
            }
            Ok(Next::Done) => ResultS3::Done,
            Err(err) => {
                de_err!("kmsg read error {}", err);
                ResultS3::Err(err)
            }
        }
    }
}
