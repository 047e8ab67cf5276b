// src/readers/syslogbuffer.rs

//! Read the kernel ring buffer through `syslog(2)` (`klogctl(3)`).
//!
//! The buffer size is not known in advance on every kernel. Without a size,
//! reading starts with [`SYSLOG_BUFSIZE_DEFAULT`] bytes and the buffer is
//! quadrupled for as long as a read fills it completely, up to
//! [`SYSLOG_BUFSIZE_MAX`].

use crate::common::Bytes;
#[allow(unused_imports)]
use crate::debug::printers::{de_err, de_wrn};

use std::fmt;
use std::io::{Error, Result};

#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

/// Read all messages remaining in the ring buffer.
pub const SYSLOG_ACTION_READ_ALL: i32 = 3;
/// Read and clear all messages remaining in the ring buffer.
pub const SYSLOG_ACTION_READ_CLEAR: i32 = 4;
/// Clear the ring buffer.
pub const SYSLOG_ACTION_CLEAR: i32 = 5;
/// Return the size of the ring buffer.
pub const SYSLOG_ACTION_SIZE_BUFFER: i32 = 10;

/// First read size when the buffer size is unknown.
pub const SYSLOG_BUFSIZE_DEFAULT: usize = 16392;
/// Stop growing the read size once past this.
pub const SYSLOG_BUFSIZE_MAX: usize = 1 << 28;
/// Extra bytes added to a known buffer size.
pub const SYSLOG_BUFSIZE_PAD: usize = 8;

/// Read the ring buffer, or read it and then clear it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReadAction {
    #[default]
    ReadAll,
    ReadClear,
}

impl ReadAction {
    pub const fn action(&self) -> i32 {
        match self {
            ReadAction::ReadAll => SYSLOG_ACTION_READ_ALL,
            ReadAction::ReadClear => SYSLOG_ACTION_READ_CLEAR,
        }
    }
}

impl fmt::Display for ReadAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReadAction::ReadAll => write!(f, "read-all"),
            ReadAction::ReadClear => write!(f, "read-clear"),
        }
    }
}

/// The `klogctl` call, so that the buffer growth can be driven without a
/// kernel.
pub trait KlogCtl {
    /// Perform `action` with `buf`. Returns the count of bytes written to
    /// `buf`, or for [`SYSLOG_ACTION_SIZE_BUFFER`] the buffer size.
    fn klogctl(&mut self, action: i32, buf: &mut [u8]) -> Result<usize>;
}

/// `klogctl(3)` of the running kernel.
#[derive(Clone, Copy, Debug, Default)]
pub struct Klogctl;

impl KlogCtl for Klogctl {
    fn klogctl(&mut self, action: i32, buf: &mut [u8]) -> Result<usize> {
        let len: ::libc::c_int = buf
            .len()
            .try_into()
            .unwrap_or(::libc::c_int::MAX);
        // SAFETY: the kernel writes at most `len` bytes into `buf`
        let rc = unsafe { ::libc::klogctl(action, buf.as_mut_ptr().cast::<::libc::c_char>(), len) };
        if rc < 0 {
            return Err(Error::last_os_error());
        }

        Ok(rc as usize)
    }
}

/// Query the ring buffer size. `None` if the query fails or says `0`.
pub fn syslog_buffer_size<K: KlogCtl>(ctl: &mut K) -> Option<usize> {
    match ctl.klogctl(SYSLOG_ACTION_SIZE_BUFFER, &mut []) {
        Ok(0) => None,
        Ok(val) => Some(val),
        Err(_err) => {
            defñ!("SYSLOG_ACTION_SIZE_BUFFER error {}", _err);
            None
        }
    }
}

/// Read the ring buffer.
///
/// With `bufsize`, read once into `bufsize + 8` bytes using `action`.
/// Otherwise read all with a growing buffer, then if `action` is
/// [`ReadAction::ReadClear`] read again with clearing.
///
/// The returned bytes are truncated to the length read.
pub fn read_syslog_buffer<K: KlogCtl>(
    ctl: &mut K,
    action: ReadAction,
    bufsize: Option<usize>,
) -> Result<Bytes> {
    defn!("({:?}, {:?})", action, bufsize);
    let mut buf: Bytes;
    let read: usize;
    match bufsize {
        Some(bufsize) if bufsize > 0 => {
            buf = vec![0; bufsize + SYSLOG_BUFSIZE_PAD];
            read = match ctl.klogctl(action.action(), &mut buf) {
                Ok(val) => val,
                Err(err) => {
                    defx!("klogctl({}) error {}", action, err);
                    return Err(err);
                }
            };
        }
        _ => {
            let mut sz: usize = SYSLOG_BUFSIZE_DEFAULT;
            let read_all: usize = loop {
                buf = vec![0; sz];
                let rc = match ctl.klogctl(SYSLOG_ACTION_READ_ALL, &mut buf) {
                    Ok(val) => val,
                    Err(err) => {
                        defx!("klogctl(READ_ALL, {}) error {}", sz, err);
                        return Err(err);
                    }
                };
                if rc != sz || sz > SYSLOG_BUFSIZE_MAX {
                    defo!("read {} of {}; stop growing", rc, sz);
                    break rc;
                }
                defo!("read filled {} bytes; grow", sz);
                sz *= 4;
            };
            read = match action {
                ReadAction::ReadClear if read_all > 0 => {
                    match ctl.klogctl(SYSLOG_ACTION_READ_CLEAR, &mut buf) {
                        Ok(val) => val,
                        Err(err) => {
                            defx!("klogctl(READ_CLEAR) error {}", err);
                            return Err(err);
                        }
                    }
                }
                _ => read_all,
            };
        }
    }
    buf.truncate(read);
    defx!("return {} bytes", buf.len());

    Ok(buf)
}

/// Clear the ring buffer.
pub fn clear_syslog_buffer<K: KlogCtl>(ctl: &mut K) -> Result<()> {
    defñ!();
    ctl.klogctl(SYSLOG_ACTION_CLEAR, &mut [])?;

    Ok(())
}
