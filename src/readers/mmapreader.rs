// src/readers/mmapreader.rs

//! Implements [`MappedFile`], a read-only memory map of a saved kernel
//! buffer file that gives back pages to the OS as they are consumed.
//!
//! A saved buffer file may be very large. The reader of a `MappedFile` only
//! moves forward, so every page wholly behind the read cursor is unmapped
//! once the cursor is more than one page past the start of the still-mapped
//! window. At most one consumed page stays mapped.
//!
//! [`MappedFile`]: self::MappedFile

use crate::common::{Count, FPath, FileOffset, FileSz};
#[allow(unused_imports)]
use crate::debug::printers::{de_err, de_wrn};

use std::ffi::c_void;
use std::fmt;
use std::fs::File;
use std::io::{Error, ErrorKind, Result};
use std::num::NonZeroUsize;
use std::ptr::NonNull;

#[allow(unused_imports)]
use ::more_asserts::{debug_assert_ge, debug_assert_le, debug_assert_lt};
use ::nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

/// Fallback page size when `sysconf` cannot tell.
pub const PAGESZ_DEFAULT: usize = 4096;

/// The system memory page size.
pub fn pagesize() -> usize {
    // SAFETY: `sysconf` has no preconditions
    let sz = unsafe { ::libc::sysconf(::libc::_SC_PAGESIZE) };
    if sz <= 0 {
        de_wrn!("sysconf(_SC_PAGESIZE) returned {}; use {}", sz, PAGESZ_DEFAULT);
        return PAGESZ_DEFAULT;
    }

    sz as usize
}

/// A read-only `MAP_SHARED` mapping of an entire file, with an explicit
/// window `[window, len)` of bytes that are still mapped.
///
/// Bytes before `window` have been unmapped and must not be requested.
pub struct MappedFile {
    path: FPath,
    /// start of the mapping; `None` for an empty file
    base: Option<NonNull<c_void>>,
    /// length of the file and of the mapping
    len: usize,
    /// offset of the first still-mapped byte, always a multiple of `pagesize`
    window: usize,
    pagesize: usize,
    pages_released: Count,
}

impl fmt::Debug for MappedFile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MappedFile")
            .field("path", &self.path)
            .field("len", &self.len)
            .field("window", &self.window)
            .field("pagesize", &self.pagesize)
            .field("pages_released", &self.pages_released)
            .finish()
    }
}

impl MappedFile {
    /// Open, stat, and map the file at `path`.
    ///
    /// The file handle is closed before returning; the mapping stays valid.
    pub fn open(path: &FPath) -> Result<MappedFile> {
        defn!("({:?})", path);
        let file = match File::open(path) {
            Ok(val) => val,
            Err(err) => {
                defx!("File::open({:?}) error {}", path, err);
                return Err(Error::new(err.kind(), format!("cannot open {}: {}", path, err)));
            }
        };
        let filesz: FileSz = match file.metadata() {
            Ok(val) => val.len(),
            Err(err) => {
                defx!("File::metadata() error {}", err);
                return Err(Error::new(err.kind(), format!("stat of {} failed: {}", path, err)));
            }
        };
        let len: usize = match usize::try_from(filesz) {
            Ok(val) => val,
            Err(_) => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("{} is too large to map ({} bytes)", path, filesz),
                ));
            }
        };
        let pagesize = pagesize();
        let base = match NonZeroUsize::new(len) {
            None => {
                defo!("empty file; nothing to map");
                None
            }
            Some(length) => {
                // SAFETY: a fresh read-only mapping not overlapping any other
                let ptr = unsafe {
                    mmap(None, length, ProtFlags::PROT_READ, MapFlags::MAP_SHARED, &file, 0)
                };
                match ptr {
                    Ok(val) => Some(val),
                    Err(errno) => {
                        defx!("mmap error {}", errno);
                        return Err(Error::new(
                            Error::from(errno).kind(),
                            format!("cannot mmap: {}: {}", path, errno),
                        ));
                    }
                }
            }
        };
        defx!("mapped {} bytes, pagesize {}", len, pagesize);

        Ok(MappedFile {
            path: path.clone(),
            base,
            len,
            window: 0,
            pagesize,
            pages_released: 0,
        })
    }

    pub fn path(&self) -> &FPath {
        &self.path
    }

    /// Length of the file.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn pagesize(&self) -> usize {
        self.pagesize
    }

    /// Offset of the first byte that is still mapped.
    pub const fn window(&self) -> FileOffset {
        self.window as FileOffset
    }

    /// Count of pages unmapped so far.
    pub const fn pages_released(&self) -> Count {
        self.pages_released
    }

    /// Bytes from `offset` to the end of the file.
    ///
    /// `offset` must not be before the mapped window.
    pub fn bytes_from(&self, offset: usize) -> &[u8] {
        debug_assert_ge!(offset, self.window, "offset {} is in an unmapped page", offset);
        debug_assert_le!(offset, self.len, "offset {} is past the end", offset);
        let base = match self.base {
            Some(val) => val,
            None => return &[],
        };
        if offset >= self.len || offset < self.window {
            return &[];
        }
        // SAFETY: `[window, len)` is mapped read-only for the life of `self`,
        // and `offset` is within it
        unsafe {
            std::slice::from_raw_parts(
                base.as_ptr()
                    .cast::<u8>()
                    .add(offset),
                self.len - offset,
            )
        }
    }

    /// Unmap the whole pages behind `cursor` once `cursor` is more than one
    /// page past the window start.
    ///
    /// Returns the count of pages released by this call.
    pub fn release_behind(&mut self, cursor: usize) -> Count {
        let base = match self.base {
            Some(val) => val,
            None => return 0,
        };
        let cursor = cursor.min(self.len);
        if cursor <= self.window || cursor - self.window <= self.pagesize {
            return 0;
        }
        let pages: usize = (cursor - self.window) / self.pagesize;
        let release_len: usize = pages * self.pagesize;
        debug_assert_le!(self.window + release_len, cursor);
        // SAFETY: `window` is page-aligned and `[window, window + release_len)`
        // is mapped and no longer referenced
        let at = unsafe {
            NonNull::new_unchecked(
                base.as_ptr()
                    .cast::<u8>()
                    .add(self.window)
                    .cast::<c_void>(),
            )
        };
        match unsafe { munmap(at, release_len) } {
            Ok(_) => {}
            Err(_errno) => {
                de_err!("munmap({:?}, {}) error {}", at, release_len, _errno);
                return 0;
            }
        }
        self.window += release_len;
        self.pages_released += pages as Count;
        defñ!("released {} pages; window now {}, cursor {}", pages, self.window, cursor);

        pages as Count
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        let base = match self.base.take() {
            Some(val) => val,
            None => return,
        };
        if self.window >= self.len {
            return;
        }
        // SAFETY: the remainder of the mapping; nothing borrows it past drop
        let at = unsafe {
            NonNull::new_unchecked(
                base.as_ptr()
                    .cast::<u8>()
                    .add(self.window)
                    .cast::<c_void>(),
            )
        };
        if let Err(_errno) = unsafe { munmap(at, self.len - self.window) } {
            de_err!("munmap({:?}, {}) error {}", at, self.len - self.window, _errno);
        }
    }
}
