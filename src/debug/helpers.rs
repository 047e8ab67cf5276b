// src/debug/helpers.rs

//! Temporary-file fixtures for tests that exercise the file backend.

use crate::common::FPath;

#[allow(unused_imports)] // XXX: clippy wrongly marks this as unused
use std::io::Write; // for `NamedTempFile.write_all`

use ::lazy_static::lazy_static;
#[allow(unused_imports)]
use ::si_trace_print::{defo, defñ};

#[doc(hidden)]
pub use ::tempfile::NamedTempFile;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// temporary file helper functions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// NamedTempFile instances default to this file name prefix, so stray
/// files left by aborted test runs are easy to find.
pub const STR_TEMPFILE_PREFIX: &str = "tmp-krr-test-";

lazy_static! {
    pub static ref STRING_TEMPFILE_PREFIX: String = String::from(STR_TEMPFILE_PREFIX);
}

/// Copy the `NamedTempFile` path to a `FPath`.
pub fn ntf_fpath(ntf: &NamedTempFile) -> FPath {
    FPath::from(ntf.path().to_string_lossy())
}

/// Write `data` to a new temporary file, e.g. a saved kernel ring buffer.
pub fn create_temp_file_bytes(data: &[u8]) -> NamedTempFile {
    let mut ntf = match ::tempfile::Builder::new()
        .prefix::<str>(&STRING_TEMPFILE_PREFIX)
        .tempfile()
    {
        Ok(val) => val,
        Err(err) => {
            panic!("tempfile::Builder::tempfile() return Err {}", err);
        }
    };
    match ntf.write_all(data) {
        Ok(_) => {}
        Err(err) => {
            panic!("NamedTempFile::write_all() return Err {}", err);
        }
    }
    match ntf.flush() {
        Ok(_) => {}
        Err(err) => {
            panic!("NamedTempFile::flush() return Err {}", err);
        }
    }
    defñ!("created {:?} with {} bytes", ntf.path(), data.len());

    ntf
}
