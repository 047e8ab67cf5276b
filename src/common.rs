// src/common.rs

//! Common imports, type aliases, and other globals for _krrlib_
//! (avoids circular imports).

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// file-handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `F`ake `Path` or `F`ile `Path`.
pub type FPath = String;
/// Byte offset into a file or buffer.
pub type FileOffset = u64;
/// Size of a file in bytes.
pub type FileSz = u64;

/// A general-purpose counter.
pub type Count = u64;

/// Owned bytes.
pub type Bytes = Vec<u8>;

/// Newline as a byte.
#[allow(non_upper_case_globals)]
pub const NLu8: u8 = b'\n';

/// Space as a byte.
#[allow(non_upper_case_globals)]
pub const SPu8: u8 = b' ';

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// custom Results enums for the record readers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `Result` extended with a `Done` state, returned by the record readers.
///
/// A reader returns `Found` for each record, then `Done` once the source is
/// exhausted. `Done` is not an error.
#[derive(Debug, PartialEq, Eq)]
pub enum ResultS3<T, E> {
    /// Contains the success data
    Found(T),

    /// Source is exhausted; nothing to return but no errors happened
    Done,

    /// Contains the error value, something bad happened
    Err(E),
}

impl<T, E> ResultS3<T, E> {
    /// Returns `true` if the result is [`Found`].
    ///
    /// [`Found`]: ResultS3::Found
    #[inline(always)]
    pub const fn is_found(&self) -> bool {
        matches!(*self, ResultS3::Found(_))
    }

    /// Returns `true` if the result is [`Done`].
    ///
    /// [`Done`]: ResultS3::Done
    #[inline(always)]
    pub const fn is_done(&self) -> bool {
        matches!(*self, ResultS3::Done)
    }

    /// Returns `true` if the result is [`Err`].
    ///
    /// [`Err`]: ResultS3::Err
    #[inline(always)]
    pub const fn is_err(&self) -> bool {
        matches!(*self, ResultS3::Err(_))
    }

    /// Converts from `ResultS3<T, E>` to [`Option<T>`], discarding the
    /// error, if any.
    #[inline(always)]
    pub fn ok(self) -> Option<T> {
        match self {
            ResultS3::Found(x) => Some(x),
            ResultS3::Done => None,
            ResultS3::Err(_) => None,
        }
    }

    /// Converts from `ResultS3<T, E>` to [`Option<E>`], discarding the
    /// success value, if any.
    #[inline(always)]
    pub fn err(self) -> Option<E> {
        match self {
            ResultS3::Found(_) => None,
            ResultS3::Done => None,
            ResultS3::Err(err) => Some(err),
        }
    }
}

impl<T, E> std::fmt::Display for ResultS3<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultS3::Found(_) => write!(f, "ResultS3::Found"),
            ResultS3::Done => write!(f, "ResultS3::Done"),
            ResultS3::Err(_) => write!(f, "ResultS3::Err"),
        }
    }
}
