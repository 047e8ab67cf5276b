// src/debug/printers.rs

//! Diagnostic printing macros, and helpers that make raw kernel record
//! bytes legible in trace output.

#[doc(hidden)]
#[allow(unused_imports)]
use ::utf8_iter::Utf8CharsEx; // provides `.chars()` on `&[u8]`

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `d`ebug `e`println! an `err`or
#[macro_export]
macro_rules! de_err {
    (
        $($args:tt)*
    ) => {
        {
            #[cfg(any(debug_assertions,test))]
            eprint!("ERROR: ");
            #[cfg(any(debug_assertions,test))]
            eprintln!($($args)*)
        }
    }
}
pub use de_err;

/// `d`ebug `e`println! a `w`a`rn`ing
#[macro_export]
macro_rules! de_wrn {
    (
        $($args:tt)*
    ) => {
        {
            #[cfg(any(debug_assertions,test))]
            eprint!("WARNING: ");
            #[cfg(any(debug_assertions,test))]
            eprintln!($($args)*)
        }
    }
}
pub use de_wrn;

/// `e`println! an `err`or
#[macro_export]
macro_rules! e_err {
    (
        $($args:tt)*
    ) => {
        {
            eprint!("ERROR: ");
            eprintln!($($args)*)
        }
    }
}
pub use e_err;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// helper functions for tracing record bytes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Unicode block "Control Pictures" begins at U+2400 with `␀`.
#[cfg(any(debug_assertions, test))]
const CONTROL_PICTURES: u32 = 0x2400;

/// Map a C0 control character (and DEL) to its pictoral form from the
/// Unicode "Control Pictures" block, e.g. `'\n'` becomes `'␊'`.
/// Any other `char` is returned unchanged.
///
/// Keeps the printed width of control characters at one column so traced
/// kernel records line up.
#[cfg(any(debug_assertions, test))]
pub fn char_to_char_noraw(c: char) -> char {
    match c as u32 {
        n @ 0..=0x1F => char::from_u32(CONTROL_PICTURES + n).unwrap_or(c),
        0x7F => '␡',
        _ => c,
    }
}

/// Transform a buffer of (presumably) UTF-8 bytes to a non-raw `String`.
/// Invalid UTF-8 sequences become `U+FFFD`.
///
/// only intended for debugging
#[doc(hidden)]
#[allow(non_snake_case)]
#[cfg(any(debug_assertions, test))]
pub fn buffer_to_String_noraw(buffer: &[u8]) -> String {
    buffer
        .chars()
        .map(char_to_char_noraw)
        .collect()
}
