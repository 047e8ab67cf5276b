// src/lib.rs

//! _krrlib_ reads the kernel ring buffer.
//!
//! Records are acquired from `/dev/kmsg`, from the `syslog(2)` buffer, or
//! from a saved buffer file. They are decoded, reassembled when the kernel
//! wrote them in fragments, filtered by severity and time, and optionally
//! printed.
//!
//! The quickest use is [`scan_kernel_log`].
//!
//! [`scan_kernel_log`]: crate::readers::session::scan_kernel_log

pub mod common;
pub mod data;
pub mod debug;
pub mod printer;
pub mod readers;
#[cfg(test)]
pub mod tests;
