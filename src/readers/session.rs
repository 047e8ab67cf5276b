// src/readers/session.rs

//! A [`Session`] selects a [`Backend`], drives it with [`scan`], and
//! filters and prints the records.
//!
//! Backend selection
//!
//! * [`BackendKind::Kmsg`] opens `/dev/kmsg`. If the device cannot be
//!   opened or its first read fails, the session falls back to the
//!   `syslog(2)` buffer.
//! * [`BackendKind::Syslog`] takes one snapshot of the `syslog(2)` buffer.
//! * [`BackendKind::File`] memory-maps a saved buffer file.
//!
//! [`Session`]: self::Session
//! [`Backend`]: self::Backend
//! [`scan`]: self::scan
//! [`BackendKind::Kmsg`]: crate::readers::config::BackendKind
//! [`BackendKind::Syslog`]: crate::readers::config::BackendKind
//! [`BackendKind::File`]: crate::readers::config::BackendKind

use crate::common::{Count, FPath, ResultS3};
use crate::data::datetime::{boot_time, BootTime, TimeFormat};
use crate::data::record::{Level, RawRecord};
use crate::data::timestamp::Timestamp;
#[allow(unused_imports)]
use crate::debug::printers::{de_err, de_wrn};
use crate::printer::printers::{NoColor, RecordPrinter, WriteColor};
use crate::readers::config::{BackendKind, SessionConfig};
use crate::readers::error::{Result, ScanError};
use crate::readers::kmsgreader::{DevKmsg, KmsgDevice, KmsgReader};
use crate::readers::legacyreader::{LegacyReader, RecordBuffer};
use crate::readers::mmapreader::MappedFile;
use crate::readers::syslogbuffer::{
    clear_syslog_buffer,
    read_syslog_buffer,
    syslog_buffer_size,
    KlogCtl,
    Klogctl,
    ReadAction,
};
use crate::readers::{RecordSource, ResultS3_Record};

use std::io::{ErrorKind, Sink};

#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The one active source of records of a [`Session`].
#[derive(Debug)]
pub enum Backend<D: KmsgDevice = DevKmsg> {
    Kmsg(KmsgReader<D>),
    Syslog(LegacyReader),
    File(LegacyReader),
}

impl<D: KmsgDevice> Backend<D> {
    pub const fn name(&self) -> &'static str {
        match self {
            Backend::Kmsg(_) => "kmsg",
            Backend::Syslog(_) => "syslog",
            Backend::File(_) => "file",
        }
    }

    /// Count of records returned by the backend, before filtering.
    pub fn count_records(&self) -> Count {
        match self {
            Backend::Kmsg(reader) => reader.count_records(),
            Backend::Syslog(reader) | Backend::File(reader) => reader.count_records(),
        }
    }
}

impl<D: KmsgDevice> RecordSource for Backend<D> {
    fn next_record(&mut self) -> ResultS3_Record<'_> {
        match self {
            Backend::Kmsg(reader) => reader.next_record(),
            Backend::Syslog(reader) | Backend::File(reader) => reader.next_record(),
        }
    }
}

/// Snapshot the `syslog(2)` buffer into a [`LegacyReader`].
///
/// Without `bufsize`, the kernel is asked for its buffer size.
pub fn open_syslog<K: KlogCtl>(
    ctl: &mut K,
    action: ReadAction,
    bufsize: Option<usize>,
) -> Result<LegacyReader> {
    defn!("({:?}, {:?})", action, bufsize);
    let bufsize = bufsize.or_else(|| syslog_buffer_size(ctl));
    let bytes = match read_syslog_buffer(ctl, action, bufsize) {
        Ok(val) => val,
        Err(err) => {
            defx!("read_syslog_buffer error {}", err);
            return Err(ScanError::acquire("syslog", err));
        }
    };
    defx!("{} bytes", bytes.len());

    Ok(LegacyReader::new(RecordBuffer::Owned(bytes)))
}

/// Map a saved buffer file into a [`LegacyReader`].
pub fn open_file(path: &FPath) -> Result<LegacyReader> {
    defñ!("({:?})", path);
    match MappedFile::open(path) {
        Ok(mapped) => Ok(LegacyReader::new(RecordBuffer::Mapped(mapped))),
        Err(err) => Err(ScanError::acquire("file", err)),
    }
}

/// Open the kmsg device with `open_device` and do the first read. `None`
/// if either fails.
fn open_kmsg<D, F>(open_device: F, follow: bool) -> Option<KmsgReader<D>>
where
    D: KmsgDevice,
    F: FnOnce(bool) -> std::io::Result<D>,
{
    let device = match open_device(follow) {
        Ok(val) => val,
        Err(_err) => {
            defñ!("kmsg device open error {}", _err);
            return None;
        }
    };
    match KmsgReader::open(device, follow) {
        Ok(reader) => Some(reader),
        Err(_err) => {
            defñ!("KmsgReader::open error {}", _err);
            None
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// filter and scan
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which records a scan counts and prints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// accept a level at or below this
    pub min_severity: Level,
    /// accept a timestamp after this
    pub since: Timestamp,
}

impl RecordFilter {
    pub const fn new(min_severity: Level, since: Timestamp) -> RecordFilter {
        RecordFilter { min_severity, since }
    }

    /// A record without a level or timestamp is never accepted.
    pub fn accept(&self, record: &RawRecord) -> bool {
        match (record.level, record.timestamp) {
            (Some(level), Some(ts)) => level <= self.min_severity && ts > self.since,
            _ => false,
        }
    }
}

/// Pull every record of `source`; count those accepted by `filter` and
/// print them with `printer`.
///
/// A read error from `source` ends the scan. A closed output pipe ends the
/// scan quietly. Returns the count of accepted records.
pub fn scan<S, W>(
    source: &mut S,
    filter: &RecordFilter,
    mut printer: Option<&mut RecordPrinter<W>>,
) -> Result<Count>
where
    S: RecordSource + ?Sized,
    W: WriteColor,
{
    defn!("{:?}, print {}", filter, printer.is_some());
    let mut count: Count = 0;
    loop {
        let record: RawRecord = match source.next_record() {
            ResultS3::Found(record) => record,
            ResultS3::Done => break,
            ResultS3::Err(_err) => {
                defo!("read error {}; end of scan", _err);
                break;
            }
        };
        if !filter.accept(&record) {
            continue;
        }
        count += 1;
        let printer = match printer.as_mut() {
            Some(printer) => printer,
            None => continue,
        };
        match printer.print_record(&record) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                defx!("broken pipe; return {}", count);
                return Ok(count);
            }
            Err(err) => {
                defx!("print error {}", err);
                return Err(ScanError::Write(err));
            }
        }
    }
    if let Some(printer) = printer {
        match printer.flush() {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {}
            Err(err) => {
                defx!("flush error {}", err);
                return Err(ScanError::Write(err));
            }
        }
    }
    defx!("return {}", count);

    Ok(count)
}

/// [`scan`] without printing.
pub fn scan_quiet<S>(source: &mut S, filter: &RecordFilter) -> Result<Count>
where
    S: RecordSource + ?Sized,
{
    scan::<S, NoColor<Sink>>(source, filter, None)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One read of the kernel log.
///
/// `D` is the kmsg device and `K` the `klogctl` used to read or clear the
/// `syslog(2)` buffer.
#[derive(Debug)]
pub struct Session<D: KmsgDevice = DevKmsg, K: KlogCtl = Klogctl> {
    config: SessionConfig,
    backend: Backend<D>,
    ctl: K,
    /// `None` if not needed or not known
    boot: Option<BootTime>,
    /// the configured time format, after downgrade for an unknown boot time
    time_format: TimeFormat,
    filter: RecordFilter,
    /// accepted records over all scans
    matched: Count,
}

impl Session {
    /// Validate `config` and open its backend on the running kernel.
    pub fn open(config: SessionConfig) -> Result<Session> {
        Session::open_with(config, Klogctl, DevKmsg::open)
    }

    /// A `Session` over an already opened `backend`. `config` is not
    /// validated.
    pub fn from_backend(config: SessionConfig, backend: Backend) -> Session {
        Session::with_ctl(config, backend, Klogctl)
    }
}

impl<D: KmsgDevice, K: KlogCtl> Session<D, K> {
    /// Validate `config` and open its backend, reading the `syslog(2)`
    /// buffer with `ctl` and opening the kmsg device with `open_device`.
    pub fn open_with<F>(config: SessionConfig, mut ctl: K, open_device: F) -> Result<Session<D, K>>
    where
        F: FnOnce(bool) -> std::io::Result<D>,
    {
        defn!("{:?}", config);
        if let Err(err) = config.validate() {
            defx!("invalid config {}", err);
            return Err(ScanError::Config(err));
        }
        let backend: Backend<D> = match &config.backend {
            BackendKind::Kmsg => match open_kmsg(open_device, config.follow) {
                Some(reader) => Backend::Kmsg(reader),
                None => {
                    defo!("kmsg not usable; fall back to syslog");
                    Backend::Syslog(open_syslog(&mut ctl, config.action, config.bufsize)?)
                }
            },
            BackendKind::Syslog => Backend::Syslog(open_syslog(&mut ctl, config.action, config.bufsize)?),
            BackendKind::File(path) => Backend::File(open_file(path)?),
        };
        defx!("backend {}", backend.name());

        Ok(Session::with_ctl(config, backend, ctl))
    }

    /// A `Session` over an already opened `backend`, clearing the kernel
    /// buffer with `ctl`. `config` is not validated.
    pub fn with_ctl(config: SessionConfig, backend: Backend<D>, ctl: K) -> Session<D, K> {
        let boot: Option<BootTime> = match config.render && config.time_format.needs_boot_time() {
            true => boot_time(),
            false => None,
        };
        let time_format = config.time_format.resolve(boot.as_ref());
        if time_format != config.time_format {
            defñ!("no boot time; time format {} downgraded to {}", config.time_format, time_format);
        }
        let filter = RecordFilter::new(config.min_severity, config.since);

        Session {
            config,
            backend,
            ctl,
            boot,
            time_format,
            filter,
            matched: 0,
        }
    }

    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub const fn backend(&self) -> &Backend<D> {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut Backend<D> {
        &mut self.backend
    }

    pub const fn ctl(&self) -> &K {
        &self.ctl
    }

    pub const fn time_format(&self) -> TimeFormat {
        self.time_format
    }

    pub const fn boot(&self) -> Option<&BootTime> {
        self.boot.as_ref()
    }

    pub const fn filter(&self) -> &RecordFilter {
        &self.filter
    }

    /// Accepted records over all scans of this `Session`.
    pub const fn count_matched(&self) -> Count {
        self.matched
    }

    /// A [`RecordPrinter`] writing to `out`, using this session's output
    /// settings.
    pub fn printer<W: WriteColor>(&self, out: W, do_color: bool) -> RecordPrinter<W> {
        RecordPrinter::new(
            out,
            self.config.output_mode,
            self.time_format,
            self.boot,
            self.config.tz,
            do_color,
        )
    }

    /// Scan the backend, printing to stdout if the config says to render.
    pub fn scan(&mut self) -> Result<Count> {
        if !self.config.render {
            return self.scan_to::<NoColor<Sink>>(None);
        }
        let mut printer = RecordPrinter::stdout(
            self.config.color,
            self.config.output_mode,
            self.time_format,
            self.boot,
            self.config.tz,
        );

        self.scan_to(Some(&mut printer))
    }

    /// Scan the backend, printing with `printer`.
    ///
    /// A read-and-clear session over `/dev/kmsg` clears the kernel buffer
    /// after a successful scan.
    pub fn scan_to<W: WriteColor>(&mut self, printer: Option<&mut RecordPrinter<W>>) -> Result<Count> {
        defn!("backend {}", self.backend.name());
        let count = scan(&mut self.backend, &self.filter, printer)?;
        self.matched += count;
        if matches!(self.backend, Backend::Kmsg(_)) && self.config.action == ReadAction::ReadClear {
            if let Err(err) = clear_syslog_buffer(&mut self.ctl) {
                de_wrn!("clear of kernel buffer failed: {}", err);
            }
        }
        defx!("return {}", count);

        Ok(count)
    }
}

/// Read the kernel log with default settings, count the records at
/// `min_severity` or more severe and after `since`, and print them to stdout
/// if `render`.
pub fn scan_kernel_log(min_severity: u8, since: Timestamp, render: bool) -> Result<Count> {
    let config = SessionConfig::new(min_severity, since, render);
    let mut session = Session::open(config)?;

    session.scan()
}
