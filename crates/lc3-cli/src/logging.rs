//! Diagnostic log setup for the `lc3` binary.
//!
//! Guest console output goes to stdout; every log line goes to stderr.

use std::env;
use std::io::{self, Write};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::terminal;

/// Environment variable overriding the level chosen by `-v` / `-q`.
pub const LOG_ENV: &str = "LC3_LOG";

/// Picks the log level from the command line and an optional override.
///
/// An override that does not name a level is ignored.
pub fn level(verbose: u8, quiet: bool, override_level: Option<&str>) -> LevelFilter {
    if let Some(level) = override_level.and_then(|value| value.trim().parse().ok()) {
        return level;
    }
    if quiet {
        return LevelFilter::ERROR;
    }

    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Stderr writer that ends lines with `\r\n` while the terminal is raw.
struct LogWriter;

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut stderr = io::stderr().lock();
        write_lines(&mut stderr, buf, terminal::raw_mode_active())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

fn write_lines(out: &mut impl Write, buf: &[u8], raw: bool) -> io::Result<()> {
    if !raw {
        return out.write_all(buf);
    }

    let mut lines = buf.split(|byte| *byte == b'\n');
    if let Some(first) = lines.next() {
        out.write_all(first)?;
    }
    for line in lines {
        out.write_all(b"\r\n")?;
        out.write_all(line)?;
    }
    Ok(())
}

/// Installs the global stderr subscriber.
pub fn init(verbose: u8, quiet: bool) {
    let override_level = env::var(LOG_ENV).ok();
    let filter = level(verbose, quiet, override_level.as_deref());

    let stderr_format = fmt::layer()
        .with_writer(|| LogWriter)
        .with_target(false)
        .with_filter(filter);

    tracing_subscriber::registry().with(stderr_format).init();
}
