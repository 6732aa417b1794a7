//! Log sink owned by the hub. The sink is a shared writer handed to the tracing
//! subscriber; releasing it detaches the destination so later events are discarded.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LogConfig;
use crate::error::ConfigError;

enum Target {
    Stdout,
    Stderr,
    File(File),
}

#[derive(Clone)]
pub struct LogSink {
    target: Arc<Mutex<Option<Target>>>,
}

pub struct LogWriter {
    target: Arc<Mutex<Option<Target>>>,
}

impl LogSink {
    pub fn open(config: &LogConfig) -> Result<LogSink, ConfigError> {
        let target = match config.filename.as_str() {
            "" | "stdout" => Target::Stdout,
            "stderr" => Target::Stderr,
            path => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| ConfigError::LogFile { path: path.to_string(), source })?;
                Target::File(file)
            }
        };
        Ok(LogSink { target: Arc::new(Mutex::new(Some(target))) })
    }

    pub fn stdout() -> LogSink {
        LogSink { target: Arc::new(Mutex::new(Some(Target::Stdout))) }
    }

    fn is_terminal_target(&self) -> bool {
        matches!(*self.target.lock(), Some(Target::Stdout) | Some(Target::Stderr))
    }

    /// Install a global fmt subscriber writing into this sink. Returns false when a
    /// subscriber was already installed; the existing one is kept.
    pub fn install(&self, level: &str) -> bool {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_ansi(self.is_terminal_target())
            .with_writer(self.clone())
            .try_init()
            .is_ok()
    }

    pub fn is_released(&self) -> bool {
        self.target.lock().is_none()
    }

    /// Flush and detach the destination. Safe to call more than once.
    pub fn release(&self) {
        if let Some(mut target) = self.target.lock().take() {
            let _ = write_target(&mut target, None);
        }
    }
}

fn write_target(target: &mut Target, buf: Option<&[u8]>) -> io::Result<usize> {
    match (target, buf) {
        (Target::Stdout, Some(b)) => io::stdout().write(b),
        (Target::Stderr, Some(b)) => io::stderr().write(b),
        (Target::File(f), Some(b)) => f.write(b),
        (Target::Stdout, None) => io::stdout().flush().map(|_| 0),
        (Target::Stderr, None) => io::stderr().flush().map(|_| 0),
        (Target::File(f), None) => f.flush().map(|_| 0),
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.target.lock().as_mut() {
            Some(target) => write_target(target, Some(buf)),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.target.lock().as_mut() {
            Some(target) => write_target(target, None).map(|_| ()),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter { target: self.target.clone() }
    }
}
