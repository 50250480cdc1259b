//! Per-invocation logging
//!
//! `env_logger` is initialised once with a writer that sends every record to
//! stderr and, after [`SessionLog::attach`], also appends it to the sample's
//! log file.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Handle to the log file of the current run
#[derive(Clone, Default)]
pub struct SessionLog {
    file: Arc<Mutex<Option<File>>>,
}

impl SessionLog {
    /// Install the global logger and return the session handle
    pub fn init(verbose: bool) -> Result<Self> {
        let session = SessionLog::default();
        let log_level = if verbose { "debug" } else { "info" };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .format(|buf, record| writeln!(buf, "{}", record.args()))
            .target(env_logger::Target::Pipe(Box::new(session.writer())))
            .try_init()
            .context("Failed to initialise logging")?;

        Ok(session)
    }

    /// Start appending log records to `path`
    pub fn attach(&self, path: &Path) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        let mut slot = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("log file lock poisoned"))?;
        *slot = Some(file);
        Ok(())
    }

    /// Stop writing to the log file
    pub fn detach(&self) {
        if let Ok(mut slot) = self.file.lock() {
            if let Some(mut file) = slot.take() {
                let _ = file.flush();
            }
        }
    }

    pub fn writer(&self) -> SessionWriter<io::Stderr> {
        self.writer_to(io::stderr())
    }

    /// Writer that mirrors the session to `console` instead of stderr
    pub fn writer_to<W: Write>(&self, console: W) -> SessionWriter<W> {
        SessionWriter {
            session: self.clone(),
            console,
        }
    }
}

/// `Write` half of the session: a console sink plus the attached file
pub struct SessionWriter<W: Write> {
    session: SessionLog,
    console: W,
}

impl<W: Write> Write for SessionWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.console.write_all(buf)?;
        let mut slot = self
            .session
            .file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        if let Some(file) = slot.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.console.flush()?;
        if let Ok(mut slot) = self.session.file.lock() {
            if let Some(file) = slot.as_mut() {
                file.flush()?;
            }
        }
        Ok(())
    }
}
