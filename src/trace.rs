// src/trace.rs

//! Per-invocation diagnostic trace file
//!
//! One append-only text file per conversion invocation, flushed
//! synchronously after every record. [`InvocationTrace::finish`] removes
//! the file again when nothing was written, so silent successes leave no
//! residue in the log directory. This is resource hygiene, not part of
//! the conversion engine's correctness.

use crate::Result;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only trace for one invocation
pub struct InvocationTrace {
    file: Option<File>,
    path: Option<PathBuf>,
    bytes_written: u64,
}

impl InvocationTrace {
    /// Create a timestamped trace file in `log_dir`, creating the
    /// directory as needed
    pub fn create(log_dir: &Path) -> Result<Self> {
        fs::create_dir_all(log_dir)?;
        let path = log_dir.join(format!("{}.txt", Local::now().format("%Y%m%d_%H%M%S")));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            file: Some(file),
            path: Some(path),
            bytes_written: 0,
        })
    }

    /// A trace that records nothing
    pub fn disabled() -> Self {
        Self {
            file: None,
            path: None,
            bytes_written: 0,
        }
    }

    /// Append one timestamped record and flush it. Trace problems never
    /// disturb the conversion; they degrade to a log line.
    pub fn record(&mut self, message: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let line = format!("{} {message}\n", Local::now().format("%Y-%m-%d %H:%M:%S"));
        match file.write_all(line.as_bytes()).and_then(|()| file.flush()) {
            Ok(()) => self.bytes_written += line.len() as u64,
            Err(e) => tracing::warn!("trace write failed: {e}"),
        }
    }

    /// Close the trace; an empty file is deleted
    pub fn finish(mut self) -> Result<()> {
        let file = self.file.take();
        drop(file);
        if self.bytes_written == 0
            && let Some(path) = self.path.take()
        {
            // Best effort; a leftover empty file is harmless
            let _ = fs::remove_file(path);
        }
        Ok(())
    }

    /// Path of the trace file, if tracing is active
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
