//! Append-only log of backend replies that could not be parsed.
//!
//! Each record looks like:
//!
//! ```text
//! ---
//! timestamp: 2026-01-01T00:00:00.000000Z
//! subject: math grade: 3 locale: en
//! message: <original message>
//! raw_reply:
//! <sanitized backend text>
//! ```

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

use lightschool_core::TutorRequest;

/// Diagnostic sink for unparsable backend replies.
///
/// Writes are serialized so concurrent records never interleave. Failures
/// are logged and swallowed; recording never affects a reply. Appends run
/// through [`RawReplyLog::spawn_record`] so file I/O stays off the executor.
#[derive(Debug)]
pub struct RawReplyLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RawReplyLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record on the blocking thread pool. The parent directory
    /// is created on demand.
    ///
    /// Must be called inside a Tokio runtime. The handle only needs awaiting
    /// when the caller has to observe the write.
    pub fn spawn_record(
        self: &Arc<Self>,
        request: &TutorRequest,
        sanitized_reply: &str,
    ) -> JoinHandle<()> {
        let log = Arc::clone(self);
        let entry = format_record(Utc::now(), request, sanitized_reply);
        tokio::task::spawn_blocking(move || log.write_entry(&entry))
    }

    fn write_entry(&self, entry: &str) {
        if let Err(e) = self.append(entry) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write raw reply log");
        }
    }

    fn append(&self, entry: &str) -> io::Result<()> {
        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())
    }
}

fn format_record(timestamp: DateTime<Utc>, request: &TutorRequest, sanitized_reply: &str) -> String {
    format!(
        "---\ntimestamp: {}\nsubject: {} grade: {} locale: {}\nmessage: {}\nraw_reply:\n{}\n",
        timestamp.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
        request.subject,
        request.grade,
        request.locale,
        request.message,
        sanitized_reply
    )
}

/// Wait until `path` holds at least `count` records and return its contents.
#[cfg(test)]
pub(crate) async fn read_records(path: &Path, count: usize) -> String {
    for _ in 0..200 {
        if let Ok(contents) = fs::read_to_string(path) {
            if contents.matches("---\n").count() >= count {
                return contents;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("{} never reached {} records", path.display(), count);
}
