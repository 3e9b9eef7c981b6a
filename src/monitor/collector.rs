//! In-process error buffer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Kind of runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// A recoverable failure reported by the application.
    Error,
    /// A panic caught by the panic hook.
    Panic,
}

/// A single observed runtime error.
///
/// Field names on the wire match what the error sink already stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colno: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            filename: None,
            lineno: None,
            colno: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a source location.
    pub fn at(mut self, filename: &str, line: u32, column: u32) -> Self {
        self.filename = Some(filename.to_string());
        self.lineno = Some(line);
        self.colno = Some(column);
        self
    }
}

/// Shared, append-only buffer of error records.
///
/// Cloning yields a handle to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct ErrorCollector {
    records: Arc<Mutex<Vec<ErrorRecord>>>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record to the buffer.
    pub fn append(&self, record: ErrorRecord) {
        debug!("Recorded {:?}: {}", record.kind, record.message);
        self.lock().push(record);
    }

    /// Shorthand for appending an [`ErrorKind::Error`] record.
    pub fn record_error(&self, message: impl Into<String>) {
        self.append(ErrorRecord::new(ErrorKind::Error, message));
    }

    /// Remove and return everything buffered so far, oldest first.
    pub fn drain(&self) -> Vec<ErrorRecord> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Record every panic in this collector, then defer to the previous hook.
    pub fn install_panic_hook(&self) {
        let collector = self.clone();
        let previous = std::panic::take_hook();

        std::panic::set_hook(Box::new(move |info| {
            let mut record = ErrorRecord::new(ErrorKind::Panic, panic_message(info.payload()));
            if let Some(location) = info.location() {
                record = record.at(location.file(), location.line(), location.column());
            }
            collector.append(record);
            previous(info);
        }));
    }

    // A panic elsewhere must not disable error collection.
    fn lock(&self) -> MutexGuard<'_, Vec<ErrorRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
