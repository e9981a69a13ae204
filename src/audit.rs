//! Resolution audit log
//!
//! Appends one JSONL entry per resolved utterance for compliance and
//! debugging. Writing never changes a resolution outcome: failures are logged
//! and swallowed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Longest utterance kept in an entry
const MAX_UTTERANCE_CHARS: usize = 500;

/// Entry in the audit log
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub oracle: &'static str,
    pub model: String,
    pub utterance: String,
    /// Function the model called, if any
    pub function_name: Option<String>,
    /// `executable`, `needs_info` or `oracle_failure`
    pub status: &'static str,
    /// Clarification message or failure reason
    pub detail: Option<String>,
    pub duration_ms: u64,
}

impl AuditEntry {
    pub fn new(
        request_id: impl Into<String>,
        oracle: &'static str,
        model: &str,
        utterance: &str,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: request_id.into(),
            oracle,
            model: model.to_string(),
            utterance: truncate(utterance, MAX_UTTERANCE_CHARS),
            function_name: None,
            status: "pending",
            detail: None,
            duration_ms: 0,
        }
    }
}

/// Writer for audit log entries
struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn write(&self, entry: &AuditEntry) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Shared handle to the JSONL audit file
#[derive(Clone)]
pub struct AuditLog {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLog {
    /// Create a new audit log
    ///
    /// # Arguments
    /// * `log_path` - Path to the audit log file (JSONL format)
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter::new(log_path.into()))),
        }
    }

    pub async fn record(&self, entry: &AuditEntry) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(entry) {
            tracing::warn!(
                error = %e,
                path = %writer.path.display(),
                "Failed to write audit log entry"
            );
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}... [truncated]")
    } else {
        s.to_string()
    }
}
