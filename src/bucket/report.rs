//! Reporting capability handed to the history ledger and the bucket engine.
//!
//! Every event goes to `tracing`; when an audit log is configured it is also
//! appended there as one JSON object per line.

use crate::bucket::util::now_epoch_secs;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub at_epoch_secs: u64,
    pub action: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Done,
    DryRun,
    Skipped,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::DryRun => "dry-run",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Reporter {
    audit_log: Option<PathBuf>,
}

impl Reporter {
    /// Reporter that only emits `tracing` events.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audit_log(path: impl Into<PathBuf>) -> Self {
        Self {
            audit_log: Some(path.into()),
        }
    }

    pub fn audit_log(&self) -> Option<&Path> {
        self.audit_log.as_deref()
    }

    pub fn event(&self, action: &str, status: EventStatus, message: &str) {
        match status {
            EventStatus::Skipped => tracing::warn!(action, status = status.as_str(), "{message}"),
            _ => tracing::info!(action, status = status.as_str(), "{message}"),
        }

        let Some(path) = &self.audit_log else {
            return;
        };
        if let Err(err) = append_event(path, action, status, message) {
            tracing::warn!(path = %path.display(), "audit log write failed: {err:#}");
        }
    }

    pub fn dry_run_or_done(&self, action: &str, dry_run: bool, message: &str) {
        let status = if dry_run {
            EventStatus::DryRun
        } else {
            EventStatus::Done
        };
        self.event(action, status, message);
    }
}

fn append_event(path: &Path, action: &str, status: EventStatus, message: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let event = AuditEvent {
        at_epoch_secs: now_epoch_secs(),
        action: action.to_string(),
        status: status.as_str().to_string(),
        message: message.to_string(),
    };

    let line = format!("{}\n", serde_json::to_string(&event)?);
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())?;
    Ok(())
}
