use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::table::TableError;

#[derive(Debug, Error)]
pub enum GradebookError {
    #[error("seed file not found: {}", path.display())]
    SeedUnavailable { path: PathBuf },

    #[error("failed to read seed file {}: {detail}", path.display())]
    SeedMalformed { path: PathBuf, detail: String },

    #[error("no '{token}' columns found for the {report} report")]
    ReportUnavailable { report: &'static str, token: String },

    #[error("stored table payload is invalid: {0}")]
    Payload(String),

    #[error("stored table failed its integrity check (slot {slot})")]
    StoreCorrupt { slot: String },

    #[error("storage error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("storage lock poisoned")]
    LockPoisoned,

    #[error("invalid edit: {0}")]
    InvalidEdit(String),

    #[error("column {0} is read-only")]
    ReadOnlyColumn(String),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl GradebookError {
    /// Error code used on the IPC wire.
    pub fn code(&self) -> &'static str {
        match self {
            GradebookError::SeedUnavailable { .. } => "seed_unavailable",
            GradebookError::SeedMalformed { .. } => "seed_malformed",
            GradebookError::ReportUnavailable { .. } => "report_unavailable",
            GradebookError::Payload(_)
            | GradebookError::StoreCorrupt { .. }
            | GradebookError::Store(_)
            | GradebookError::LockPoisoned => "store_failed",
            GradebookError::InvalidEdit(_) | GradebookError::Table(_) => "bad_params",
            GradebookError::ReadOnlyColumn(_) => "read_only_column",
            GradebookError::Io(_) | GradebookError::Csv(_) => "io_failed",
        }
    }
}

pub type Result<T> = std::result::Result<T, GradebookError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing banner attached to an IPC result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
            detail: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            detail: None,
        }
    }

    /// Seed failures carry their diagnostic detail; "not found" does not.
    pub fn from_error(e: &GradebookError) -> Self {
        let detail = match e {
            GradebookError::SeedUnavailable { .. } | GradebookError::ReportUnavailable { .. } => None,
            GradebookError::SeedMalformed { detail, .. } => Some(detail.clone()),
            other => Some(other.to_string()),
        };
        let level = match e {
            GradebookError::ReportUnavailable { .. } => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        Self {
            level,
            message: e.to_string(),
            detail,
        }
    }
}
