use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub const EPERM: i32 = 1;
pub const EINTR: i32 = 4;
pub const EIO: i32 = 5;

#[derive(Debug, Error)]
pub enum BucketError {
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("history store {} is corrupt: {source}", path.display())]
    CorruptHistory {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("history has no entry for key {0}")]
    KeyNotFound(String),
    #[error("index {0} does not exist in history")]
    IndexNotFound(u64),
    #[error("history is empty")]
    EmptyHistory,
    #[error("page {page} is out of range ({pages} page(s) of {count} item(s))")]
    PageOutOfRange { page: usize, count: usize, pages: usize },
    #[error("cannot restore to {}: path already exists", .0.display())]
    OriginExists(PathBuf),
    #[error("cannot restore {0}: origin is unknown")]
    OriginUnknown(String),
    #[error("refusing to remove {}: it overlaps the bucket or its history", .0.display())]
    InsideBucket(PathBuf),
    #[error("bucket is full: {required} bytes required, limit is {max_size} bytes")]
    BucketFull { required: u64, max_size: u64 },
    #[error("invalid pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

impl BucketError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn walk(action: &'static str, path: impl Into<PathBuf>, err: walkdir::Error) -> Self {
        let path = err
            .path()
            .map(PathBuf::from)
            .unwrap_or_else(|| path.into());
        let source = err
            .into_io_error()
            .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
        Self::Io {
            action,
            path,
            source,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io { source, .. } => source.raw_os_error().unwrap_or(EIO),
            Self::CorruptHistory { .. } => EIO,
            _ => EPERM,
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid value for `{field}`: expected {expected}, found {found}")]
pub struct ValidationError {
    pub field: String,
    pub expected: &'static str,
    pub found: String,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write settings {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl SettingsError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Read { source, .. } | Self::Write { source, .. } => {
                source.raw_os_error().unwrap_or(EIO)
            }
            Self::Parse { .. } | Self::Validation(_) => EPERM,
        }
    }
}

/// A command ran to the end but some of its targets failed.
#[derive(Debug, Error)]
#[error("{command} finished with {count} issue(s)")]
pub struct IssuesReported {
    pub command: String,
    pub count: usize,
    /// Exit status of the first failure.
    pub code: i32,
}

/// Map the root cause of a command failure to a process exit status.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(reported) = cause.downcast_ref::<IssuesReported>() {
            return reported.code;
        }
        if let Some(bucket) = cause.downcast_ref::<BucketError>() {
            return bucket.exit_code();
        }
        if let Some(settings) = cause.downcast_ref::<SettingsError>() {
            return settings.exit_code();
        }
        if cause.is::<ValidationError>() {
            return EPERM;
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::Interrupted {
                return EINTR;
            }
            return io_err.raw_os_error().unwrap_or(EIO);
        }
    }
    EPERM
}
