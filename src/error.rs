// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Every failure the consolidation run can produce.
///
/// `Format`, `NotFound` and `Read` are scoped to a single input file: the
/// pipeline logs them, skips the file and keeps going. Everything else aborts
/// the run once the store has been torn down.
#[derive(Error, Debug)]
pub enum EtlError {
    /// A header or value does not follow the dimension/measure convention,
    /// or the file cannot be parsed by its reader.
    #[error("invalid data format in {file}: {reason}")]
    Format { file: String, reason: String },

    /// The input file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The input file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The transient store could not be opened.
    #[error("store unavailable at {}: {reason}", path.display())]
    Store { path: PathBuf, reason: String },

    /// The store rejected a relation or an insert.
    #[error("failed to load `{table}`: {reason}")]
    Load { table: String, reason: String },

    /// Building or executing a report query failed.
    #[error("query failed: {0}")]
    Query(String),

    /// A report destination could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dimension index was queried before any source was loaded.
    #[error("no dimension count recorded yet")]
    EmptyIndex,
}

impl EtlError {
    pub fn format(file: impl Into<String>, reason: impl Into<String>) -> Self {
        EtlError::Format {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// True for failures that only invalidate the current input file.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EtlError::Format { .. } | EtlError::NotFound(_) | EtlError::Read { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_file_errors_are_recoverable() {
        assert!(EtlError::format("a.csv", "bad header").is_recoverable());
        assert!(EtlError::NotFound(PathBuf::from("missing.csv")).is_recoverable());
        assert!(!EtlError::Query("boom".into()).is_recoverable());
        assert!(!EtlError::EmptyIndex.is_recoverable());
        assert!(!EtlError::Load {
            table: "t".into(),
            reason: "exists".into()
        }
        .is_recoverable());
    }

    #[test]
    fn messages_name_the_file() {
        let msg = EtlError::NotFound(PathBuf::from("data/x.json")).to_string();
        assert_eq!(msg, "file not found: data/x.json");
    }
}
