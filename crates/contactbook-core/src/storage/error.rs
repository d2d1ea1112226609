//! Storage errors
//!
//! `StorageError` classifies backend failures; `StorageIssue` is the
//! flattened form handed to the UI through store events, with a hint the
//! user can act on.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by key-value backends and contact persistence
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create storage directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied: cannot access '{path}'")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No space left while writing '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Stored value could not be parsed; the raw value was kept under `backup_key`
    #[error("Stored value under '{key}' is corrupted ({details}); a copy was kept under '{backup_key}'")]
    CorruptValue {
        key: String,
        backup_key: String,
        details: String,
    },

    #[error("Invalid storage key: '{0}'")]
    InvalidKey(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The temp file was written but could not replace the entry
    #[error("Could not move '{from}' into place at '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Backend cannot be reached at all
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Classify a failed write
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        if error.kind() == io::ErrorKind::PermissionDenied {
            return StorageError::PermissionDenied {
                path,
                source: error,
            };
        }
        if is_disk_full(&error) {
            return StorageError::DiskFull {
                path,
                source: error,
            };
        }
        StorageError::WriteError {
            path,
            source: error,
        }
    }

    /// Classify a failed read
    pub fn from_read_io(error: io::Error, path: PathBuf) -> Self {
        if error.kind() == io::ErrorKind::PermissionDenied {
            StorageError::PermissionDenied {
                path,
                source: error,
            }
        } else {
            StorageError::ReadError {
                path,
                source: error,
            }
        }
    }

    /// What the user can do about this failure, if anything
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space, then run the command again."),
            StorageError::PermissionDenied { .. } | StorageError::CreateDirectory { .. } => {
                Some("Check permissions on the data directory (see `contactbook config show`).")
            }
            StorageError::ReadError { .. } | StorageError::Unavailable(_) => Some(
                "Existing contacts were left untouched; changes are kept until storage can be read again.",
            ),
            StorageError::CorruptValue { .. } => {
                Some("Entries can be recovered by hand from the backup copy.")
            }
            _ => None,
        }
    }
}

/// Storage failure as reported to the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageIssue {
    pub message: String,
    pub suggestion: Option<&'static str>,
}

impl From<&StorageError> for StorageIssue {
    fn from(error: &StorageError) -> Self {
        Self {
            message: error.to_string(),
            suggestion: error.recovery_suggestion(),
        }
    }
}

impl fmt::Display for StorageIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.suggestion {
            Some(hint) => write!(f, "{}. {}", self.message, hint),
            None => f.write_str(&self.message),
        }
    }
}

fn is_disk_full(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    ["no space left", "disk full", "quota exceeded", "not enough space"]
        .iter()
        .any(|needle| msg.contains(needle))
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_errors_are_classified() {
        let denied = StorageError::from_io(
            io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
            PathBuf::from("/data/contacts.json"),
        );
        assert!(matches!(denied, StorageError::PermissionDenied { .. }));

        let full = StorageError::from_io(
            io::Error::new(io::ErrorKind::Other, "No space left on device"),
            PathBuf::from("/data/contacts.tmp"),
        );
        assert!(matches!(full, StorageError::DiskFull { .. }));

        let other = StorageError::from_io(
            io::Error::new(io::ErrorKind::Other, "bus error"),
            PathBuf::from("/data/contacts.tmp"),
        );
        assert!(matches!(other, StorageError::WriteError { .. }));
    }

    #[test]
    fn test_read_errors_are_classified() {
        let err = StorageError::from_read_io(
            io::Error::new(io::ErrorKind::InvalidData, "bad utf-8"),
            PathBuf::from("/data/contacts.json"),
        );
        assert!(matches!(err, StorageError::ReadError { .. }));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_issue_carries_suggestion() {
        let err = StorageError::DiskFull {
            path: PathBuf::from("/data/contacts.tmp"),
            source: io::Error::new(io::ErrorKind::Other, "No space left on device"),
        };

        let issue = StorageIssue::from(&err);
        assert!(issue.message.contains("/data/contacts.tmp"));
        assert_eq!(issue.suggestion, err.recovery_suggestion());
        assert!(issue.to_string().contains("Free up disk space"));
    }

    #[test]
    fn test_issue_without_suggestion() {
        let issue = StorageIssue::from(&StorageError::InvalidKey("../x".to_string()));
        assert_eq!(issue.suggestion, None);
        assert_eq!(issue.to_string(), "Invalid storage key: '../x'");
    }

    #[test]
    fn test_corrupt_value_display() {
        let err = StorageError::CorruptValue {
            key: "contacts".to_string(),
            backup_key: "contacts.corrupt".to_string(),
            details: "expected value at line 1".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("corrupted"));
        assert!(msg.contains("contacts.corrupt"));
    }
}
