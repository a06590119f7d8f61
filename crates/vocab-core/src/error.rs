//! Error taxonomy for the data layer

use std::path::PathBuf;

use thiserror::Error;

/// Result type for data-layer operations
pub type Result<T> = std::result::Result<T, VocabError>;

#[derive(Error, Debug)]
pub enum VocabError {
    /// A required key is empty or missing. Raised before any mutation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The payload has the wrong overall shape (e.g. not a sequence).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The payload was well-formed but no usable record survived filtering.
    #[error("no usable records ({skipped} skipped)")]
    UnprocessableInput { skipped: usize },

    /// The referenced word or article does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Settings file or environment value could not be used.
    #[error("configuration error: {0}")]
    Config(String),

    /// Records could not be rendered in an export format.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A backing file could not be read or written.
    #[error("storage failure at {}: {source}", path.display())]
    StorageFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl VocabError {
    pub fn storage(path: impl Into<PathBuf>, source: impl Into<std::io::Error>) -> Self {
        VocabError::StorageFailure {
            path: path.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_mentions_path() {
        let err = VocabError::storage(
            "data/words.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("data/words.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_unprocessable_reports_skipped() {
        let err = VocabError::UnprocessableInput { skipped: 3 };
        assert_eq!(err.to_string(), "no usable records (3 skipped)");
    }
}
