use thiserror::Error;

/// Errors raised while applying a scroll sample to a book's progress.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("chapter index {index} is out of range for a book with {len} chapters")]
    ChapterOutOfRange { index: usize, len: usize },

    #[error("invalid persisted progress: {0}")]
    InvalidPersistedState(String),
}
