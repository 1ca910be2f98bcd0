//! Shared error types for the services crate.

use thiserror::Error;

use folio_core::ProgressError;
use folio_core::model::UserId;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by progress and library services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("unauthorized: no active session")]
    Unauthorized,

    #[error("forbidden: session user {session} cannot act for user {requested}")]
    Forbidden { session: UserId, requested: UserId },

    #[error(transparent)]
    Progress(#[from] ProgressError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// Whether repeating the same call may succeed.
    ///
    /// Progress writes merge with `max`, so replaying a sample after a storage
    /// failure never double-counts.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Storage(StorageError::Connection(_)))
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
