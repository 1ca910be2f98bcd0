use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use folio_core::model::{BookId, BookProgress, UserId};
use storage::repository::{InMemoryRepository, ProgressRepository, StorageError};

/// In-memory store that sleeps before every call, so concurrent callers
/// interleave between their read and their write.
pub(crate) struct SlowRepository {
    inner: InMemoryRepository,
    delay: Duration,
}

impl SlowRepository {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryRepository::new(),
            delay,
        }
    }
}

#[async_trait]
impl ProgressRepository for SlowRepository {
    async fn get_book_progress(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<Option<BookProgress>, StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_book_progress(user_id, book_id).await
    }

    async fn list_book_progress(
        &self,
        user_id: UserId,
    ) -> Result<BTreeMap<BookId, BookProgress>, StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_book_progress(user_id).await
    }

    async fn upsert_book_progress(
        &self,
        user_id: UserId,
        book_id: BookId,
        progress: &BookProgress,
    ) -> Result<(), StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner
            .upsert_book_progress(user_id, book_id, progress)
            .await
    }

    async fn delete_book_progress(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<(), StorageError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete_book_progress(user_id, book_id).await
    }
}
