use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use folio_core::model::{Book, BookId, BookProgress, ResumePoint, ScrollSample, UserId};
use storage::repository::ProgressRepository;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::ServiceError;
use crate::session::SessionProvider;

type ProgressKey = (UserId, BookId);

/// Serializes read-modify-write cycles on a single `(user, book)` record.
///
/// An entry lives only while some caller holds or waits for it.
#[derive(Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<ProgressKey, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    async fn acquire(&self, key: ProgressKey) -> KeyGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key).or_default())
        };
        KeyGuard {
            owner: self,
            key,
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: ProgressKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters clone the Arc under the map lock, so a count of one means nobody else wants it.
        let mut locks = self
            .owner
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

/// Records scroll samples and exposes the per-user progress store.
///
/// Every operation requires a session whose user matches the `user_id` argument.
pub struct ProgressService {
    session: Arc<dyn SessionProvider>,
    progress: Arc<dyn ProgressRepository>,
    locks: KeyedLocks,
}

impl ProgressService {
    #[must_use]
    pub fn new(session: Arc<dyn SessionProvider>, progress: Arc<dyn ProgressRepository>) -> Self {
        Self {
            session,
            progress,
            locks: KeyedLocks::default(),
        }
    }

    /// Check that the active session belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized` without a session and
    /// `ServiceError::Forbidden` when the session belongs to someone else.
    pub fn authorize(&self, user_id: UserId) -> Result<(), ServiceError> {
        match self.session.current_user_id() {
            None => {
                tracing::warn!(%user_id, "progress access without a session");
                Err(ServiceError::Unauthorized)
            }
            Some(session) if session != user_id => {
                tracing::warn!(%session, requested = %user_id, "progress access for another user");
                Err(ServiceError::Forbidden {
                    session,
                    requested: user_id,
                })
            }
            Some(_) => Ok(()),
        }
    }

    /// Merge a scroll sample into the user's progress for `book` and persist it.
    ///
    /// Creates the record on the first sample. Re-sending a sample after a
    /// failure is safe; chapter progress merges with `max`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Unauthorized`/`Forbidden` for session failures,
    /// `ServiceError::Progress` if the chapter index is outside the book, and
    /// `ServiceError::Storage` if persistence fails.
    #[tracing::instrument(level = "debug", skip(self, book), fields(book_id = %book.id()))]
    pub async fn save_progress(
        &self,
        user_id: UserId,
        book: &Book,
        sample: ScrollSample,
    ) -> Result<BookProgress, ServiceError> {
        self.authorize(user_id)?;
        let _guard = self.locks.acquire((user_id, book.id())).await;

        let mut record = self
            .progress
            .get_book_progress(user_id, book.id())
            .await?
            .unwrap_or_else(|| BookProgress::started_at(sample.chapter_index));
        record.record_sample(book, sample)?;
        self.progress
            .upsert_book_progress(user_id, book.id(), &record)
            .await?;

        tracing::debug!(
            overall = record.overall_progress(),
            chapter_index = sample.chapter_index,
            "saved reading progress"
        );
        Ok(record)
    }

    /// Fetch the record for one book, or `None` if the user never opened it.
    ///
    /// # Errors
    ///
    /// Returns session errors or `ServiceError::Storage` if the read fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_progress_for_book(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<Option<BookProgress>, ServiceError> {
        self.authorize(user_id)?;
        Ok(self.progress.get_book_progress(user_id, book_id).await?)
    }

    /// Fetch every record for the user; empty when nothing has been read.
    ///
    /// # Errors
    ///
    /// Returns session errors or `ServiceError::Storage` if the read fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_all_progress(
        &self,
        user_id: UserId,
    ) -> Result<BTreeMap<BookId, BookProgress>, ServiceError> {
        self.authorize(user_id)?;
        Ok(self.progress.list_book_progress(user_id).await?)
    }

    /// Delete the record for one book. Clearing a missing record is a no-op.
    ///
    /// # Errors
    ///
    /// Returns session errors or `ServiceError::Storage` if the delete fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn clear_progress(&self, user_id: UserId, book_id: BookId) -> Result<(), ServiceError> {
        self.authorize(user_id)?;
        let _guard = self.locks.acquire((user_id, book_id)).await;
        self.progress.delete_book_progress(user_id, book_id).await?;
        tracing::info!(%user_id, %book_id, "cleared reading progress");
        Ok(())
    }

    /// Where "continue reading" should reopen `book`.
    ///
    /// Returns `None` when there is no record or the stored chapter no longer exists.
    ///
    /// # Errors
    ///
    /// Returns session errors or `ServiceError::Storage` if the read fails.
    pub async fn resume_point(
        &self,
        user_id: UserId,
        book: &Book,
    ) -> Result<Option<ResumePoint>, ServiceError> {
        let record = self.get_progress_for_book(user_id, book.id()).await?;
        Ok(record.and_then(|r| r.resume_point(book)))
    }
}
