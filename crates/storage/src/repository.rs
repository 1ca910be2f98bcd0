use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_core::model::{BookId, BookProgress, UserId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A book a user has added to their library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub book_id: BookId,
    pub added_at: DateTime<Utc>,
}

/// Repository contract for per-user, per-book reading progress.
///
/// Every read hands back an owned value; callers never hold references into
/// the backing store.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the record for one book.
    ///
    /// Returns `Ok(None)` when the user has never read the book.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_book_progress(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<Option<BookProgress>, StorageError>;

    /// Fetch every record for a user, keyed by book.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_book_progress(
        &self,
        user_id: UserId,
    ) -> Result<BTreeMap<BookId, BookProgress>, StorageError>;

    /// Insert or replace the record for one book.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_book_progress(
        &self,
        user_id: UserId,
        book_id: BookId,
        progress: &BookProgress,
    ) -> Result<(), StorageError>;

    /// Remove the record for one book. Removing a missing record succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn delete_book_progress(&self, user_id: UserId, book_id: BookId)
    -> Result<(), StorageError>;
}

/// Repository contract for library membership.
#[async_trait]
pub trait LibraryRepository: Send + Sync {
    /// Add a book to the user's library. Adding a book twice keeps the first entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn add_library_book(&self, user_id: UserId, entry: LibraryEntry)
    -> Result<(), StorageError>;

    /// Remove a book, returning whether it was present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove_library_book(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<bool, StorageError>;

    /// List library entries, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_library(&self, user_id: UserId) -> Result<Vec<LibraryEntry>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<UserId, BTreeMap<BookId, BookProgress>>>>,
    library: Arc<Mutex<HashMap<UserId, Vec<LibraryEntry>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_book_progress(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<Option<BookProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard
            .get(&user_id)
            .and_then(|books| books.get(&book_id))
            .cloned())
    }

    async fn list_book_progress(
        &self,
        user_id: UserId,
    ) -> Result<BTreeMap<BookId, BookProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(&user_id).cloned().unwrap_or_default())
    }

    async fn upsert_book_progress(
        &self,
        user_id: UserId,
        book_id: BookId,
        progress: &BookProgress,
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard
            .entry(user_id)
            .or_default()
            .insert(book_id, progress.clone());
        Ok(())
    }

    async fn delete_book_progress(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        if let Some(books) = guard.get_mut(&user_id) {
            books.remove(&book_id);
        }
        Ok(())
    }
}

#[async_trait]
impl LibraryRepository for InMemoryRepository {
    async fn add_library_book(
        &self,
        user_id: UserId,
        entry: LibraryEntry,
    ) -> Result<(), StorageError> {
        let mut guard = self.library.lock().map_err(poisoned)?;
        let entries = guard.entry(user_id).or_default();
        if !entries.iter().any(|e| e.book_id == entry.book_id) {
            entries.insert(0, entry);
        }
        Ok(())
    }

    async fn remove_library_book(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<bool, StorageError> {
        let mut guard = self.library.lock().map_err(poisoned)?;
        let Some(entries) = guard.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|e| e.book_id != book_id);
        Ok(entries.len() != before)
    }

    async fn list_library(&self, user_id: UserId) -> Result<Vec<LibraryEntry>, StorageError> {
        let guard = self.library.lock().map_err(poisoned)?;
        Ok(guard.get(&user_id).cloned().unwrap_or_default())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub library: Arc<dyn LibraryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let library: Arc<dyn LibraryRepository> = Arc::new(repo);
        Self { progress, library }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use folio_core::model::{Book, Chapter, ChapterId, ScrollSample};
    use folio_core::time::fixed_now;

    fn two_chapter_book() -> Book {
        Book::new(
            BookId::new(1),
            "Test",
            vec![Chapter::published(1), Chapter::published(2)],
        )
    }

    fn sample_progress() -> BookProgress {
        let mut progress = BookProgress::default();
        progress
            .record_sample(&two_chapter_book(), ScrollSample::new(0, 500.0, 1000.0))
            .unwrap();
        progress
    }

    #[tokio::test]
    async fn mutating_a_fetched_record_does_not_touch_the_store() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        repo.upsert_book_progress(user, BookId::new(1), &sample_progress())
            .await
            .unwrap();

        let mut fetched = repo
            .get_book_progress(user, BookId::new(1))
            .await
            .unwrap()
            .unwrap();
        fetched
            .record_sample(&two_chapter_book(), ScrollSample::new(1, 0.0, 0.0))
            .unwrap();
        assert_eq!(fetched.overall_progress(), 75);

        let stored = repo
            .get_book_progress(user, BookId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.overall_progress(), 25);
        assert!(stored.chapter(ChapterId::new(2)).is_none());
        assert!(
            repo.get_book_progress(user, BookId::new(2))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_scoped_to_user() {
        let repo = InMemoryRepository::new();
        let alice = UserId::new(1);
        let bob = UserId::new(2);
        repo.upsert_book_progress(alice, BookId::new(1), &sample_progress())
            .await
            .unwrap();
        repo.upsert_book_progress(bob, BookId::new(1), &sample_progress())
            .await
            .unwrap();

        repo.delete_book_progress(alice, BookId::new(1)).await.unwrap();
        repo.delete_book_progress(alice, BookId::new(1)).await.unwrap();
        repo.delete_book_progress(UserId::new(3), BookId::new(1))
            .await
            .unwrap();

        assert!(repo.list_book_progress(alice).await.unwrap().is_empty());
        assert_eq!(repo.list_book_progress(bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn library_lists_newest_first_without_duplicates() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(1);
        let now = fixed_now();
        for (id, offset) in [(1, 0), (2, 1), (1, 2)] {
            repo.add_library_book(
                user,
                LibraryEntry {
                    book_id: BookId::new(id),
                    added_at: now + Duration::minutes(offset),
                },
            )
            .await
            .unwrap();
        }

        let entries = repo.list_library(user).await.unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.book_id).collect();
        assert_eq!(ids, vec![BookId::new(2), BookId::new(1)]);
        assert_eq!(entries[1].added_at, now);

        assert!(repo.remove_library_book(user, BookId::new(1)).await.unwrap());
        assert!(!repo.remove_library_book(user, BookId::new(1)).await.unwrap());
    }
}
