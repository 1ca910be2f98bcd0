use std::sync::Arc;

use folio_core::model::{BookId, UserId};
use folio_core::shelf::{LibraryStats, ShelfGroups};
use storage::repository::{LibraryEntry, LibraryRepository};

use crate::Clock;
use crate::error::ServiceError;
use crate::progress_service::ProgressService;

/// Library membership plus the shelf and statistics views derived from progress.
#[derive(Clone)]
pub struct LibraryService {
    clock: Clock,
    library: Arc<dyn LibraryRepository>,
    progress: Arc<ProgressService>,
}

impl LibraryService {
    #[must_use]
    pub fn new(
        clock: Clock,
        library: Arc<dyn LibraryRepository>,
        progress: Arc<ProgressService>,
    ) -> Self {
        Self {
            clock,
            library,
            progress,
        }
    }

    /// Add a book to the user's library. Already-present books keep their original date.
    ///
    /// # Errors
    ///
    /// Returns session errors or `ServiceError::Storage` if persistence fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn add_book(&self, user_id: UserId, book_id: BookId) -> Result<(), ServiceError> {
        self.progress.authorize(user_id)?;
        let entry = LibraryEntry {
            book_id,
            added_at: self.clock.now(),
        };
        self.library.add_library_book(user_id, entry).await?;
        Ok(())
    }

    /// Remove a book and discard its reading progress.
    ///
    /// Returns whether the book was in the library.
    ///
    /// # Errors
    ///
    /// Returns session errors or `ServiceError::Storage` if persistence fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn remove_book(&self, user_id: UserId, book_id: BookId) -> Result<bool, ServiceError> {
        self.progress.authorize(user_id)?;
        let removed = self.library.remove_library_book(user_id, book_id).await?;
        self.progress.clear_progress(user_id, book_id).await?;
        Ok(removed)
    }

    /// Add the book if absent, remove it otherwise. Returns `true` if it is now in the library.
    ///
    /// Toggling off keeps progress; only `remove_book` discards it.
    ///
    /// # Errors
    ///
    /// Returns session errors or `ServiceError::Storage` if persistence fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn toggle_book(&self, user_id: UserId, book_id: BookId) -> Result<bool, ServiceError> {
        self.progress.authorize(user_id)?;
        if self.library.remove_library_book(user_id, book_id).await? {
            return Ok(false);
        }
        self.add_book(user_id, book_id).await?;
        Ok(true)
    }

    /// Library entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns session errors or `ServiceError::Storage` if the read fails.
    pub async fn library(&self, user_id: UserId) -> Result<Vec<LibraryEntry>, ServiceError> {
        self.progress.authorize(user_id)?;
        Ok(self.library.list_library(user_id).await?)
    }

    /// Partition the library into Reading / To Read / Completed from current progress.
    ///
    /// # Errors
    ///
    /// Returns session errors or `ServiceError::Storage` if a read fails.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn shelves(&self, user_id: UserId) -> Result<ShelfGroups, ServiceError> {
        let entries = self.library(user_id).await?;
        let progress = self.progress.get_all_progress(user_id).await?;
        Ok(ShelfGroups::build(
            entries.into_iter().map(|e| e.book_id),
            &progress,
        ))
    }

    /// Books completed and chapters read across everything the user has progress on.
    ///
    /// # Errors
    ///
    /// Returns session errors or `ServiceError::Storage` if the read fails.
    pub async fn stats(&self, user_id: UserId) -> Result<LibraryStats, ServiceError> {
        let progress = self.progress.get_all_progress(user_id).await?;
        Ok(LibraryStats::from_progress(&progress))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use folio_core::model::{Book, Chapter, ScrollSample};
    use folio_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    use crate::session::SessionHandle;

    struct Fixture {
        user: UserId,
        progress: Arc<ProgressService>,
        library: LibraryService,
    }

    fn fixture() -> Fixture {
        let user = UserId::new(1);
        let repo = InMemoryRepository::new();
        let progress = Arc::new(ProgressService::new(
            Arc::new(SessionHandle::signed_in(user)),
            Arc::new(repo.clone()),
        ));
        let library = LibraryService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo),
            Arc::clone(&progress),
        );
        Fixture {
            user,
            progress,
            library,
        }
    }

    fn book(id: u64) -> Book {
        Book::new(
            BookId::new(id),
            format!("Book {id}"),
            vec![Chapter::published(1), Chapter::published(2)],
        )
    }

    #[tokio::test]
    async fn shelves_follow_progress() {
        let f = fixture();
        for id in 1..=3 {
            f.library.add_book(f.user, BookId::new(id)).await.unwrap();
        }
        f.progress
            .save_progress(f.user, &book(1), ScrollSample::new(0, 10.0, 1000.0))
            .await
            .unwrap();
        for index in 0..2 {
            f.progress
                .save_progress(f.user, &book(2), ScrollSample::new(index, 0.0, 0.0))
                .await
                .unwrap();
        }

        let shelves = f.library.shelves(f.user).await.unwrap();
        assert_eq!(shelves.reading, vec![BookId::new(1)]);
        assert_eq!(shelves.completed, vec![BookId::new(2)]);
        assert_eq!(shelves.to_read, vec![BookId::new(3)]);

        let stats = f.library.stats(f.user).await.unwrap();
        assert_eq!(stats.books_read, 1);
        assert_eq!(stats.chapters_read, 2);
    }

    #[tokio::test]
    async fn remove_book_clears_progress() {
        let f = fixture();
        f.library.add_book(f.user, BookId::new(1)).await.unwrap();
        f.progress
            .save_progress(f.user, &book(1), ScrollSample::new(0, 0.0, 0.0))
            .await
            .unwrap();

        assert!(f.library.remove_book(f.user, BookId::new(1)).await.unwrap());
        assert!(
            f.progress
                .get_progress_for_book(f.user, BookId::new(1))
                .await
                .unwrap()
                .is_none()
        );
        assert!(!f.library.remove_book(f.user, BookId::new(1)).await.unwrap());
    }

    #[tokio::test]
    async fn toggle_adds_then_removes() {
        let f = fixture();
        assert!(f.library.toggle_book(f.user, BookId::new(4)).await.unwrap());
        let entries = f.library.library(f.user).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].added_at, fixed_now());

        assert!(!f.library.toggle_book(f.user, BookId::new(4)).await.unwrap());
        assert!(f.library.library(f.user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn library_requires_matching_session() {
        let f = fixture();
        let err = f
            .library
            .add_book(UserId::new(9), BookId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));
    }
}
