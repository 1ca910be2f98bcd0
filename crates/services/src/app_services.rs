use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::library_service::LibraryService;
use crate::progress_service::ProgressService;
use crate::session::SessionProvider;
use crate::throttle::{ThrottleConfig, ThrottledProgressWriter};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressService>,
    library: Arc<LibraryService>,
    writer: ThrottledProgressWriter,
}

impl AppServices {
    #[must_use]
    pub fn new(
        storage: &Storage,
        clock: Clock,
        session: Arc<dyn SessionProvider>,
        throttle: ThrottleConfig,
    ) -> Self {
        let progress = Arc::new(ProgressService::new(
            session,
            Arc::clone(&storage.progress),
        ));
        let library = Arc::new(LibraryService::new(
            clock,
            Arc::clone(&storage.library),
            Arc::clone(&progress),
        ));
        let writer = ThrottledProgressWriter::new(Arc::clone(&progress), throttle);
        Self {
            progress,
            library,
            writer,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        session: Arc<dyn SessionProvider>,
        throttle: ThrottleConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(&storage, clock, session, throttle))
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn library(&self) -> Arc<LibraryService> {
        Arc::clone(&self.library)
    }

    #[must_use]
    pub fn writer(&self) -> ThrottledProgressWriter {
        self.writer.clone()
    }
}
