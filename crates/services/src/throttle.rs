//! Trailing-edge coalescing of high-frequency scroll samples.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use folio_core::model::{Book, BookId, BookProgress, ScrollSample, UserId};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::ServiceError;
use crate::progress_service::ProgressService;

const DEFAULT_INTERVAL: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

struct PendingWrite {
    book: Arc<Book>,
    sample: ScrollSample,
}

#[derive(Default)]
struct State {
    pending: HashMap<(UserId, BookId), PendingWrite>,
    timer_armed: bool,
}

struct Inner {
    service: Arc<ProgressService>,
    config: ThrottleConfig,
    state: Mutex<State>,
    // Held from taking a batch until its last write lands.
    writing: AsyncMutex<()>,
}

impl Inner {
    fn take_pending(&self, disarm: bool) -> Vec<((UserId, BookId), PendingWrite)> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if disarm {
            state.timer_armed = false;
        }
        state.pending.drain().collect()
    }

    async fn fire(&self) {
        let _writing = self.writing.lock().await;
        for ((user_id, book_id), write) in self.take_pending(true) {
            if let Err(error) = self
                .service
                .save_progress(user_id, &write.book, write.sample)
                .await
            {
                tracing::warn!(%user_id, %book_id, %error, "background progress save failed");
            }
        }
    }
}

/// Wraps `ProgressService` so a burst of samples results in one write.
///
/// Each `(user, book)` keeps only its newest pending sample. The first sample
/// of a burst arms a single timer; when it expires, the latest samples are
/// written. Superseded samples are dropped, not executed. Call `flush` on
/// page hide/unload so the final position is not lost.
///
/// `submit` spawns onto the current Tokio runtime.
#[derive(Clone)]
pub struct ThrottledProgressWriter {
    inner: Arc<Inner>,
}

impl ThrottledProgressWriter {
    #[must_use]
    pub fn new(service: Arc<ProgressService>, config: ThrottleConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                config,
                state: Mutex::new(State::default()),
                writing: AsyncMutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> ThrottleConfig {
        self.inner.config
    }

    /// Queue a sample, replacing any pending one for the same book.
    pub fn submit(&self, user_id: UserId, book: Arc<Book>, sample: ScrollSample) {
        let arm = {
            let mut state = self
                .inner
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            state
                .pending
                .insert((user_id, book.id()), PendingWrite { book, sample });
            !std::mem::replace(&mut state.timer_armed, true)
        };

        if arm {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                tokio::time::sleep(inner.config.interval).await;
                inner.fire().await;
            });
        }
    }

    /// Whether any sample is waiting for the timer.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .is_empty()
    }

    /// Write every pending sample now, without waiting for the timer.
    ///
    /// A timer write already in progress finishes first, so the samples taken
    /// here are always the last ones written. Returns the saved records. Unlike timer-driven writes, failures are
    /// returned to the caller; the remaining samples are still attempted.
    ///
    /// # Errors
    ///
    /// Returns the first `ServiceError` encountered.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn flush(&self) -> Result<Vec<BookProgress>, ServiceError> {
        let _writing = self.inner.writing.lock().await;
        let mut saved = Vec::new();
        let mut first_error = None;
        for ((user_id, _), write) in self.inner.take_pending(false) {
            match self
                .inner
                .service
                .save_progress(user_id, &write.book, write.sample)
                .await
            {
                Ok(record) => saved.push(record),
                Err(error) => {
                    tracing::warn!(%user_id, %error, "progress flush failed");
                    first_error.get_or_insert(error);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(saved),
        }
    }
}
