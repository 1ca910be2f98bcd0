use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ProgressError;
use crate::model::ChapterId;

/// Stored completion for a single chapter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterProgress {
    /// Percentage in `[0, 100]`. Never decreases once stored.
    pub progress: f64,
    /// Last observed scroll offset in pixels.
    pub scroll_position: u64,
}

/// Per-user, per-book reading state.
///
/// `overall_progress` is derived from `chapters` and the book's published
/// chapter set; it can only change through `record_sample` or
/// `recompute_overall`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookProgress {
    pub(crate) overall_progress: u8,
    pub(crate) last_read_chapter_index: usize,
    pub(crate) last_read_scroll_position: u64,
    #[serde(default)]
    pub(crate) chapters: BTreeMap<ChapterId, ChapterProgress>,
}

impl BookProgress {
    /// Rehydrate a record from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidPersistedState` if any percentage is outside `[0, 100]`.
    pub fn from_persisted(
        overall_progress: u8,
        last_read_chapter_index: usize,
        last_read_scroll_position: u64,
        chapters: BTreeMap<ChapterId, ChapterProgress>,
    ) -> Result<Self, ProgressError> {
        if overall_progress > 100 {
            return Err(ProgressError::InvalidPersistedState(format!(
                "overall progress {overall_progress} exceeds 100"
            )));
        }
        if let Some((id, bad)) = chapters
            .iter()
            .find(|(_, c)| !(0.0..=100.0).contains(&c.progress))
        {
            return Err(ProgressError::InvalidPersistedState(format!(
                "chapter {id} progress {} outside 0..=100",
                bad.progress
            )));
        }
        Ok(Self {
            overall_progress,
            last_read_chapter_index,
            last_read_scroll_position,
            chapters,
        })
    }

    #[must_use]
    pub fn overall_progress(&self) -> u8 {
        self.overall_progress
    }

    #[must_use]
    pub fn last_read_chapter_index(&self) -> usize {
        self.last_read_chapter_index
    }

    #[must_use]
    pub fn last_read_scroll_position(&self) -> u64 {
        self.last_read_scroll_position
    }

    #[must_use]
    pub fn chapters(&self) -> &BTreeMap<ChapterId, ChapterProgress> {
        &self.chapters
    }

    #[must_use]
    pub fn chapter(&self, id: ChapterId) -> Option<&ChapterProgress> {
        self.chapters.get(&id)
    }

    /// Stored progress for a chapter, or 0 when it has never been read.
    #[must_use]
    pub fn chapter_progress(&self, id: ChapterId) -> f64 {
        self.chapters.get(&id).map_or(0.0, |c| c.progress)
    }
}

/// One raw scroll/visibility observation from the reader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSample {
    /// Position in the book's full chapter list, drafts included.
    pub chapter_index: usize,
    pub scroll_position: f64,
    /// Scrollable height; `<= 0` means the chapter fits in the viewport.
    pub content_height: f64,
}

impl ScrollSample {
    #[must_use]
    pub fn new(chapter_index: usize, scroll_position: f64, content_height: f64) -> Self {
        Self {
            chapter_index,
            scroll_position,
            content_height,
        }
    }
}

/// Where "continue reading" should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumePoint {
    pub chapter_index: usize,
    pub scroll_position: u64,
}
