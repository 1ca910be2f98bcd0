//! Scroll telemetry to chapter and book completion.

use std::collections::BTreeMap;

use crate::error::ProgressError;
use crate::model::{Book, BookProgress, ChapterId, ChapterProgress, ResumePoint, ScrollSample};

const COMPLETE: f64 = 100.0;

/// Completion percentage of a chapter for one scroll observation.
///
/// A chapter whose content does not overflow the viewport (`content_height <= 0`)
/// is fully visible and therefore complete.
#[must_use]
pub fn chapter_completion(scroll_position: f64, content_height: f64) -> f64 {
    if content_height <= 0.0 || content_height.is_nan() {
        return COMPLETE;
    }
    let scroll = sanitize_scroll(scroll_position);
    (scroll * COMPLETE / content_height).clamp(0.0, COMPLETE)
}

/// Average completion over the book's published chapters, rounded half-up.
///
/// Drafts are excluded from both the sum and the count; a book without
/// published chapters is at 0.
#[must_use]
pub fn overall_progress(book: &Book, chapters: &BTreeMap<ChapterId, ChapterProgress>) -> u8 {
    let (sum, count) = book
        .published_chapters()
        .fold((0.0_f64, 0_u32), |(sum, count), chapter| {
            let stored = chapters.get(&chapter.id()).map_or(0.0, |c| c.progress);
            (sum + stored, count + 1)
        });
    if count == 0 {
        return 0;
    }
    let average = (sum / f64::from(count)).clamp(0.0, COMPLETE);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = average.round() as u8;
    rounded
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_scroll(scroll_position: f64) -> u64 {
    sanitize_scroll(scroll_position).round() as u64
}

fn sanitize_scroll(scroll_position: f64) -> f64 {
    if scroll_position.is_finite() {
        scroll_position.max(0.0)
    } else {
        0.0
    }
}

impl BookProgress {
    /// First record for a book, created from the chapter the reader opened.
    #[must_use]
    pub fn started_at(chapter_index: usize) -> Self {
        Self {
            last_read_chapter_index: chapter_index,
            ..Self::default()
        }
    }

    /// Merge a scroll sample into this record and recompute the book total.
    ///
    /// Chapter progress only ever moves up; the last-read position follows the
    /// sample even when it moves backward.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ChapterOutOfRange` if the sample's chapter index is
    /// not a position in `book`. The record is left untouched in that case.
    pub fn record_sample(&mut self, book: &Book, sample: ScrollSample) -> Result<(), ProgressError> {
        let chapter_id = book
            .chapter_at(sample.chapter_index)
            .map(|c| c.id())
            .ok_or(ProgressError::ChapterOutOfRange {
                index: sample.chapter_index,
                len: book.chapters().len(),
            })?;

        let raw = chapter_completion(sample.scroll_position, sample.content_height);
        let merged = self.chapter_progress(chapter_id).max(raw);
        let scroll = round_scroll(sample.scroll_position);

        self.chapters.insert(
            chapter_id,
            ChapterProgress {
                progress: merged,
                scroll_position: scroll,
            },
        );
        self.last_read_chapter_index = sample.chapter_index;
        self.last_read_scroll_position = scroll;
        self.recompute_overall(book);
        Ok(())
    }

    /// Re-derive `overall_progress` from the full published chapter set.
    pub fn recompute_overall(&mut self, book: &Book) {
        self.overall_progress = overall_progress(book, &self.chapters);
    }

    /// Position to reopen the book at, if it still exists in the book.
    #[must_use]
    pub fn resume_point(&self, book: &Book) -> Option<ResumePoint> {
        book.chapter_at(self.last_read_chapter_index)?;
        Some(ResumePoint {
            chapter_index: self.last_read_chapter_index,
            scroll_position: self.last_read_scroll_position,
        })
    }
}
