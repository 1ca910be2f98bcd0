use serde::{Deserialize, Serialize};

use crate::model::{BookId, ChapterId};

/// Publication state of a chapter. Only published chapters count toward progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterStatus {
    #[default]
    Draft,
    Published,
}

impl ChapterStatus {
    #[must_use]
    pub fn is_published(self) -> bool {
        matches!(self, ChapterStatus::Published)
    }
}

/// A titled content unit within a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    id: ChapterId,
    #[serde(default)]
    title: String,
    status: ChapterStatus,
}

impl Chapter {
    #[must_use]
    pub fn new(id: ChapterId, title: impl Into<String>, status: ChapterStatus) -> Self {
        Self {
            id,
            title: title.into(),
            status,
        }
    }

    #[must_use]
    pub fn published(id: u64) -> Self {
        Self::new(ChapterId::new(id), format!("Chapter {id}"), ChapterStatus::Published)
    }

    #[must_use]
    pub fn draft(id: u64) -> Self {
        Self::new(ChapterId::new(id), format!("Chapter {id}"), ChapterStatus::Draft)
    }

    #[must_use]
    pub fn id(&self) -> ChapterId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn status(&self) -> ChapterStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ChapterStatus) {
        self.status = status;
    }
}

/// Catalog view of a book: its id and ordered chapter list.
///
/// The progress engine only reads this value; the catalog owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    id: BookId,
    #[serde(default)]
    title: String,
    chapters: Vec<Chapter>,
}

impl Book {
    #[must_use]
    pub fn new(id: BookId, title: impl Into<String>, chapters: Vec<Chapter>) -> Self {
        Self {
            id,
            title: title.into(),
            chapters,
        }
    }

    #[must_use]
    pub fn id(&self) -> BookId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn chapters_mut(&mut self) -> &mut [Chapter] {
        &mut self.chapters
    }

    /// Chapter at a position in the full (unfiltered) chapter list.
    #[must_use]
    pub fn chapter_at(&self, index: usize) -> Option<&Chapter> {
        self.chapters.get(index)
    }

    pub fn published_chapters(&self) -> impl Iterator<Item = &Chapter> {
        self.chapters.iter().filter(|c| c.status.is_published())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_chapters_skip_drafts() {
        let book = Book::new(
            BookId::new(1),
            "Mixed",
            vec![Chapter::published(1), Chapter::draft(2), Chapter::published(3)],
        );
        let ids: Vec<u64> = book.published_chapters().map(|c| c.id().value()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(book.chapter_at(3).is_none());
    }

    #[test]
    fn deserializes_catalog_json() {
        let book: Book = serde_json::from_str(
            r#"{"id": 4, "chapters": [{"id": 10, "status": "published"}, {"id": 11, "status": "draft"}]}"#,
        )
        .unwrap();
        assert_eq!(book.id(), BookId::new(4));
        assert_eq!(book.chapters()[1].status(), ChapterStatus::Draft);
        assert_eq!(book.title(), "");
    }
}
