//! Library groupings derived from book progress.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{BookId, BookProgress};

/// Which shelf a book sits on. Never stored; always derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shelf {
    ToRead,
    Reading,
    Completed,
}

impl Shelf {
    #[must_use]
    pub fn classify(overall_progress: u8) -> Self {
        match overall_progress {
            0 => Shelf::ToRead,
            1..=99 => Shelf::Reading,
            _ => Shelf::Completed,
        }
    }

    /// Shelf for an optional record; a book that was never opened is To Read.
    #[must_use]
    pub fn for_progress(progress: Option<&BookProgress>) -> Self {
        progress.map_or(Shelf::ToRead, |p| Self::classify(p.overall_progress()))
    }
}

impl fmt::Display for Shelf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Shelf::ToRead => "To Read",
            Shelf::Reading => "Reading",
            Shelf::Completed => "Completed",
        };
        f.write_str(label)
    }
}

/// Books of a library partitioned by shelf, in library order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfGroups {
    pub reading: Vec<BookId>,
    pub to_read: Vec<BookId>,
    pub completed: Vec<BookId>,
}

impl ShelfGroups {
    pub fn build(
        library: impl IntoIterator<Item = BookId>,
        progress: &BTreeMap<BookId, BookProgress>,
    ) -> Self {
        let mut groups = Self::default();
        for book_id in library {
            match Shelf::for_progress(progress.get(&book_id)) {
                Shelf::Reading => groups.reading.push(book_id),
                Shelf::ToRead => groups.to_read.push(book_id),
                Shelf::Completed => groups.completed.push(book_id),
            }
        }
        groups
    }

    #[must_use]
    pub fn shelf_of(&self, book_id: BookId) -> Option<Shelf> {
        if self.reading.contains(&book_id) {
            Some(Shelf::Reading)
        } else if self.to_read.contains(&book_id) {
            Some(Shelf::ToRead)
        } else if self.completed.contains(&book_id) {
            Some(Shelf::Completed)
        } else {
            None
        }
    }
}

/// Profile statistics over every progress record a user has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub books_read: usize,
    /// Chapters across all books stored at 100%.
    pub chapters_read: usize,
}

impl LibraryStats {
    #[must_use]
    pub fn from_progress(progress: &BTreeMap<BookId, BookProgress>) -> Self {
        progress
            .values()
            .fold(Self::default(), |mut stats, book| {
                if Shelf::classify(book.overall_progress()) == Shelf::Completed {
                    stats.books_read += 1;
                }
                stats.chapters_read += book
                    .chapters()
                    .values()
                    .filter(|c| c.progress >= 100.0)
                    .count();
                stats
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Book, Chapter, ScrollSample};

    #[test]
    fn classification_boundaries() {
        assert_eq!(Shelf::classify(0), Shelf::ToRead);
        assert_eq!(Shelf::classify(1), Shelf::Reading);
        assert_eq!(Shelf::classify(99), Shelf::Reading);
        assert_eq!(Shelf::classify(100), Shelf::Completed);
        assert_eq!(Shelf::ToRead.to_string(), "To Read");
    }

    #[test]
    fn every_percentage_lands_on_exactly_one_shelf() {
        for pct in 0..=100_u8 {
            let shelf = Shelf::classify(pct);
            let expected = if pct == 0 {
                Shelf::ToRead
            } else if pct < 100 {
                Shelf::Reading
            } else {
                Shelf::Completed
            };
            assert_eq!(shelf, expected, "pct={pct}");
        }
    }

    fn record(book: &Book, samples: &[ScrollSample]) -> BookProgress {
        let mut progress = BookProgress::default();
        for sample in samples {
            progress.record_sample(book, *sample).unwrap();
        }
        progress
    }

    #[test]
    fn groups_and_stats_follow_progress() {
        let short = Book::new(BookId::new(1), "Short", vec![Chapter::published(1)]);
        let long = Book::new(
            BookId::new(2),
            "Long",
            vec![Chapter::published(1), Chapter::published(2)],
        );

        let mut progress = BTreeMap::new();
        progress.insert(short.id(), record(&short, &[ScrollSample::new(0, 0.0, 0.0)]));
        progress.insert(
            long.id(),
            record(
                &long,
                &[
                    ScrollSample::new(0, 0.0, 0.0),
                    ScrollSample::new(1, 100.0, 1000.0),
                ],
            ),
        );

        let groups = ShelfGroups::build([BookId::new(1), BookId::new(2), BookId::new(3)], &progress);
        assert_eq!(groups.completed, vec![BookId::new(1)]);
        assert_eq!(groups.reading, vec![BookId::new(2)]);
        assert_eq!(groups.to_read, vec![BookId::new(3)]);
        assert_eq!(groups.shelf_of(BookId::new(3)), Some(Shelf::ToRead));
        assert_eq!(groups.shelf_of(BookId::new(4)), None);

        let stats = LibraryStats::from_progress(&progress);
        assert_eq!(stats.books_read, 1);
        assert_eq!(stats.chapters_read, 2);
    }
}
