use std::collections::BTreeMap;

use folio_core::model::{BookId, BookProgress, ChapterId, ChapterProgress, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{LibraryEntry, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn user_id_to_i64(id: UserId) -> Result<i64, StorageError> {
    u64_to_i64("user_id", id.value())
}

pub(crate) fn book_id_to_i64(id: BookId) -> Result<i64, StorageError> {
    u64_to_i64("book_id", id.value())
}

pub(crate) fn book_id_from_i64(v: i64) -> Result<BookId, StorageError> {
    Ok(BookId::new(i64_to_u64("book_id", v)?))
}

pub(crate) fn scroll_to_i64(v: u64) -> Result<i64, StorageError> {
    u64_to_i64("scroll_position", v)
}

pub(crate) fn index_to_i64(v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization("chapter index overflow".into()))
}

/// Chapter map as stored in the `chapters` column: `{"<id>": {progress, scrollPosition}}`.
pub(crate) fn chapters_to_json(
    chapters: &BTreeMap<ChapterId, ChapterProgress>,
) -> Result<String, StorageError> {
    serde_json::to_string(chapters).map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<BookProgress, StorageError> {
    let overall: i64 = row.try_get("overall_progress").map_err(ser)?;
    let overall = u8::try_from(overall)
        .map_err(|_| StorageError::Serialization(format!("invalid overall_progress: {overall}")))?;

    let index: i64 = row.try_get("last_read_chapter_index").map_err(ser)?;
    let index = usize::try_from(index)
        .map_err(|_| StorageError::Serialization(format!("invalid chapter index: {index}")))?;

    let scroll = i64_to_u64(
        "last_read_scroll_position",
        row.try_get("last_read_scroll_position").map_err(ser)?,
    )?;

    let raw_chapters: String = row.try_get("chapters").map_err(ser)?;
    let chapters: BTreeMap<ChapterId, ChapterProgress> =
        serde_json::from_str(&raw_chapters).map_err(ser)?;

    BookProgress::from_persisted(overall, index, scroll, chapters).map_err(ser)
}

pub(crate) fn map_library_row(row: &SqliteRow) -> Result<LibraryEntry, StorageError> {
    Ok(LibraryEntry {
        book_id: book_id_from_i64(row.try_get("book_id").map_err(ser)?)?,
        added_at: row.try_get("added_at").map_err(ser)?,
    })
}
