use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use folio_core::model::{BookId, BookProgress, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    book_id_from_i64, book_id_to_i64, chapters_to_json, index_to_i64, map_progress_row, ser,
    scroll_to_i64, user_id_to_i64,
};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_book_progress(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<Option<BookProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT overall_progress, last_read_chapter_index, last_read_scroll_position, chapters
            FROM book_progress
            WHERE user_id = ?1 AND book_id = ?2
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .bind(book_id_to_i64(book_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_book_progress(
        &self,
        user_id: UserId,
    ) -> Result<BTreeMap<BookId, BookProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT book_id, overall_progress, last_read_chapter_index, last_read_scroll_position, chapters
            FROM book_progress
            WHERE user_id = ?1
            ORDER BY book_id ASC
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = BTreeMap::new();
        for row in rows {
            let book_id = book_id_from_i64(row.try_get("book_id").map_err(ser)?)?;
            records.insert(book_id, map_progress_row(&row)?);
        }
        Ok(records)
    }

    async fn upsert_book_progress(
        &self,
        user_id: UserId,
        book_id: BookId,
        progress: &BookProgress,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO book_progress (
                user_id, book_id, overall_progress, last_read_chapter_index,
                last_read_scroll_position, chapters, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id, book_id) DO UPDATE SET
                overall_progress = excluded.overall_progress,
                last_read_chapter_index = excluded.last_read_chapter_index,
                last_read_scroll_position = excluded.last_read_scroll_position,
                chapters = excluded.chapters,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .bind(book_id_to_i64(book_id)?)
        .bind(i64::from(progress.overall_progress()))
        .bind(index_to_i64(progress.last_read_chapter_index())?)
        .bind(scroll_to_i64(progress.last_read_scroll_position())?)
        .bind(chapters_to_json(progress.chapters())?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn delete_book_progress(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM book_progress WHERE user_id = ?1 AND book_id = ?2")
            .bind(user_id_to_i64(user_id)?)
            .bind(book_id_to_i64(book_id)?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}
