use async_trait::async_trait;
use folio_core::model::{BookId, UserId};

use super::SqliteRepository;
use super::mapping::{book_id_to_i64, map_library_row, user_id_to_i64};
use crate::repository::{LibraryEntry, LibraryRepository, StorageError};

#[async_trait]
impl LibraryRepository for SqliteRepository {
    async fn add_library_book(
        &self,
        user_id: UserId,
        entry: LibraryEntry,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO library_books (user_id, book_id, added_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, book_id) DO NOTHING
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .bind(book_id_to_i64(entry.book_id)?)
        .bind(entry.added_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn remove_library_book(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM library_books WHERE user_id = ?1 AND book_id = ?2")
            .bind(user_id_to_i64(user_id)?)
            .bind(book_id_to_i64(book_id)?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_library(&self, user_id: UserId) -> Result<Vec<LibraryEntry>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT book_id, added_at
            FROM library_books
            WHERE user_id = ?1
            ORDER BY added_at DESC, rowid DESC
            ",
        )
        .bind(user_id_to_i64(user_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_library_row).collect()
    }
}
