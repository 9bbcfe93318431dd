//! Loans repository (loan ledger)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::loan::BorrowRecord,
};

use super::books::restock_error;

/// Persistence operations on borrow records.
///
/// `checkout` and `checkin` touch both the ledger and the book's quantity and
/// must be atomic: no observer may see one write without the other.
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Outstanding record of `user_email` for `book_id`, if any
    async fn find_outstanding(&self, user_email: &str, book_id: Uuid) -> AppResult<Option<BorrowRecord>>;

    /// Take one copy off the shelf and open a loan.
    ///
    /// Fails with `NotFound` for an unknown book, `OutOfStock` when no copy is
    /// left and `AlreadyBorrowed` when the user already holds an outstanding loan.
    async fn checkout(&self, user_email: &str, book_id: Uuid, borrowed_at: DateTime<Utc>) -> AppResult<BorrowRecord>;

    /// Stamp the return date, put the copy back and remove the record.
    /// Returns the stamped record, or `None` if it did not exist.
    async fn checkin(&self, id: Uuid, returned_at: DateTime<Utc>) -> AppResult<Option<BorrowRecord>>;

    /// Outstanding records of a user, oldest first
    async fn list_for_user(&self, user_email: &str) -> AppResult<Vec<BorrowRecord>>;

    async fn count_outstanding(&self) -> AppResult<i64>;

    /// Distinct emails holding at least one outstanding loan
    async fn count_borrowers(&self) -> AppResult<i64>;
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn find_outstanding(&self, user_email: &str, book_id: Uuid) -> AppResult<Option<BorrowRecord>> {
        let record = sqlx::query_as::<_, BorrowRecord>(
            "SELECT * FROM borrow_records WHERE user_email = $1 AND book_id = $2 AND return_date IS NULL",
        )
        .bind(user_email)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn checkout(&self, user_email: &str, book_id: Uuid, borrowed_at: DateTime<Utc>) -> AppResult<BorrowRecord> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrement: the row lock serializes concurrent borrows of the same book
        let decremented = sqlx::query(
            r#"
            UPDATE books
            SET quantity = quantity - 1, available = quantity - 1 > 0, updated_at = $2
            WHERE id = $1 AND quantity > 0
            "#,
        )
        .bind(book_id)
        .bind(borrowed_at)
        .execute(&mut *tx)
        .await?;

        if decremented.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                .bind(book_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                AppError::OutOfStock
            } else {
                AppError::NotFound(format!("Book with id {} not found", book_id))
            });
        }

        let record = sqlx::query_as::<_, BorrowRecord>(
            r#"
            INSERT INTO borrow_records (id, user_email, book_id, borrowed_date, return_date)
            VALUES ($1, $2, $3, $4, NULL)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_email)
        .bind(book_id)
        .bind(borrowed_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::AlreadyBorrowed,
            other => AppError::Database(other),
        })?;

        tx.commit().await?;

        Ok(record)
    }

    async fn checkin(&self, id: Uuid, returned_at: DateTime<Utc>) -> AppResult<Option<BorrowRecord>> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, BorrowRecord>(
            "UPDATE borrow_records SET return_date = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(returned_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };

        let restored = sqlx::query(
            r#"
            UPDATE books
            SET quantity = quantity + 1, available = TRUE, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(record.book_id)
        .bind(returned_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| restock_error(e, record.book_id))?;

        if restored.rows_affected() == 0 {
            tracing::warn!("Returned loan {} references missing book {}", id, record.book_id);
        }

        sqlx::query("DELETE FROM borrow_records WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(record))
    }

    async fn list_for_user(&self, user_email: &str) -> AppResult<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(
            r#"
            SELECT * FROM borrow_records
            WHERE user_email = $1 AND return_date IS NULL
            ORDER BY borrowed_date
            "#,
        )
        .bind(user_email)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn count_outstanding(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM borrow_records WHERE return_date IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_borrowers(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT user_email) FROM borrow_records WHERE return_date IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
