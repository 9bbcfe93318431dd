//! Books repository (catalog store)

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, NewBook, UpdateBook},
        review::RatingSummary,
    },
};

/// Persistence operations on books
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn create(&self, book: &NewBook) -> AppResult<Book>;

    async fn get(&self, id: Uuid) -> AppResult<Option<Book>>;

    /// Books matching the filters, newest first
    async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>>;

    async fn update(&self, id: Uuid, changes: &UpdateBook) -> AppResult<Option<Book>>;

    /// Delete a book together with its reviews and borrow records.
    /// Returns false when the book did not exist.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Unconditionally put one copy back on the shelf
    async fn increment_quantity(&self, id: Uuid) -> AppResult<Option<Book>>;

    /// Overwrite the derived rating fields. Returns false when the book is gone.
    async fn set_rating_summary(&self, id: Uuid, summary: &RatingSummary) -> AppResult<bool>;

    async fn recent(&self, limit: i64) -> AppResult<Vec<Book>>;

    async fn count(&self) -> AppResult<i64>;

    /// Number of distinct non-empty categories used by books
    async fn count_categories(&self) -> AppResult<i64>;
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Escape LIKE wildcards so user input matches literally
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `quantity + 1` past the column range means the shelf count is saturated
pub(crate) fn restock_error(error: sqlx::Error, book_id: Uuid) -> AppError {
    match error {
        sqlx::Error::Database(ref db) if db.code().as_deref() == Some("22003") => {
            AppError::Conflict(format!("Book {} cannot hold more copies", book_id))
        }
        other => AppError::Database(other),
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let now = Utc::now();
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (id, title, author, description, category, quantity, available,
                               image, rating, average_rating, review_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, 0, $10, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(&book.category)
        .bind(book.quantity)
        .bind(book.available)
        .bind(&book.image)
        .bind(book.rating)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn list(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM books WHERE 1=1");

        if let Some(ref category) = query.category {
            builder.push(" AND category = ").push_bind(category.clone());
        }

        match query.available {
            Some(true) => {
                builder.push(" AND quantity > 0");
            }
            Some(false) => {
                builder.push(" AND quantity <= 0");
            }
            None => {}
        }

        if let Some(term) = query.search_term() {
            let pattern = format!("%{}%", escape_like(&term));
            builder
                .push(" AND (LOWER(title) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(COALESCE(description, '')) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR LOWER(category) LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        builder.push(" ORDER BY created_at DESC, id");

        let books = builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn update(&self, id: Uuid, changes: &UpdateBook) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                description = COALESCE($4, description),
                category = COALESCE($5, category),
                quantity = COALESCE($6, quantity),
                available = COALESCE($7, available),
                image = COALESCE($8, image),
                rating = COALESCE($9, rating),
                updated_at = $10
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.author)
        .bind(&changes.description)
        .bind(&changes.category)
        .bind(changes.quantity)
        .bind(changes.available)
        .bind(&changes.image)
        .bind(changes.rating)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM reviews WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM borrow_records WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_quantity(&self, id: Uuid) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET quantity = quantity + 1, available = TRUE, updated_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| restock_error(e, id))?;

        Ok(book)
    }

    async fn set_rating_summary(&self, id: Uuid, summary: &RatingSummary) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE books SET average_rating = $2, review_count = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(summary.average_rating)
        .bind(summary.review_count)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn recent(&self, limit: i64) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT * FROM books ORDER BY created_at DESC, id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_categories(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT category) FROM books WHERE category <> ''",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
