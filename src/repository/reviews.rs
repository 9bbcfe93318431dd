//! Reviews repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::review::{NewReview, Review, ReviewQuery, ReviewRow, UpdateReview},
};

/// Persistence operations on reviews
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn create(&self, review: &NewReview) -> AppResult<Review>;

    async fn get(&self, id: Uuid) -> AppResult<Option<Review>>;

    /// Reviews matching the filters, newest first
    async fn list(&self, query: &ReviewQuery) -> AppResult<Vec<Review>>;

    /// Ratings of every review attached to a book
    async fn ratings_for_book(&self, book_id: Uuid) -> AppResult<Vec<i32>>;

    async fn update(&self, id: Uuid, changes: &UpdateReview) -> AppResult<Option<Review>>;

    /// Delete a review, returning it if it existed
    async fn delete(&self, id: Uuid) -> AppResult<Option<Review>>;
}

#[derive(Clone)]
pub struct ReviewsRepository {
    pool: Pool<Postgres>,
}

impl ReviewsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for ReviewsRepository {
    async fn create(&self, review: &NewReview) -> AppResult<Review> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            INSERT INTO reviews (id, title, content, author_name, author_email, author_photo_url,
                                 rating, category, book_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&review.title)
        .bind(&review.content)
        .bind(&review.author.name)
        .bind(&review.author.email)
        .bind(&review.author.photo_url)
        .bind(review.rating)
        .bind(review.category)
        .bind(review.book_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Review::from))
    }

    async fn list(&self, query: &ReviewQuery) -> AppResult<Vec<Review>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM reviews WHERE 1=1");

        if let Some(book_id) = query.book_id {
            builder.push(" AND book_id = ").push_bind(book_id);
        }
        if let Some(category) = query.category {
            builder.push(" AND category = ").push_bind(category);
        }
        builder.push(" ORDER BY created_at DESC, id");

        let rows = builder
            .build_query_as::<ReviewRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn ratings_for_book(&self, book_id: Uuid) -> AppResult<Vec<i32>> {
        let ratings: Vec<i32> = sqlx::query_scalar("SELECT rating FROM reviews WHERE book_id = $1")
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ratings)
    }

    async fn update(&self, id: Uuid, changes: &UpdateReview) -> AppResult<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            UPDATE reviews SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                rating = COALESCE($4, rating),
                category = COALESCE($5, category),
                book_id = COALESCE($6, book_id),
                updated_at = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.title.as_deref().map(str::trim))
        .bind(&changes.content)
        .bind(changes.rating)
        .bind(changes.category)
        .bind(changes.book_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Review::from))
    }

    async fn delete(&self, id: Uuid) -> AppResult<Option<Review>> {
        let row = sqlx::query_as::<_, ReviewRow>("DELETE FROM reviews WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Review::from))
    }
}
