//! Categories repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::category::{Category, CreateCategory, UpdateCategory},
};

/// Persistence operations on categories.
///
/// Names are unique case-insensitively; a write that would break this fails
/// with `Conflict`.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn create(&self, category: &CreateCategory) -> AppResult<Category>;

    async fn get(&self, id: Uuid) -> AppResult<Option<Category>>;

    /// All categories ordered by name
    async fn list(&self) -> AppResult<Vec<Category>>;

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Category>>;

    async fn update(&self, id: Uuid, changes: &UpdateCategory) -> AppResult<Option<Category>>;

    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct CategoriesRepository {
    pool: Pool<Postgres>,
}

impl CategoriesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn duplicate_name(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict("Category already exists".to_string())
        }
        other => AppError::Database(other),
    }
}

#[async_trait]
impl CategoryStore for CategoriesRepository {
    async fn create(&self, category: &CreateCategory) -> AppResult<Category> {
        let now = Utc::now();
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (id, name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&category.name)
        .bind(&category.description)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(duplicate_name)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    async fn list(&self) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY LOWER(name)")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn update(&self, id: Uuid, changes: &UpdateCategory) -> AppResult<Option<Category>> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(duplicate_name)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
