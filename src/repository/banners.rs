//! Banners repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::banner::{Banner, CreateBanner, UpdateBanner},
};

/// Persistence operations on banners.
///
/// Any operation that turns a banner on must turn every other banner off in
/// the same atomic step.
#[async_trait]
pub trait BannerStore: Send + Sync {
    async fn create(&self, banner: &CreateBanner) -> AppResult<Banner>;

    async fn get(&self, id: Uuid) -> AppResult<Option<Banner>>;

    async fn list(&self) -> AppResult<Vec<Banner>>;

    async fn active(&self) -> AppResult<Option<Banner>>;

    async fn update(&self, id: Uuid, changes: &UpdateBanner) -> AppResult<Option<Banner>>;

    /// Make `id` the only active banner. Returns `None` if it does not exist.
    async fn activate(&self, id: Uuid) -> AppResult<Option<Banner>>;

    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    async fn count(&self) -> AppResult<i64>;
}

/// Advisory lock key held by every transaction that turns a banner on
const BANNER_SWITCH_LOCK: i64 = 0x6261_6e6e_6572;

#[derive(Clone)]
pub struct BannersRepository {
    pool: Pool<Postgres>,
}

impl BannersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Single-statement switch: every row gets `active = (id = target)`.
    ///
    /// Takes the banner switch lock first, so a concurrent switch waits until
    /// this transaction commits and then sees every row it inserted.
    async fn switch_active(con: &mut PgConnection, id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(BANNER_SWITCH_LOCK)
            .execute(&mut *con)
            .await?;

        let result = sqlx::query(
            r#"
            UPDATE banners
            SET active = (id = $1),
                updated_at = CASE WHEN active IS DISTINCT FROM (id = $1) THEN $2 ELSE updated_at END
            WHERE EXISTS (SELECT 1 FROM banners WHERE id = $1)
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(con)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn fetch(con: &mut PgConnection, id: Uuid) -> AppResult<Option<Banner>> {
        let banner = sqlx::query_as::<_, Banner>("SELECT * FROM banners WHERE id = $1")
            .bind(id)
            .fetch_optional(con)
            .await?;
        Ok(banner)
    }
}

#[async_trait]
impl BannerStore for BannersRepository {
    async fn create(&self, banner: &CreateBanner) -> AppResult<Banner> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO banners (id, title, subtitle, image_url, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, FALSE, $5, $5)
            "#,
        )
        .bind(id)
        .bind(&banner.title)
        .bind(&banner.subtitle)
        .bind(&banner.image_url)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if banner.active.unwrap_or(false) {
            Self::switch_active(&mut *tx, id, now).await?;
        }

        let created = Self::fetch(&mut *tx, id).await?;
        tx.commit().await?;

        created.ok_or_else(|| AppError::Internal("Created banner vanished".to_string()))
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Banner>> {
        let banner = sqlx::query_as::<_, Banner>("SELECT * FROM banners WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(banner)
    }

    async fn list(&self) -> AppResult<Vec<Banner>> {
        let banners = sqlx::query_as::<_, Banner>("SELECT * FROM banners ORDER BY created_at DESC, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(banners)
    }

    async fn active(&self) -> AppResult<Option<Banner>> {
        let banner = sqlx::query_as::<_, Banner>("SELECT * FROM banners WHERE active LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(banner)
    }

    async fn update(&self, id: Uuid, changes: &UpdateBanner) -> AppResult<Option<Banner>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE banners SET
                title = COALESCE($2, title),
                subtitle = COALESCE($3, subtitle),
                image_url = COALESCE($4, image_url),
                active = CASE WHEN $5 = FALSE THEN FALSE ELSE active END,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.subtitle)
        .bind(&changes.image_url)
        .bind(changes.active)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        if changes.active == Some(true) {
            Self::switch_active(&mut *tx, id, now).await?;
        }

        let banner = Self::fetch(&mut *tx, id).await?;
        tx.commit().await?;

        Ok(banner)
    }

    async fn activate(&self, id: Uuid) -> AppResult<Option<Banner>> {
        let mut tx = self.pool.begin().await?;

        if !Self::switch_active(&mut *tx, id, Utc::now()).await? {
            return Ok(None);
        }

        let banner = Self::fetch(&mut *tx, id).await?;
        tx.commit().await?;

        Ok(banner)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM banners WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM banners")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
