//! Repository layer for database operations

pub mod banners;
pub mod books;
pub mod categories;
pub mod loans;
pub mod memory;
pub mod reviews;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::error::AppResult;

pub use banners::BannerStore;
pub use books::BookStore;
pub use categories::CategoryStore;
pub use loans::LoanStore;
pub use reviews::ReviewStore;

/// Main repository struct holding one store per collection
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
    pub loans: Arc<dyn LoanStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub banners: Arc<dyn BannerStore>,
    pub categories: Arc<dyn CategoryStore>,
    pool: Option<Pool<Postgres>>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            loans: Arc::new(loans::LoansRepository::new(pool.clone())),
            reviews: Arc::new(reviews::ReviewsRepository::new(pool.clone())),
            banners: Arc::new(banners::BannersRepository::new(pool.clone())),
            categories: Arc::new(categories::CategoriesRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a repository backed by process memory
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::new();
        Self {
            books: Arc::new(store.clone()),
            loans: Arc::new(store.clone()),
            reviews: Arc::new(store.clone()),
            banners: Arc::new(store.clone()),
            categories: Arc::new(store),
            pool: None,
        }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(ref pool) = self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
