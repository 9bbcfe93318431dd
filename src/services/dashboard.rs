//! Dashboard statistics service

use crate::{
    api::dashboard::DashboardStats,
    error::AppResult,
    models::book::Book,
    repository::Repository,
};

pub const DEFAULT_RECENT_LIMIT: i64 = 5;
pub const MAX_RECENT_LIMIT: i64 = 50;

#[derive(Clone)]
pub struct DashboardService {
    repository: Repository,
}

impl DashboardService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Aggregate counts over the whole library
    pub async fn stats(&self) -> AppResult<DashboardStats> {
        let (total_books, total_borrowers, active_loans, total_categories, total_banners) = tokio::try_join!(
            self.repository.books.count(),
            self.repository.loans.count_borrowers(),
            self.repository.loans.count_outstanding(),
            self.repository.books.count_categories(),
            self.repository.banners.count(),
        )?;

        Ok(DashboardStats {
            total_books,
            total_borrowers,
            active_loans,
            total_categories,
            total_banners,
        })
    }

    /// Most recently added books; `limit` defaults to 5 and is clamped to 1..=50
    pub async fn recent_books(&self, limit: Option<i64>) -> AppResult<Vec<Book>> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, MAX_RECENT_LIMIT);
        self.repository.books.recent(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        banner::CreateBanner,
        book::{CreateBook, NewBook},
    };
    use chrono::Utc;

    async fn add_book(repository: &Repository, title: &str, category: &str, quantity: i32) -> uuid::Uuid {
        repository
            .books
            .create(&NewBook::from(CreateBook {
                title: title.to_string(),
                category: Some(category.to_string()),
                quantity: Some(quantity),
                ..Default::default()
            }))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let repository = Repository::in_memory();
        let dune = add_book(&repository, "Dune", "Science Fiction", 2).await;
        let emma = add_book(&repository, "Emma", "Classics", 1).await;
        add_book(&repository, "Foundation", "Science Fiction", 1).await;

        let now = Utc::now();
        repository.loans.checkout("a@x.com", dune, now).await.unwrap();
        repository.loans.checkout("a@x.com", emma, now).await.unwrap();
        repository.loans.checkout("b@x.com", dune, now).await.unwrap();

        repository
            .banners
            .create(&CreateBanner {
                title: "Welcome".to_string(),
                subtitle: None,
                image_url: "https://img.example/welcome.png".to_string(),
                active: Some(true),
            })
            .await
            .unwrap();

        let stats = DashboardService::new(repository).stats().await.unwrap();
        assert_eq!(stats.total_books, 3);
        assert_eq!(stats.total_borrowers, 2);
        assert_eq!(stats.active_loans, 3);
        assert_eq!(stats.total_categories, 2);
        assert_eq!(stats.total_banners, 1);
    }

    #[tokio::test]
    async fn test_recent_books_limit_is_clamped() {
        let repository = Repository::in_memory();
        for i in 0..7 {
            add_book(&repository, &format!("Book {}", i), "Misc", 1).await;
        }
        let dashboard = DashboardService::new(repository);

        let recent = dashboard.recent_books(None).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].title, "Book 6");

        assert_eq!(dashboard.recent_books(Some(0)).await.unwrap().len(), 1);
        assert_eq!(dashboard.recent_books(Some(500)).await.unwrap().len(), 7);
    }
}
