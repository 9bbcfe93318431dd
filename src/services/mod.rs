//! Business logic services

pub mod banners;
pub mod catalog;
pub mod categories;
pub mod dashboard;
pub mod loans;
pub mod ratings;
pub mod reviews;

use crate::{error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub reviews: reviews::ReviewsService,
    pub banners: banners::BannersService,
    pub categories: categories::CategoriesService,
    pub dashboard: dashboard::DashboardService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone()),
            reviews: reviews::ReviewsService::new(
                repository.clone(),
                ratings::RatingAggregator::new(repository.clone()),
            ),
            banners: banners::BannersService::new(repository.clone()),
            categories: categories::CategoriesService::new(repository.clone()),
            dashboard: dashboard::DashboardService::new(repository.clone()),
            repository,
        }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
