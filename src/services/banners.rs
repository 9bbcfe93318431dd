//! Banner service. At most one banner is active at any time.

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::banner::{Banner, CreateBanner, UpdateBanner},
    repository::Repository,
};

#[derive(Clone)]
pub struct BannersService {
    repository: Repository,
}

impl BannersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Banner>> {
        self.repository.banners.list().await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Banner> {
        self.repository
            .banners
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Banner not found".to_string()))
    }

    /// The banner currently shown, if any
    pub async fn active(&self) -> AppResult<Option<Banner>> {
        self.repository.banners.active().await
    }

    pub async fn create(&self, banner: CreateBanner) -> AppResult<Banner> {
        let banner = self.repository.banners.create(&banner).await?;
        tracing::info!("Banner {} created (active: {})", banner.id, banner.active);
        Ok(banner)
    }

    /// Update a banner; setting `active` to true deactivates every other banner
    pub async fn update(&self, id: Uuid, changes: UpdateBanner) -> AppResult<Banner> {
        let banner = self
            .repository
            .banners
            .update(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Banner not found".to_string()))?;
        tracing::info!("Banner {} updated", id);
        Ok(banner)
    }

    /// Make this banner the only active one
    pub async fn activate(&self, id: Uuid) -> AppResult<Banner> {
        let banner = self
            .repository
            .banners
            .activate(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Banner not found".to_string()))?;
        tracing::info!("Banner {} activated", id);
        Ok(banner)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.repository.banners.delete(id).await? {
            return Err(AppError::NotFound("Banner not found".to_string()));
        }
        tracing::info!("Banner {} deleted", id);
        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        self.repository.banners.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banner(title: &str, active: bool) -> CreateBanner {
        CreateBanner {
            title: title.to_string(),
            subtitle: None,
            image_url: format!("https://img.example/{}.png", title),
            active: Some(active),
        }
    }

    async fn active_count(service: &BannersService) -> usize {
        service.list().await.unwrap().iter().filter(|b| b.active).count()
    }

    #[tokio::test]
    async fn test_activation_leaves_exactly_one_active() {
        let service = BannersService::new(Repository::in_memory());
        let spring = service.create(banner("spring", true)).await.unwrap();
        let summer = service.create(banner("summer", false)).await.unwrap();
        let autumn = service.create(banner("autumn", true)).await.unwrap();

        assert_eq!(active_count(&service).await, 1);
        assert_eq!(service.active().await.unwrap().map(|b| b.id), Some(autumn.id));

        service.activate(summer.id).await.unwrap();
        assert_eq!(active_count(&service).await, 1);
        assert!(!service.get(spring.id).await.unwrap().active);
        assert_eq!(service.active().await.unwrap().map(|b| b.id), Some(summer.id));
    }

    #[tokio::test]
    async fn test_update_to_active_switches_banner() {
        let service = BannersService::new(Repository::in_memory());
        let first = service.create(banner("first", true)).await.unwrap();
        let second = service.create(banner("second", false)).await.unwrap();

        let updated = service
            .update(
                second.id,
                UpdateBanner {
                    active: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.active);
        assert!(!service.get(first.id).await.unwrap().active);
        assert_eq!(active_count(&service).await, 1);
    }

    #[tokio::test]
    async fn test_create_active_switches_off_current() {
        let service = BannersService::new(Repository::in_memory());
        let current = service.create(banner("current", true)).await.unwrap();

        let fresh = service.create(banner("fresh", true)).await.unwrap();
        assert!(fresh.active);
        assert!(!service.get(current.id).await.unwrap().active);
        assert_eq!(active_count(&service).await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_and_activate_keep_one_active() {
        let service = BannersService::new(Repository::in_memory());
        let mut existing = Vec::new();
        for i in 0..5 {
            existing.push(service.create(banner(&format!("old{}", i), false)).await.unwrap().id);
        }

        let mut handles = Vec::new();
        for (i, id) in existing.into_iter().enumerate() {
            let activating = service.clone();
            handles.push(tokio::spawn(async move { activating.activate(id).await.map(|_| ()) }));
            let creating = service.clone();
            handles.push(tokio::spawn(async move {
                creating.create(banner(&format!("new{}", i), true)).await.map(|_| ())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(active_count(&service).await, 1);
        assert!(service.active().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_banner() {
        let service = BannersService::new(Repository::in_memory());
        let err = service.activate(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = service.delete(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(service.active().await.unwrap().is_none());
    }
}
