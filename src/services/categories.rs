//! Category service. Names are unique regardless of letter case.

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::category::{Category, CreateCategory, UpdateCategory},
    repository::Repository,
};

#[derive(Clone)]
pub struct CategoriesService {
    repository: Repository,
}

impl CategoriesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List categories ordered by name
    pub async fn list(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Category> {
        self.repository
            .categories
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
    }

    pub async fn create(&self, mut category: CreateCategory) -> AppResult<Category> {
        category.name = category_name(&category.name)?;
        if self.repository.categories.find_by_name(&category.name).await?.is_some() {
            return Err(AppError::Conflict("Category already exists".to_string()));
        }

        let category = self.repository.categories.create(&category).await?;
        tracing::info!("Category created: {} ({})", category.name, category.id);
        Ok(category)
    }

    pub async fn update(&self, id: Uuid, mut changes: UpdateCategory) -> AppResult<Category> {
        if let Some(name) = changes.name.take() {
            let name = category_name(&name)?;
            if let Some(existing) = self.repository.categories.find_by_name(&name).await? {
                if existing.id != id {
                    return Err(AppError::Conflict("Category already exists".to_string()));
                }
            }
            changes.name = Some(name);
        }

        let category = self
            .repository
            .categories
            .update(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;
        tracing::info!("Category updated: {}", id);
        Ok(category)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.repository.categories.delete(id).await? {
            return Err(AppError::NotFound("Category not found".to_string()));
        }
        tracing::info!("Category deleted: {}", id);
        Ok(())
    }
}

fn category_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Category name is required".to_string()));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> CreateCategory {
        CreateCategory {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_names_are_unique_ignoring_case() {
        let service = CategoriesService::new(Repository::in_memory());
        let fiction = service.create(named(" Fiction ")).await.unwrap();
        assert_eq!(fiction.name, "Fiction");

        let err = service.create(named("fiction")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_checks_other_categories_only() {
        let service = CategoriesService::new(Repository::in_memory());
        let fiction = service.create(named("Fiction")).await.unwrap();
        service.create(named("History")).await.unwrap();

        let renamed = service
            .update(
                fiction.id,
                UpdateCategory {
                    name: Some("FICTION".to_string()),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "FICTION");

        let err = service
            .update(
                fiction.id,
                UpdateCategory {
                    name: Some("history".to_string()),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_name() {
        let service = CategoriesService::new(Repository::in_memory());
        for name in ["poetry", "Drama", "biography"] {
            service.create(named(name)).await.unwrap();
        }
        let names: Vec<_> = service.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["biography", "Drama", "poetry"]);
    }

    #[tokio::test]
    async fn test_blank_name_and_missing_category() {
        let service = CategoriesService::new(Repository::in_memory());
        let err = service.create(named("  ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = service.delete(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
