//! Catalog service for books

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, NewBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List books matching the filters, newest first
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.list(query).await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.repository
            .books
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Create a new book; blank fields get their default values
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        let book = self.repository.books.create(&NewBook::from(book)).await?;
        tracing::info!("Book created: {} ({})", book.title, book.id);
        Ok(book)
    }

    /// Update an existing book
    pub async fn update_book(&self, id: Uuid, changes: UpdateBook) -> AppResult<Book> {
        let changes = changes.normalized();
        let book = self
            .repository
            .books
            .update(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        tracing::info!("Book updated: {}", id);
        Ok(book)
    }

    /// Delete a book along with its reviews and loan records
    pub async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        if !self.repository.books.delete(id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        tracing::info!("Book deleted: {}", id);
        Ok(())
    }

    /// Most recently added books
    pub async fn recent_books(&self, limit: i64) -> AppResult<Vec<Book>> {
        self.repository.books.recent(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        book::{DEFAULT_CATEGORY, UNKNOWN_AUTHOR},
        review::{NewReview, ReviewAuthor, ReviewCategory},
    };
    use chrono::Utc;

    fn service() -> CatalogService {
        CatalogService::new(Repository::in_memory())
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let catalog = service();
        let book = catalog
            .create_book(CreateBook {
                title: "  Dune ".to_string(),
                quantity: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(book.title, "Dune");
        assert_eq!(book.author, UNKNOWN_AUTHOR);
        assert_eq!(book.category, DEFAULT_CATEGORY);
        assert!(book.available);
        assert_eq!(book.review_count, 0);
        assert_eq!(book.average_rating, 0.0);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_filtered() {
        let catalog = service();
        for (title, quantity) in [("Emma", 0), ("Dune", 1), ("Ulysses", 3)] {
            catalog
                .create_book(CreateBook {
                    title: title.to_string(),
                    quantity: Some(quantity),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let all = catalog.list_books(&BookQuery::default()).await.unwrap();
        let titles: Vec<_> = all.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["Ulysses", "Dune", "Emma"]);

        let on_shelf = catalog
            .list_books(&BookQuery {
                available: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(on_shelf.len(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_book() {
        let catalog = service();
        let missing = Uuid::new_v4();

        let err = catalog.update_book(missing, UpdateBook::default()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = catalog.delete_book(missing).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_reviews_and_loans() {
        let repository = Repository::in_memory();
        let catalog = CatalogService::new(repository.clone());
        let book = catalog
            .create_book(CreateBook {
                title: "Dune".to_string(),
                quantity: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        let other = catalog
            .create_book(CreateBook {
                title: "Emma".to_string(),
                quantity: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();

        repository
            .reviews
            .create(&NewReview {
                title: "Desert power".to_string(),
                content: "A classic".to_string(),
                author: ReviewAuthor {
                    name: "Ana".to_string(),
                    email: "ana@x.com".to_string(),
                    photo_url: String::new(),
                },
                rating: 5,
                category: ReviewCategory::Review,
                book_id: Some(book.id),
            })
            .await
            .unwrap();
        repository.loans.checkout("ana@x.com", book.id, Utc::now()).await.unwrap();
        repository.loans.checkout("ana@x.com", other.id, Utc::now()).await.unwrap();

        catalog.delete_book(book.id).await.unwrap();

        assert!(repository.reviews.ratings_for_book(book.id).await.unwrap().is_empty());
        assert_eq!(repository.loans.count_outstanding().await.unwrap(), 1);
        assert!(repository.loans.find_outstanding("ana@x.com", book.id).await.unwrap().is_none());
        assert!(repository.books.get(book.id).await.unwrap().is_none());
        assert_eq!(catalog.get_book(other.id).await.unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn test_update_quantity_recomputes_availability() {
        let catalog = service();
        let book = catalog
            .create_book(CreateBook {
                title: "Dune".to_string(),
                quantity: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();

        let updated = catalog
            .update_book(
                book.id,
                UpdateBook {
                    quantity: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.quantity, 0);
        assert!(!updated.available);
        assert_eq!(updated.title, "Dune");
    }
}
