//! Review service. Every write that touches a book's reviews refreshes that
//! book's rating summary.

use uuid::Uuid;

use crate::{
    auth::Identity,
    error::{AppError, AppResult},
    models::review::{
        CreateReview, NewReview, Review, ReviewAuthor, ReviewQuery, UpdateReview, DEFAULT_REVIEW_RATING,
    },
    repository::Repository,
};

use super::ratings::RatingAggregator;

#[derive(Clone)]
pub struct ReviewsService {
    repository: Repository,
    ratings: RatingAggregator,
}

impl ReviewsService {
    pub fn new(repository: Repository, ratings: RatingAggregator) -> Self {
        Self { repository, ratings }
    }

    /// List reviews, newest first
    pub async fn list(&self, query: &ReviewQuery) -> AppResult<Vec<Review>> {
        self.repository.reviews.list(query).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Review> {
        self.repository
            .reviews
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))
    }

    /// Create a review owned by the caller
    pub async fn create(&self, caller: &Identity, request: CreateReview) -> AppResult<Review> {
        let owner = caller.require_email()?.to_lowercase();
        if let Some(ref email) = request.author.email {
            if !caller.can_act_for(email) {
                return Err(AppError::Authorization(
                    "Reviews can only be posted under your own email".to_string(),
                ));
            }
        }

        let title = required_text(&request.title, "Title is required")?;
        let content = required_text(&request.content, "Content is required")?;
        if let Some(book_id) = request.book_id {
            self.ensure_book_exists(book_id).await?;
        }

        let review = NewReview {
            title,
            content,
            author: ReviewAuthor {
                name: request.author.name.trim().to_string(),
                email: request.author.email.map(|e| e.trim().to_lowercase()).unwrap_or(owner),
                photo_url: request.author.photo_url.unwrap_or_default(),
            },
            rating: request.rating.unwrap_or(DEFAULT_REVIEW_RATING),
            category: request.category.unwrap_or_default(),
            book_id: request.book_id,
        };

        let review = self.repository.reviews.create(&review).await?;
        tracing::info!("Review {} created by {}", review.id, review.author.email);

        if let Some(book_id) = review.book_id {
            self.ratings.recompute(book_id).await?;
        }
        Ok(review)
    }

    /// Update a review; only its author or an admin may do so
    pub async fn update(&self, caller: &Identity, id: Uuid, mut changes: UpdateReview) -> AppResult<Review> {
        let existing = self.get(id).await?;
        self.ensure_owner(caller, &existing)?;

        changes.title = changes
            .title
            .as_deref()
            .map(|t| required_text(t, "Title cannot be empty"))
            .transpose()?;
        changes.content = changes
            .content
            .as_deref()
            .map(|c| required_text(c, "Content cannot be empty"))
            .transpose()?;
        if let Some(book_id) = changes.book_id {
            if existing.book_id != Some(book_id) {
                self.ensure_book_exists(book_id).await?;
            }
        }

        let review = self
            .repository
            .reviews
            .update(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
        tracing::info!("Review {} updated", id);

        if let Some(book_id) = review.book_id {
            self.ratings.recompute(book_id).await?;
        }
        if let Some(previous) = existing.book_id {
            if review.book_id != Some(previous) {
                self.ratings.recompute(previous).await?;
            }
        }
        Ok(review)
    }

    /// Delete a review; only its author or an admin may do so
    pub async fn delete(&self, caller: &Identity, id: Uuid) -> AppResult<()> {
        let existing = self.get(id).await?;
        self.ensure_owner(caller, &existing)?;

        let removed = self
            .repository
            .reviews
            .delete(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;
        tracing::info!("Review {} deleted", id);

        if let Some(book_id) = removed.book_id {
            self.ratings.recompute(book_id).await?;
        }
        Ok(())
    }

    fn ensure_owner(&self, caller: &Identity, review: &Review) -> AppResult<()> {
        if caller.can_act_for(&review.author.email) {
            Ok(())
        } else {
            Err(AppError::Authorization("You can only modify your own reviews".to_string()))
        }
    }

    async fn ensure_book_exists(&self, book_id: Uuid) -> AppResult<()> {
        match self.repository.books.get(book_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("Book with id {} not found", book_id))),
        }
    }
}

fn required_text(value: &str, message: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        book::{CreateBook, NewBook},
        review::{CreateReviewAuthor, ReviewCategory},
    };

    fn reader(email: &str) -> Identity {
        Identity {
            uid: format!("uid-{}", email),
            email: Some(email.to_string()),
            name: None,
            picture: None,
            role: None,
        }
    }

    fn admin() -> Identity {
        Identity {
            role: Some("admin".to_string()),
            ..reader("admin@x.com")
        }
    }

    fn request(book_id: Option<Uuid>, rating: i32) -> CreateReview {
        CreateReview {
            title: " Great read ".to_string(),
            content: "Loved it".to_string(),
            author: CreateReviewAuthor {
                name: "Ana".to_string(),
                email: None,
                photo_url: None,
            },
            rating: Some(rating),
            category: None,
            book_id,
        }
    }

    async fn setup() -> (ReviewsService, Repository, Uuid) {
        let repository = Repository::in_memory();
        let book = repository
            .books
            .create(&NewBook::from(CreateBook {
                title: "Dune".to_string(),
                quantity: Some(1),
                ..Default::default()
            }))
            .await
            .unwrap();
        let service = ReviewsService::new(repository.clone(), RatingAggregator::new(repository.clone()));
        (service, repository, book.id)
    }

    async fn rating_of(repository: &Repository, id: Uuid) -> (f64, i32) {
        let book = repository.books.get(id).await.unwrap().unwrap();
        (book.average_rating, book.review_count)
    }

    #[tokio::test]
    async fn test_create_fills_author_and_refreshes_rating() {
        let (reviews, repository, book_id) = setup().await;

        let first = reviews.create(&reader("ana@x.com"), request(Some(book_id), 5)).await.unwrap();
        assert_eq!(first.title, "Great read");
        assert_eq!(first.author.email, "ana@x.com");
        assert_eq!(first.author.photo_url, "");
        assert_eq!(first.category, ReviewCategory::Review);

        reviews.create(&reader("bo@x.com"), request(Some(book_id), 4)).await.unwrap();
        assert_eq!(rating_of(&repository, book_id).await, (4.5, 2));
    }

    #[tokio::test]
    async fn test_create_for_missing_book() {
        let (reviews, _, _) = setup().await;
        let err = reviews
            .create(&reader("ana@x.com"), request(Some(Uuid::new_v4()), 5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_blank_title_is_rejected() {
        let (reviews, _, _) = setup().await;
        let mut blank = request(None, 3);
        blank.title = "   ".to_string();
        let err = reviews.create(&reader("ana@x.com"), blank).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_only_author_or_admin_may_modify() {
        let (reviews, _, book_id) = setup().await;
        let review = reviews.create(&reader("ana@x.com"), request(Some(book_id), 5)).await.unwrap();

        let err = reviews
            .update(&reader("bo@x.com"), review.id, UpdateReview::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let err = reviews.delete(&reader("bo@x.com"), review.id).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        reviews.delete(&admin(), review.id).await.unwrap();
        let err = reviews.get(review.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_moving_a_review_refreshes_both_books() {
        let (reviews, repository, first_book) = setup().await;
        let second_book = repository
            .books
            .create(&NewBook::from(CreateBook {
                title: "Emma".to_string(),
                ..Default::default()
            }))
            .await
            .unwrap()
            .id;

        let ana = reader("ana@x.com");
        let review = reviews.create(&ana, request(Some(first_book), 4)).await.unwrap();
        assert_eq!(rating_of(&repository, first_book).await, (4.0, 1));

        reviews
            .update(
                &ana,
                review.id,
                UpdateReview {
                    book_id: Some(second_book),
                    rating: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(rating_of(&repository, first_book).await, (0.0, 0));
        assert_eq!(rating_of(&repository, second_book).await, (2.0, 1));
    }

    #[tokio::test]
    async fn test_delete_refreshes_rating() {
        let (reviews, repository, book_id) = setup().await;
        let ana = reader("ana@x.com");
        let review = reviews.create(&ana, request(Some(book_id), 3)).await.unwrap();

        reviews.delete(&ana, review.id).await.unwrap();
        assert_eq!(rating_of(&repository, book_id).await, (0.0, 0));

        let err = reviews.delete(&ana, review.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
