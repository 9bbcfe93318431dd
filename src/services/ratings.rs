//! Rating aggregation: keeps a book's derived rating fields in line with its reviews

use uuid::Uuid;

use crate::{error::AppResult, models::review::RatingSummary, repository::Repository};

/// Mean rating rounded to one decimal (half-up) and review count
pub fn summarize(ratings: &[i32]) -> RatingSummary {
    if ratings.is_empty() {
        return RatingSummary {
            average_rating: 0.0,
            review_count: 0,
        };
    }

    let total: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    let mean = total as f64 / ratings.len() as f64;

    RatingSummary {
        average_rating: (mean * 10.0).round() / 10.0,
        review_count: i32::try_from(ratings.len()).unwrap_or(i32::MAX),
    }
}

#[derive(Clone)]
pub struct RatingAggregator {
    repository: Repository,
}

impl RatingAggregator {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Recompute and store the rating summary of a book.
    ///
    /// A book that no longer exists is skipped: its reviews may outlive it.
    pub async fn recompute(&self, book_id: Uuid) -> AppResult<RatingSummary> {
        let ratings = self.repository.reviews.ratings_for_book(book_id).await?;
        let summary = summarize(&ratings);

        if self.repository.books.set_rating_summary(book_id, &summary).await? {
            tracing::info!(
                "Book {} rating recomputed: {:.1} over {} review(s)",
                book_id,
                summary.average_rating,
                summary.review_count
            );
        } else {
            tracing::debug!("Skipping rating update for missing book {}", book_id);
        }

        Ok(summary)
    }
}
