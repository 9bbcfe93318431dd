//! Data models for BookNest

pub mod banner;
pub mod book;
pub mod category;
pub mod loan;
pub mod review;

// Re-export commonly used types
pub use banner::Banner;
pub use book::Book;
pub use category::Category;
pub use loan::{BorrowRecord, BorrowedBook};
pub use review::{RatingSummary, Review, ReviewCategory};
