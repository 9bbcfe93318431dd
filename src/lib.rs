//! BookNest lending library server
//!
//! REST JSON API for a small lending library: a book catalog, borrowing and
//! returning copies, reader reviews with per-book rating summaries, banners,
//! categories and dashboard statistics.

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub verifier: Arc<dyn auth::TokenVerifier>,
}
