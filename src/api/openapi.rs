//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{banners, books, categories, dashboard, health, loans, reviews};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "BookNest API",
        version = "0.1.0",
        description = "Lending library REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Loans
        loans::borrow_book,
        loans::list_borrowed,
        loans::return_book,
        loans::restore_quantity,
        // Reviews
        reviews::list_reviews,
        reviews::get_review,
        reviews::create_review,
        reviews::update_review,
        reviews::delete_review,
        // Banners
        banners::list_banners,
        banners::get_active_banner,
        banners::get_banner,
        banners::create_banner,
        banners::update_banner,
        banners::activate_banner,
        banners::delete_banner,
        // Categories
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        // Dashboard
        dashboard::get_stats,
        dashboard::recent_books,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::RestoreQuantityRequest,
            // Loans
            crate::models::loan::BorrowRecord,
            crate::models::loan::BorrowRequest,
            crate::models::loan::BorrowedBook,
            loans::ReturnResponse,
            // Reviews
            crate::models::review::Review,
            crate::models::review::ReviewAuthor,
            crate::models::review::ReviewCategory,
            crate::models::review::CreateReview,
            crate::models::review::CreateReviewAuthor,
            crate::models::review::UpdateReview,
            // Banners
            crate::models::banner::Banner,
            crate::models::banner::CreateBanner,
            crate::models::banner::UpdateBanner,
            // Categories
            crate::models::category::Category,
            crate::models::category::CreateCategory,
            crate::models::category::UpdateCategory,
            // Dashboard
            dashboard::DashboardStats,
            // Health
            health::HealthResponse,
            // Common
            crate::api::MessageResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Book catalog"),
        (name = "loans", description = "Borrowing and returns"),
        (name = "reviews", description = "Reader reviews"),
        (name = "banners", description = "Promotional banners"),
        (name = "categories", description = "Book categories"),
        (name = "dashboard", description = "Admin dashboard statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
