//! API handlers for BookNest REST endpoints

pub mod banners;
pub mod books;
pub mod categories;
pub mod dashboard;
pub mod health;
pub mod loans;
pub mod openapi;
pub mod reviews;

use std::time::Duration;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{Identity, TokenError},
    error::{AppError, AppResult},
    AppState,
};

/// Extractor for the caller identity carried by a bearer token
pub struct AuthenticatedUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let identity = state.verifier.verify(token).await.map_err(|e| match e {
            TokenError::Invalid(reason) => {
                tracing::warn!("Rejected bearer token: {}", reason);
                AppError::Authorization("Invalid or expired token".to_string())
            }
            TokenError::Misconfigured(reason) => AppError::Internal(reason),
        })?;

        Ok(AuthenticatedUser(identity))
    }
}

/// JSON body extractor that also runs `validator` rules
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| match rejection {
                JsonRejection::JsonDataError(e) => AppError::Validation(e.body_text()),
                other => AppError::BadRequest(other.body_text()),
            })?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Parse a path identifier. A malformed id cannot name a stored document,
/// so it is reported as not found.
pub fn parse_id(raw: &str, what: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::NotFound(format!("{} not found", what)))
}

/// Plain acknowledgement body
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Build the application router with every route and the HTTP middleware
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let timeout = TimeoutLayer::new(Duration::from_secs(state.config.server.request_timeout_secs));

    let routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book).put(books::update_book).delete(books::delete_book),
        )
        // Loans
        .route("/borrow", post(loans::borrow_book))
        .route("/borrowed", get(loans::list_borrowed))
        .route("/borrowed/:id", axum::routing::delete(loans::return_book))
        .route("/book/return", put(loans::restore_quantity))
        // Reviews
        .route("/reviews", get(reviews::list_reviews).post(reviews::create_review))
        .route(
            "/reviews/:id",
            get(reviews::get_review)
                .put(reviews::update_review)
                .delete(reviews::delete_review),
        )
        // Banners
        .route("/banners", get(banners::list_banners).post(banners::create_banner))
        .route("/banners/active", get(banners::get_active_banner))
        .route(
            "/banners/:id",
            get(banners::get_banner)
                .put(banners::update_banner)
                .delete(banners::delete_banner),
        )
        .route("/banners/:id/active", put(banners::activate_banner))
        // Categories
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:id",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        // Dashboard
        .route("/dashboard/stats", get(dashboard::get_stats))
        .route("/dashboard/recent-books", get(dashboard::recent_books))
        .with_state(state);

    routes
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(timeout)
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Method, Request as HttpRequest, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        auth::{MockTokenVerifier, TokenError},
        config::AppConfig,
        repository::Repository,
        services::Services,
    };

    fn identity(email: &str, role: Option<&str>) -> Identity {
        Identity {
            uid: format!("uid-{}", email),
            email: Some(email.to_string()),
            name: Some("Reader".to_string()),
            picture: None,
            role: role.map(str::to_string),
        }
    }

    fn app() -> Router {
        let mut verifier = MockTokenVerifier::new();
        verifier.expect_verify().returning(|token| match token {
            "reader-token" => Ok(identity("reader@x.com", None)),
            "other-token" => Ok(identity("other@x.com", None)),
            "admin-token" => Ok(identity("admin@x.com", Some("admin"))),
            _ => Err(TokenError::Invalid("bad signature".to_string())),
        });

        router(AppState {
            config: Arc::new(AppConfig::default()),
            services: Arc::new(Services::new(Repository::in_memory())),
            verifier: Arc::new(verifier),
        })
    }

    async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = HttpRequest::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn create_book(app: &Router, quantity: i32) -> String {
        let (status, book) = send(
            app,
            Method::POST,
            "/books",
            Some("admin-token"),
            Some(json!({ "title": "Dune", "author": "Herbert", "quantity": quantity })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        book["_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_missing_or_bad_token() {
        let app = app();
        let book = json!({ "title": "Dune" });

        let (status, body) = send(&app, Method::POST, "/books", None, Some(book.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");

        let (status, body) = send(&app, Method::POST, "/books", Some("forged"), Some(book)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Forbidden");
    }

    #[tokio::test]
    async fn test_borrow_and_return_flow() {
        let app = app();
        let book_id = create_book(&app, 2).await;
        let borrow = json!({ "userEmail": "reader@x.com", "bookId": book_id });

        let (status, record) = send(&app, Method::POST, "/borrow", Some("reader-token"), Some(borrow.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(record["returnDate"].is_null());

        let (_, book) = send(&app, Method::GET, &format!("/books/{}", book_id), None, None).await;
        assert_eq!(book["quantity"], 1);

        let (status, body) = send(&app, Method::POST, "/borrow", Some("reader-token"), Some(borrow)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "AlreadyBorrowed");

        let (status, borrowed) = send(&app, Method::GET, "/borrowed", Some("reader-token"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(borrowed.as_array().map(Vec::len), Some(1));
        assert_eq!(borrowed[0]["book"]["title"], "Dune");

        let record_id = record["_id"].as_str().unwrap();
        let uri = format!("/borrowed/{}", record_id);
        let (status, body) = send(&app, Method::DELETE, &uri, Some("reader-token"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["record"]["returnDate"].is_string());

        let (status, _) = send(&app, Method::DELETE, &uri, Some("reader-token"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, book) = send(&app, Method::GET, &format!("/books/{}", book_id), None, None).await;
        assert_eq!(book["quantity"], 2);
        assert_eq!(book["available"], true);
    }

    #[tokio::test]
    async fn test_borrowing_for_someone_else_is_forbidden() {
        let app = app();
        let book_id = create_book(&app, 1).await;
        let borrow = json!({ "userEmail": "other@x.com", "bookId": book_id });

        let (status, _) = send(&app, Method::POST, "/borrow", Some("reader-token"), Some(borrow.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::GET, "/borrowed?email=other@x.com", Some("reader-token"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::POST, "/borrow", Some("admin-token"), Some(borrow)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_blank_borrower_email_is_invalid() {
        let app = app();
        let book_id = create_book(&app, 1).await;
        let borrow = json!({ "userEmail": "   ", "bookId": book_id });

        let (status, body) = send(&app, Method::POST, "/borrow", Some("reader-token"), Some(borrow)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ValidationError");
    }

    #[tokio::test]
    async fn test_restore_quantity_without_token() {
        let app = app();
        let book_id = create_book(&app, 0).await;

        let (status, book) = send(&app, Method::PUT, "/book/return", None, Some(json!({ "bookId": book_id }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(book["quantity"], 1);

        let (status, _) = send(&app, Method::PUT, "/book/return", None, Some(json!({ "bookId": "nope" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_id_and_bodies() {
        let app = app();

        let (status, body) = send(&app, Method::GET, "/books/not-a-uuid", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NotFound");

        let (status, body) = send(
            &app,
            Method::POST,
            "/books",
            Some("admin-token"),
            Some(json!({ "title": "Dune", "quantity": -1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ValidationError");

        let request = HttpRequest::builder()
            .method(Method::POST)
            .uri("/categories")
            .header(AUTHORIZATION, "Bearer admin-token")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_review_ownership_and_rating() {
        let app = app();
        let book_id = create_book(&app, 1).await;

        let (status, review) = send(
            &app,
            Method::POST,
            "/reviews",
            Some("reader-token"),
            Some(json!({
                "title": "Classic",
                "content": "Worth it",
                "author": { "name": "Reader" },
                "rating": 4,
                "bookId": book_id
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(review["author"]["email"], "reader@x.com");

        let (_, book) = send(&app, Method::GET, &format!("/books/{}", book_id), None, None).await;
        assert_eq!(book["averageRating"], 4.0);
        assert_eq!(book["reviewCount"], 1);

        let uri = format!("/reviews/{}", review["_id"].as_str().unwrap());
        let (status, _) = send(&app, Method::PUT, &uri, Some("other-token"), Some(json!({ "rating": 1 }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, Method::DELETE, &uri, Some("reader-token"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, book) = send(&app, Method::GET, &format!("/books/{}", book_id), None, None).await;
        assert_eq!(book["reviewCount"], 0);
    }

    #[tokio::test]
    async fn test_banners_and_categories() {
        let app = app();

        let (status, _) = send(&app, Method::GET, "/banners/active", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, banner) = send(
            &app,
            Method::POST,
            "/banners",
            Some("admin-token"),
            Some(json!({ "title": "Spring", "imageUrl": "https://img.example/spring.png" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(banner["active"], false);

        let uri = format!("/banners/{}/active", banner["_id"].as_str().unwrap());
        let (status, _) = send(&app, Method::PUT, &uri, Some("admin-token"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, active) = send(&app, Method::GET, "/banners/active", None, None).await;
        assert_eq!(active["_id"], banner["_id"]);

        let (status, _) = send(&app, Method::POST, "/categories", Some("admin-token"), Some(json!({ "name": "Fiction" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(&app, Method::POST, "/categories", Some("admin-token"), Some(json!({ "name": "fiction" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Conflict");
    }

    #[tokio::test]
    async fn test_dashboard_stats() {
        let app = app();
        let book_id = create_book(&app, 3).await;
        send(
            &app,
            Method::POST,
            "/borrow",
            Some("reader-token"),
            Some(json!({ "userEmail": "reader@x.com", "bookId": book_id })),
        )
        .await;

        let (status, stats) = send(&app, Method::GET, "/dashboard/stats", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["totalBooks"], 1);
        assert_eq!(stats["activeLoans"], 1);
        assert_eq!(stats["totalBorrowers"], 1);

        let (status, recent) = send(&app, Method::GET, "/dashboard/recent-books?limit=3", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(recent.as_array().map(Vec::len), Some(1));
    }
}
