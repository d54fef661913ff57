//! HTTP API surface.
//!
//! Routes declare their role allow-list at registration through the
//! extractors in their handler signatures; nothing is inferred from the
//! URL shape.

pub mod auth;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    extract::{FromRequest, Request, rejection::JsonRejection},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::{ApiError, normalize};
use crate::server::AppState;

/// JSON body extractor whose rejection goes through the normalized
/// error shape instead of axum's default.
#[derive(Debug, Clone)]
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::Validation(vec![rejection.body_text()])),
        }
    }
}

/// Build the API router.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/users", get(users::list))
        .route("/api/users/{id}", get(users::get))
        .route("/api/users/{id}/role", put(users::update_role))
        .layer(middleware::from_fn_with_state(state.clone(), normalize))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
