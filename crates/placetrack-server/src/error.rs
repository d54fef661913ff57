//! Centralized error-to-response mapping.
//!
//! Every failure raised during request handling converges here: handlers
//! and extractors return [`ApiError`], which renders a stable JSON shape,
//! and the [`normalize`] middleware logs each failure with its request
//! context before the response leaves the server. No handler formats its
//! own error body.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use placetrack_core::StoreError;

use crate::auth::TokenError;
use crate::server::AppState;

/// Internal cause of an authentication rejection.
///
/// Clients always see one generic 401 body; this distinction exists only
/// for the log sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// No `Authorization` header, or no bearer scheme.
    MissingCredentials,
    /// Token failed parsing or signature verification.
    InvalidToken,
    /// Token expiry has passed.
    ExpiredToken,
    /// Token verified but no matching identity record exists.
    UnknownSubject,
    /// Presented credentials did not match a stored identity.
    BadCredentials,
    /// Identity lookup exceeded the configured ceiling.
    LookupTimeout,
    /// Identity lookup failed in the store backend.
    Store(String),
}

impl AuthFailure {
    /// Stable name for the log sink.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::InvalidToken => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::UnknownSubject => "unknown_subject",
            Self::BadCredentials => "bad_credentials",
            Self::LookupTimeout => "lookup_timeout",
            Self::Store(_) => "store_failure",
        }
    }
}

/// Request handling failures, mapped to wire responses in one place.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// One or more fields failed validation.
    #[error("Validation Error")]
    Validation(Vec<String>),

    /// The referenced resource does not exist or the reference is
    /// malformed.
    #[error("Resource not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("Duplicate {field}")]
    Duplicate {
        /// The field whose uniqueness constraint was violated.
        field: String,
    },

    /// A token failed structural verification outside the request
    /// authentication path.
    #[error("Invalid token")]
    MalformedToken,

    /// A token's expiry has passed.
    #[error("Token expired")]
    ExpiredToken,

    /// Request authentication failed. The cause is logged, never sent.
    #[error("Unauthorized")]
    Unauthorized(AuthFailure),

    /// The authenticated role is not on the route's allow-list.
    #[error("Forbidden")]
    Forbidden,

    /// Unclassified failure.
    #[error("{message}")]
    Internal {
        /// Client-facing message.
        message: String,
        /// Diagnostic detail: logged always, sent only in development.
        detail: Option<String>,
    },
}

impl ApiError {
    /// Unclassified failure with the generic client-facing message.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            message: "Internal Server Error".to_string(),
            detail: Some(detail.into()),
        }
    }

    /// Resolve this failure to its wire form.
    #[must_use]
    pub fn normalized(&self) -> NormalizedError {
        match self {
            Self::Validation(messages) => NormalizedError::new(
                StatusCode::BAD_REQUEST,
                "validation",
                "Validation Error",
                messages.clone(),
            ),
            Self::NotFound => NormalizedError::new(
                StatusCode::NOT_FOUND,
                "not_found",
                "Resource not found",
                vec!["Invalid ID format".to_string()],
            ),
            Self::Duplicate { field } => NormalizedError::new(
                StatusCode::BAD_REQUEST,
                "duplicate_key",
                format!("Duplicate {field}"),
                vec![format!("{field} already exists")],
            ),
            Self::MalformedToken => NormalizedError::new(
                StatusCode::UNAUTHORIZED,
                "malformed_token",
                "Invalid token",
                vec!["Authentication token is invalid".to_string()],
            ),
            Self::ExpiredToken => NormalizedError::new(
                StatusCode::UNAUTHORIZED,
                "token_expired",
                "Token expired",
                vec!["Authentication token has expired".to_string()],
            ),
            Self::Unauthorized(cause) => {
                let mut normalized = NormalizedError::new(
                    StatusCode::UNAUTHORIZED,
                    "unauthorized",
                    "Unauthorized",
                    vec!["Authentication required".to_string()],
                );
                normalized.cause = Some(cause.kind());
                if let AuthFailure::Store(detail) = cause {
                    normalized.detail = Some(detail.clone());
                }
                normalized
            }
            Self::Forbidden => NormalizedError::new(
                StatusCode::FORBIDDEN,
                "forbidden",
                "Forbidden",
                vec!["Insufficient role".to_string()],
            ),
            Self::Internal { message, detail } => {
                let mut normalized = NormalizedError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    message.clone(),
                    vec![message.clone()],
                );
                normalized.detail = detail.clone();
                normalized
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(messages) => Self::Validation(messages),
            StoreError::InvalidId(_) => Self::NotFound,
            StoreError::Duplicate { field } => Self::Duplicate { field },
            StoreError::InvalidCredentials => Self::Unauthorized(AuthFailure::BadCredentials),
            StoreError::Backend(detail) => Self::internal(detail),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => Self::MalformedToken,
            TokenError::Expired => Self::ExpiredToken,
            TokenError::Encoding(detail) => Self::internal(detail),
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Per-failure messages.
    pub errors: Vec<String>,
    /// Diagnostic detail. Present only in development mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// A failure resolved to wire form, kept on the response for the log
/// sink.
#[derive(Debug, Clone)]
pub struct NormalizedError {
    /// Response status.
    pub status: StatusCode,
    /// Stable failure name for the log sink.
    pub kind: &'static str,
    /// Authentication cause, when the failure is an auth rejection.
    pub cause: Option<&'static str>,
    /// Client-facing summary.
    pub message: String,
    /// Client-facing per-failure messages.
    pub errors: Vec<String>,
    /// Diagnostic detail: logged always, sent only in development.
    pub detail: Option<String>,
}

impl NormalizedError {
    fn new(
        status: StatusCode,
        kind: &'static str,
        message: impl Into<String>,
        errors: Vec<String>,
    ) -> Self {
        Self {
            status,
            kind,
            cause: None,
            message: message.into(),
            errors,
            detail: None,
        }
    }

    /// Render the response body.
    #[must_use]
    pub fn body(&self, include_stack: bool) -> ErrorBody {
        ErrorBody {
            success: false,
            message: self.message.clone(),
            errors: self.errors.clone(),
            stack: if include_stack { self.detail.clone() } else { None },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let normalized = self.normalized();
        let mut response =
            (normalized.status, Json(normalized.body(false))).into_response();
        response.extensions_mut().insert(normalized);
        response
    }
}

/// Log every normalized failure and gate diagnostic detail by runtime
/// mode.
///
/// Runs outside the routes so it observes every [`ApiError`] response,
/// whichever handler or extractor produced it.
pub async fn normalize(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);

    let response = next.run(request).await;

    let Some(normalized) = response.extensions().get::<NormalizedError>().cloned() else {
        return response;
    };

    tracing::error!(
        status = normalized.status.as_u16(),
        kind = normalized.kind,
        cause = normalized.cause,
        detail = normalized.detail.as_deref(),
        method = %method,
        path = %path,
        client = ?client,
        "{}",
        normalized.message,
    );

    // Development mode exposes diagnostic detail on unclassified
    // failures; every other mode sends the body untouched.
    if state.config.mode.is_development()
        && normalized.status.is_server_error()
        && normalized.detail.is_some()
    {
        let mut response =
            (normalized.status, Json(normalized.body(true))).into_response();
        response.extensions_mut().insert(normalized);
        return response;
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn body_json(err: &ApiError, include_stack: bool) -> serde_json::Value {
        serde_json::to_value(err.normalized().body(include_stack)).unwrap()
    }

    #[test]
    fn test_duplicate_key_shape() {
        let err = ApiError::Duplicate {
            field: "email".to_string(),
        };
        let normalized = err.normalized();
        assert_eq!(normalized.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(&err, false),
            serde_json::json!({
                "success": false,
                "message": "Duplicate email",
                "errors": ["email already exists"],
            })
        );
    }

    #[test]
    fn test_validation_shape() {
        let err = ApiError::Validation(vec![
            "email is required".to_string(),
            "password must be at least 6 characters".to_string(),
        ]);
        let normalized = err.normalized();
        assert_eq!(normalized.status, StatusCode::BAD_REQUEST);
        assert_eq!(normalized.message, "Validation Error");
        assert_eq!(normalized.errors.len(), 2);
    }

    #[test]
    fn test_token_rows() {
        let malformed = ApiError::MalformedToken.normalized();
        assert_eq!(malformed.status, StatusCode::UNAUTHORIZED);
        assert_eq!(malformed.message, "Invalid token");
        assert_eq!(malformed.errors, vec!["Authentication token is invalid"]);

        let expired = ApiError::ExpiredToken.normalized();
        assert_eq!(expired.status, StatusCode::UNAUTHORIZED);
        assert_eq!(expired.message, "Token expired");
        assert_eq!(expired.errors, vec!["Authentication token has expired"]);
    }

    #[test]
    fn test_auth_rejections_share_one_body() {
        let causes = [
            AuthFailure::MissingCredentials,
            AuthFailure::InvalidToken,
            AuthFailure::ExpiredToken,
            AuthFailure::UnknownSubject,
            AuthFailure::LookupTimeout,
        ];

        for cause in causes {
            let normalized = ApiError::Unauthorized(cause).normalized();
            assert_eq!(normalized.status, StatusCode::UNAUTHORIZED);
            assert_eq!(normalized.message, "Unauthorized");
            assert_eq!(normalized.errors, vec!["Authentication required"]);
        }
    }

    #[test]
    fn test_lookup_timeout_logged_distinctly() {
        let normalized = ApiError::Unauthorized(AuthFailure::LookupTimeout).normalized();
        assert_eq!(normalized.cause, Some("lookup_timeout"));
    }

    #[test]
    fn test_store_error_mapping() {
        assert_eq!(
            ApiError::from(StoreError::InvalidId("nope".to_string())),
            ApiError::NotFound
        );
        assert_eq!(
            ApiError::from(StoreError::Duplicate {
                field: "email".to_string()
            }),
            ApiError::Duplicate {
                field: "email".to_string()
            }
        );
        match ApiError::from(StoreError::Backend("sled exploded".to_string())) {
            ApiError::Internal { message, detail } => {
                assert_eq!(message, "Internal Server Error");
                assert_eq!(detail.as_deref(), Some("sled exploded"));
            }
            other => panic!("expected internal, got {other:?}"),
        }
    }

    #[test]
    fn test_stack_gated_by_flag() {
        let err = ApiError::internal("boom at line 42");

        let without = body_json(&err, false);
        assert!(without.get("stack").is_none());
        assert_eq!(without["message"], "Internal Server Error");

        let with = body_json(&err, true);
        assert_eq!(with["stack"], "boom at line 42");
    }
}
