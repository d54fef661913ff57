//! Signup, login, and current-identity handlers.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use placetrack_core::{IdentityRecord, PublicIdentity, Role, validate_credentials};

use super::AppJson;
use crate::auth::AuthContext;
use crate::error::{ApiError, AuthFailure};
use crate::server::AppState;

/// Signup request body.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    /// Email address, the login key.
    pub email: String,
    /// Plaintext password, hashed before storage.
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Response carrying a freshly issued token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// Always `true`.
    pub success: bool,
    /// The access token.
    pub token: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
    /// The identity the token was issued for.
    pub user: PublicIdentity,
}

/// Response carrying the caller's identity.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// Always `true`.
    pub success: bool,
    /// The resolved identity.
    pub user: PublicIdentity,
}

/// Create a new identity and issue its first token.
///
/// New signups always get the default role; elevation happens through
/// the admin role route.
///
/// # Errors
///
/// Returns a validation failure for bad fields, or a duplicate-key
/// failure if the email is taken.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_credentials(&request.email, &request.password)?;

    // Existence probe; the store enforces uniqueness on insert as well.
    if state.store.find_by_email(&request.email).await?.is_some() {
        return Err(ApiError::Duplicate {
            field: "email".to_string(),
        });
    }

    let record = IdentityRecord::new(request.email, &request.password, Role::Student)?;
    state.store.insert(&record).await?;

    let (token, expires_at) = state.codec.issue(&record.id, record.role)?;

    tracing::info!(subject = %record.id, "identity created");

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            success: true,
            token,
            expires_at,
            user: record.to_public(),
        }),
    ))
}

/// Verify credentials and issue a token.
///
/// An unknown email and a wrong password are indistinguishable to the
/// client.
///
/// # Errors
///
/// Returns the generic authentication rejection on any credential
/// mismatch.
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let identity = state
        .store
        .find_by_email(&request.email)
        .await?
        .ok_or(ApiError::Unauthorized(AuthFailure::BadCredentials))?;

    identity.verify_password(&request.password)?;

    state.store.touch_login(&identity.id).await?;

    let (token, expires_at) = state.codec.issue(&identity.id, identity.role)?;

    tracing::info!(subject = %identity.id, "login");

    Ok(Json(TokenResponse {
        success: true,
        token,
        expires_at,
        user: identity.to_public(),
    }))
}

/// Return the caller's resolved identity.
pub async fn me(context: AuthContext) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        user: context.identity.to_public(),
    })
}
