//! Role-gated identity administration handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use placetrack_core::{PublicIdentity, Role};

use super::AppJson;
use crate::auth::{RequireAdmin, RequireCoordination};
use crate::error::ApiError;
use crate::server::AppState;

/// Response listing identities.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    /// Always `true`.
    pub success: bool,
    /// All identity records, without credential hashes.
    pub users: Vec<PublicIdentity>,
    /// Total record count.
    pub total: usize,
}

/// Response carrying a single identity.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// Always `true`.
    pub success: bool,
    /// The identity record, without its credential hash.
    pub user: PublicIdentity,
}

/// Role update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    /// The role to grant.
    pub role: Role,
}

/// List all identities. Admin only.
///
/// # Errors
///
/// Returns error if the store fails.
pub async fn list(
    _gate: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListResponse>, ApiError> {
    let records = state.store.list().await?;
    let users: Vec<PublicIdentity> = records.iter().map(|r| r.to_public()).collect();
    let total = users.len();

    Ok(Json(ListResponse {
        success: true,
        users,
        total,
    }))
}

/// Fetch one identity. Admin or placement coordinator.
///
/// # Errors
///
/// Returns a not-found failure for a malformed or unknown reference.
pub async fn get(
    _gate: RequireCoordination,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let identity = state
        .store
        .find_by_id(&id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(UserResponse {
        success: true,
        user: identity.to_public(),
    }))
}

/// Replace an identity's role. Admin only.
///
/// Tokens already issued keep their role snapshot until they expire;
/// the next authenticated request after that re-reads the stored role.
///
/// # Errors
///
/// Returns a not-found failure for a malformed or unknown reference.
pub async fn update_role(
    gate: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateRoleRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let updated = state
        .store
        .update_role(&id, request.role)
        .await?
        .ok_or(ApiError::NotFound)?;

    tracing::info!(
        subject = %updated.id,
        role = %updated.role,
        by = %gate.context.subject_id(),
        "role updated",
    );

    Ok(Json(UserResponse {
        success: true,
        user: updated.to_public(),
    }))
}
