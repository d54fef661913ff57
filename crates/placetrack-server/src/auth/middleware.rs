//! Request authentication and role-gated authorization.
//!
//! [`AuthContext`] resolves a bearer token to a live identity record.
//! [`RequireRole`] wraps it with a route allow-list; it can only be
//! constructed from an already-authenticated context, so authorization
//! cannot run before authentication.

use std::marker::PhantomData;
use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use placetrack_core::{IdentityRecord, Role};

use super::token::TokenCodec;
use crate::error::{ApiError, AuthFailure};
use crate::server::AppState;

/// Per-request authorization context.
///
/// Holds the resolved identity and the raw token for the duration of one
/// request. Handlers read it; nothing mutates it.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The resolved identity record.
    pub identity: IdentityRecord,
    /// The raw token string as presented.
    pub token: String,
}

impl AuthContext {
    /// Get the subject's identity ID.
    #[must_use]
    pub fn subject_id(&self) -> &str {
        &self.identity.id
    }

    /// Get the subject's current role, as stored.
    #[must_use]
    pub fn role(&self) -> Role {
        self.identity.role
    }

    /// Check if the subject is an admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.identity.role.is_admin()
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = Arc::<AppState>::from_ref(state);

        // Reject before any store traffic when no bearer token is
        // presented at all.
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized(AuthFailure::MissingCredentials))?;

        let token = TokenCodec::extract_from_header(header)
            .ok_or(ApiError::Unauthorized(AuthFailure::MissingCredentials))?;

        let claims = app.codec.verify(token).map_err(|e| {
            ApiError::Unauthorized(match e {
                super::token::TokenError::Expired => AuthFailure::ExpiredToken,
                _ => AuthFailure::InvalidToken,
            })
        })?;

        // Bounded-time lookup: a slow store fails the request instead of
        // hanging it. Dropping this future mid-flight has no side
        // effects, so a client disconnect never half-authenticates.
        let lookup = tokio::time::timeout(
            app.config.auth.lookup_timeout(),
            app.store.find_by_id(&claims.sub),
        );

        let identity = match lookup.await {
            Err(_) => {
                tracing::warn!(subject = %claims.sub, "identity lookup exceeded ceiling");
                return Err(ApiError::Unauthorized(AuthFailure::LookupTimeout));
            }
            Ok(Err(e)) => {
                return Err(ApiError::Unauthorized(AuthFailure::Store(e.to_string())));
            }
            // Covers deleted accounts whose tokens are still in flight.
            Ok(Ok(None)) => {
                return Err(ApiError::Unauthorized(AuthFailure::UnknownSubject));
            }
            Ok(Ok(Some(identity))) => identity,
        };

        Ok(Self {
            identity,
            token: token.to_string(),
        })
    }
}

/// A route's role allow-list, fixed at compile time.
pub trait RolePolicy: Send + Sync + 'static {
    /// Roles permitted by this policy.
    const ALLOWED: &'static [Role];
}

/// Allow-list: admin only.
#[derive(Debug, Clone, Copy)]
pub struct AdminOnly;

impl RolePolicy for AdminOnly {
    const ALLOWED: &'static [Role] = &[Role::Admin];
}

/// Allow-list: admin and placement coordinator.
#[derive(Debug, Clone, Copy)]
pub struct Coordination;

impl RolePolicy for Coordination {
    const ALLOWED: &'static [Role] = &[Role::Admin, Role::PlacementCoordinator];
}

/// Extractor enforcing a route's allow-list.
///
/// Declared in the handler signature at route registration; resolves the
/// caller through [`AuthContext`] first, then checks membership against
/// `P::ALLOWED`. A role outside the list rejects with 403.
#[derive(Debug, Clone)]
pub struct RequireRole<P: RolePolicy> {
    /// The authenticated context that passed the allow-list.
    pub context: AuthContext,
    _policy: PhantomData<P>,
}

/// Admin-only routes.
pub type RequireAdmin = RequireRole<AdminOnly>;

/// Coordination routes (admin or placement coordinator).
pub type RequireCoordination = RequireRole<Coordination>;

impl<S, P> FromRequestParts<S> for RequireRole<P>
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
    P: RolePolicy,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = AuthContext::from_request_parts(parts, state).await?;

        if P::ALLOWED.contains(&context.role()) {
            Ok(Self {
                context,
                _policy: PhantomData,
            })
        } else {
            Err(ApiError::Forbidden)
        }
    }
}
