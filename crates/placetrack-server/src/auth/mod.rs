//! Authentication and authorization.
//!
//! This module provides:
//! - Access token issuance and verification
//! - The request authentication extractor and role allow-list gates
//! - The sled-backed identity store

mod middleware;
mod store;
mod token;

pub use middleware::{
    AdminOnly, AuthContext, Coordination, RequireAdmin, RequireCoordination, RequireRole,
    RolePolicy,
};
pub use store::SledIdentityStore;
pub use token::{Claims, TOKEN_TTL_SECS, TokenCodec, TokenError};
