//! Credential store seam and failure taxonomy.
//!
//! The auth layer consults an [`IdentityStore`] and never reaches past it.
//! Every failure the persistence layer can raise is a tagged variant of
//! [`StoreError`] so the error normalizer's mapping is exhaustive instead
//! of matching on backend-specific strings.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{IdentityRecord, Role};

/// Failures raised at the persistence boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// One or more fields failed validation.
    #[error("Validation failed")]
    Validation(Vec<String>),

    /// The identifier cannot name a record (malformed reference).
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// A uniqueness constraint was violated.
    #[error("Duplicate {field}")]
    Duplicate {
        /// The field whose uniqueness constraint was violated.
        field: String,
    },

    /// Presented password does not match the stored hash.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Backend failure (I/O, serialization, corrupt data).
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Credential store consulted by the auth layer.
///
/// Implementations persist identity records; the auth core only ever
/// reads through this trait. Lookup latency is bounded by the caller,
/// not the implementation.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up an identity by ID.
    ///
    /// Returns `Ok(None)` for a well-formed ID with no matching record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidId`] for a malformed reference, or
    /// [`StoreError::Backend`] on storage failure.
    async fn find_by_id(&self, id: &str) -> Result<Option<IdentityRecord>, StoreError>;

    /// Look up an identity by its login email.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on storage failure.
    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError>;

    /// Insert a new identity record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the email is already taken,
    /// or [`StoreError::Backend`] on storage failure.
    async fn insert(&self, record: &IdentityRecord) -> Result<(), StoreError>;

    /// Replace the role on an existing record.
    ///
    /// Tokens already issued keep their role snapshot until expiry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidId`] for a malformed reference, or
    /// [`StoreError::Backend`] on storage failure.
    async fn update_role(&self, id: &str, role: Role) -> Result<Option<IdentityRecord>, StoreError>;

    /// Record a successful login on an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on storage failure.
    async fn touch_login(&self, id: &str) -> Result<(), StoreError>;

    /// List all identity records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on storage failure.
    async fn list(&self) -> Result<Vec<IdentityRecord>, StoreError>;
}
