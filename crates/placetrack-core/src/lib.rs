//! # Placetrack Core
//!
//! Identity model and credential-store seam for the Placetrack backend.
//!
//! This crate provides:
//! - The closed role enumeration and identity record shape
//! - The `IdentityStore` trait consulted by the auth layer
//! - The tagged store failure taxonomy the error normalizer maps from
//! - Input validation for signup/login payloads

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod store;
pub mod types;
pub mod validation;

pub use store::{IdentityStore, StoreError};
pub use types::{IdentityRecord, PublicIdentity, Role};
pub use validation::{ValidationError, validate_credentials};
