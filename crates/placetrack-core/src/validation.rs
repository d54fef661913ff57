//! Input validation for signup and login payloads.
//!
//! Validate all external inputs before they reach the store. Failures
//! carry one message per offending field so the error normalizer can
//! return them verbatim.

use thiserror::Error;

use crate::store::StoreError;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum accepted email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Per-field validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Email is empty.
    #[error("email is required")]
    EmptyEmail,

    /// Email does not look like an address.
    #[error("email must be a valid email address")]
    InvalidEmail,

    /// Email exceeds the maximum length.
    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,

    /// Password is empty.
    #[error("password is required")]
    EmptyPassword,

    /// Password is shorter than the minimum.
    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    PasswordTooShort,
}

/// Validate an email address shape.
///
/// # Errors
///
/// Returns the first failed check.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::EmptyEmail);
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.ends_with('.') {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(())
}

/// Validate a password.
///
/// # Errors
///
/// Returns the first failed check.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyPassword);
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }

    Ok(())
}

/// Validate a full credential pair, collecting every field failure.
///
/// # Errors
///
/// Returns [`StoreError::Validation`] carrying one message per field
/// that failed.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), StoreError> {
    let mut errors = Vec::new();

    if let Err(e) = validate_email(email) {
        errors.push(e.to_string());
    }
    if let Err(e) = validate_password(password) {
        errors.push(e.to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation(errors))
    }
}
