//! Access token issuance and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode,
    errors::ErrorKind,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use placetrack_core::Role;

use crate::config::{AuthConfig, ConfigError};

/// Access token lifetime. Fixed: there is no refresh mechanism, so a
/// role change or compromise rides out at most this window.
pub const TOKEN_TTL_SECS: i64 = 3600;

/// Token verification failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The token could not be parsed or its signature does not match.
    #[error("Authentication token is invalid")]
    Malformed,

    /// The token's expiry has passed.
    #[error("Authentication token has expired")]
    Expired,

    /// Claims could not be encoded at issuance.
    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

/// Signed claims carried by every access token.
///
/// The role is a snapshot taken at issuance; the record's current role
/// is re-read on every request, but the claim itself stays as issued
/// until expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (identity ID).
    pub sub: String,
    /// Role at issuance time.
    pub role: Role,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// Codec for creating and verifying access tokens.
///
/// Verification is purely structural: signature and expiry, no store
/// consultation. Verifying the same token twice yields the same result.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec from a raw secret.
    ///
    /// The secret should be at least 32 bytes.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // No leeway: a token one second past expiry is expired.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Create a codec from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSecret`] if no secret is configured,
    /// or [`ConfigError::InvalidSecret`] if it is not valid hex.
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        let hex_secret = config.jwt_secret.as_deref().ok_or(ConfigError::MissingSecret)?;
        let secret =
            hex::decode(hex_secret).map_err(|e| ConfigError::InvalidSecret(e.to_string()))?;
        Ok(Self::new(&secret))
    }

    /// Generate a random 256-bit secret as a hex string.
    #[must_use]
    pub fn generate_hex_secret() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Issue an access token for a subject.
    ///
    /// # Errors
    ///
    /// Returns error if claim encoding fails.
    pub fn issue(
        &self,
        subject_id: &str,
        role: Role,
    ) -> Result<(String, DateTime<Utc>), TokenError> {
        self.issue_with_ttl(subject_id, role, Duration::seconds(TOKEN_TTL_SECS))
    }

    fn issue_with_ttl(
        &self,
        subject_id: &str,
        role: Role,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), TokenError> {
        let now = Utc::now();
        let exp = now + ttl;

        let claims = Claims {
            sub: subject_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok((token, exp))
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Expired`] if the expiry has passed, or
    /// [`TokenError::Malformed`] for any other verification failure.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data: TokenData<Claims> = decode(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        Ok(data.claims)
    }

    /// Extract the token from an `Authorization` header value.
    ///
    /// Expects format: "Bearer <token>"
    #[must_use]
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_codec() -> TokenCodec {
        let secret = hex::decode(TokenCodec::generate_hex_secret()).unwrap();
        TokenCodec::new(&secret)
    }

    #[test]
    fn test_generate_secret() {
        let secret1 = TokenCodec::generate_hex_secret();
        let secret2 = TokenCodec::generate_hex_secret();
        assert_ne!(secret1, secret2);
        assert_eq!(secret1.len(), 64); // 32 bytes = 64 hex chars
    }

    #[test]
    fn test_issue_and_verify() {
        let codec = create_codec();
        let (token, expires) = codec.issue("u1", Role::Admin).unwrap();

        assert!(!token.is_empty());
        assert!(expires > Utc::now());

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
    }

    #[test]
    fn test_verify_is_repeatable() {
        let codec = create_codec();
        let (token, _) = codec.issue("u1", Role::Student).unwrap();

        let first = codec.verify(&token).unwrap();
        let second = codec.verify(&token).unwrap();
        assert_eq!(first.sub, second.sub);
        assert_eq!(first.exp, second.exp);
    }

    #[test]
    fn test_expired_token() {
        let codec = create_codec();
        let (token, _) = codec
            .issue_with_ttl("u1", Role::Admin, Duration::minutes(-61))
            .unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_garbage_token() {
        let codec = create_codec();
        assert_eq!(
            codec.verify("not.a.token"),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_tampered_token() {
        let codec = create_codec();
        let (token, _) = codec.issue("u1", Role::Student).unwrap();

        // Flip a character in the payload segment.
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let mut payload: Vec<u8> = parts[1].clone().into_bytes();
        payload[0] = if payload[0] == b'A' { b'B' } else { b'A' };
        parts[1] = String::from_utf8(payload).unwrap();
        let tampered = parts.join(".");

        assert_eq!(codec.verify(&tampered), Err(TokenError::Malformed));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let codec = create_codec();
        let other = create_codec();
        let (token, _) = codec.issue("u1", Role::Admin).unwrap();

        assert_eq!(other.verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_from_config_requires_secret() {
        let config = AuthConfig::default();
        assert!(matches!(
            TokenCodec::from_config(&config),
            Err(ConfigError::MissingSecret)
        ));

        let config = AuthConfig {
            jwt_secret: Some(TokenCodec::generate_hex_secret()),
            ..AuthConfig::default()
        };
        assert!(TokenCodec::from_config(&config).is_ok());
    }

    #[test]
    fn test_from_config_rejects_bad_hex() {
        let config = AuthConfig {
            jwt_secret: Some("not hex at all".to_string()),
            ..AuthConfig::default()
        };
        assert!(matches!(
            TokenCodec::from_config(&config),
            Err(ConfigError::InvalidSecret(_))
        ));
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(TokenCodec::extract_from_header("Bearer abc123"), Some("abc123"));
        assert_eq!(TokenCodec::extract_from_header("bearer abc123"), Some("abc123"));
        assert_eq!(TokenCodec::extract_from_header("abc123"), None);
        assert_eq!(TokenCodec::extract_from_header("Basic abc123"), None);
    }
}
