//! Identity record and role types.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Role for access control.
///
/// A closed enumeration: every identity carries exactly one role, and
/// route allow-lists are declared against these variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// Placement candidate. The default for new signups.
    #[default]
    Student,
    /// Can view and coordinate placement records.
    PlacementCoordinator,
    /// Full administrative access.
    Admin,
}

impl Role {
    /// Check if this role has admin privileges.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Check if this role can coordinate placements.
    #[must_use]
    pub fn can_coordinate(&self) -> bool {
        matches!(self, Self::Admin | Self::PlacementCoordinator)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::PlacementCoordinator => write!(f, "placementCoordinator"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "placementCoordinator" => Ok(Self::PlacementCoordinator),
            "admin" => Ok(Self::Admin),
            _ => Err(StoreError::Validation(vec![format!("unknown role: {s}")])),
        }
    }
}

/// Persisted identity record.
///
/// Owned by the credential store; the auth layer reads it and never
/// mutates it in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    /// Unique identity ID.
    pub id: String,
    /// Email address, the login key. Unique across all records.
    pub email: String,
    /// Argon2 password hash. Never transmitted.
    pub password_hash: String,
    /// Role granted to this identity.
    pub role: Role,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the identity last logged in.
    pub last_login: Option<DateTime<Utc>>,
}

impl IdentityRecord {
    /// Create a new record with a freshly hashed credential.
    ///
    /// # Errors
    ///
    /// Returns error if password hashing fails.
    pub fn new(email: impl Into<String>, password: &str, role: Role) -> Result<Self, StoreError> {
        let email = email.into();
        let id = format!("usr_{}", uuid_v4());
        let password_hash = hash_password(password)?;

        Ok(Self {
            id,
            email,
            password_hash,
            role,
            created_at: Utc::now(),
            last_login: None,
        })
    }

    /// Verify a password against this record's hash.
    ///
    /// # Errors
    ///
    /// Returns error if the password doesn't match.
    pub fn verify_password(&self, password: &str) -> Result<(), StoreError> {
        let parsed = PasswordHash::new(&self.password_hash)
            .map_err(|e| StoreError::Backend(format!("Invalid stored hash: {e}")))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| StoreError::InvalidCredentials)
    }

    /// Create a safe version of the record for API responses (no hash).
    #[must_use]
    pub fn to_public(&self) -> PublicIdentity {
        PublicIdentity {
            id: self.id.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}

/// Public identity representation (for API responses).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    /// Unique identity ID.
    pub id: String,
    /// Email address.
    pub email: String,
    /// Role.
    pub role: Role,
    /// When created.
    pub created_at: DateTime<Utc>,
    /// Last login time.
    pub last_login: Option<DateTime<Utc>>,
}

/// Check that an ID has the shape this crate generates.
///
/// Route parameters referencing identities are rejected before any store
/// lookup when they cannot possibly name a record.
#[must_use]
pub fn is_well_formed_id(id: &str) -> bool {
    id.strip_prefix("usr_").is_some_and(|rest| {
        rest.len() == 36
            && rest
                .chars()
                .all(|c| c.is_ascii_hexdigit() || c == '-')
    })
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| StoreError::Backend(format!("Password hashing failed: {e}")))
}

/// Generate a simple UUID v4.
fn uuid_v4() -> String {
    use rand::RngCore;
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);

    // Set version (4) and variant bits
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        bytes[6], bytes[7],
        bytes[8], bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_creation() {
        let record = IdentityRecord::new("amina@example.com", "hunter22", Role::Admin).unwrap();
        assert_eq!(record.email, "amina@example.com");
        assert!(record.id.starts_with("usr_"));
        assert_eq!(record.role, Role::Admin);
        assert!(record.last_login.is_none());
    }

    #[test]
    fn test_password_verification() {
        let record = IdentityRecord::new("amina@example.com", "hunter22", Role::Student).unwrap();
        assert!(record.verify_password("hunter22").is_ok());
        assert!(record.verify_password("wrongpassword").is_err());
    }

    #[test]
    fn test_default_role_is_student() {
        assert_eq!(Role::default(), Role::Student);
    }

    #[test]
    fn test_role_privileges() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::PlacementCoordinator.is_admin());
        assert!(!Role::Student.is_admin());

        assert!(Role::Admin.can_coordinate());
        assert!(Role::PlacementCoordinator.can_coordinate());
        assert!(!Role::Student.can_coordinate());
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Student, Role::PlacementCoordinator, Role::Admin] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(
            serde_json::to_string(&Role::PlacementCoordinator).unwrap(),
            "\"placementCoordinator\""
        );
        assert_eq!(serde_json::to_string(&Role::Student).unwrap(), "\"student\"");
    }

    #[test]
    fn test_public_identity_has_no_hash() {
        let record = IdentityRecord::new("amina@example.com", "hunter22", Role::Student).unwrap();
        let json = serde_json::to_value(record.to_public()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["email"], "amina@example.com");
    }

    #[test]
    fn test_id_shape() {
        let record = IdentityRecord::new("amina@example.com", "hunter22", Role::Student).unwrap();
        assert!(is_well_formed_id(&record.id));
        assert!(!is_well_formed_id("not-an-id"));
        assert!(!is_well_formed_id("usr_short"));
        assert!(!is_well_formed_id(""));
    }
}
