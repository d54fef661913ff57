//! Sled-backed identity store.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;

use placetrack_core::{IdentityRecord, IdentityStore, Role, StoreError, types::is_well_formed_id};

/// Identity store backed by sled.
///
/// Email uniqueness is enforced with an `idx:email:` index tree entry
/// per record, probed before every insert.
pub struct SledIdentityStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledIdentityStore {
    /// Open or create an identity store at the given path.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = sled::open(path.join("identities"))
            .map_err(|e| StoreError::Backend(format!("Failed to open identity database: {e}")))?;

        Self::with_db(db)
    }

    /// Create an identity store on an existing sled database.
    ///
    /// # Errors
    ///
    /// Returns error if the tree cannot be opened.
    pub fn with_db(db: sled::Db) -> Result<Self, StoreError> {
        let tree = db
            .open_tree("identities")
            .map_err(|e| StoreError::Backend(format!("Failed to open identities tree: {e}")))?;

        Ok(Self { db, tree })
    }

    /// Get the underlying sled database.
    #[must_use]
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// Check if any identities exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Count identity records.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tree
            .iter()
            .filter(|r| {
                r.as_ref()
                    .map(|(k, _)| !k.starts_with(b"idx:"))
                    .unwrap_or(false)
            })
            .count()
    }

    fn get_record(&self, id: &str) -> Result<Option<IdentityRecord>, StoreError> {
        match self.tree.get(id.as_bytes()) {
            Ok(Some(value)) => {
                let record: IdentityRecord = serde_json::from_slice(&value)
                    .map_err(|e| StoreError::Backend(format!("Deserialization error: {e}")))?;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Backend(format!("Get error: {e}"))),
        }
    }

    fn put_record(&self, record: &IdentityRecord) -> Result<(), StoreError> {
        let value = serde_json::to_vec(record)
            .map_err(|e| StoreError::Backend(format!("Serialization error: {e}")))?;

        self.tree
            .insert(record.id.as_bytes(), value)
            .map_err(|e| StoreError::Backend(format!("Insert error: {e}")))?;

        self.tree
            .flush()
            .map_err(|e| StoreError::Backend(format!("Flush error: {e}")))?;

        Ok(())
    }

    fn email_index_key(email: &str) -> String {
        format!("idx:email:{email}")
    }
}

#[async_trait]
impl IdentityStore for SledIdentityStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<IdentityRecord>, StoreError> {
        if !is_well_formed_id(id) {
            return Err(StoreError::InvalidId(id.to_string()));
        }

        self.get_record(id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError> {
        match self.tree.get(Self::email_index_key(email).as_bytes()) {
            Ok(Some(id_bytes)) => {
                let id = String::from_utf8_lossy(&id_bytes).into_owned();
                self.get_record(&id)
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Backend(format!("Index lookup error: {e}"))),
        }
    }

    async fn insert(&self, record: &IdentityRecord) -> Result<(), StoreError> {
        if self.find_by_email(&record.email).await?.is_some() {
            return Err(StoreError::Duplicate {
                field: "email".to_string(),
            });
        }

        self.put_record(record)?;

        self.tree
            .insert(
                Self::email_index_key(&record.email).as_bytes(),
                record.id.as_bytes(),
            )
            .map_err(|e| StoreError::Backend(format!("Index error: {e}")))?;

        self.tree
            .flush()
            .map_err(|e| StoreError::Backend(format!("Flush error: {e}")))?;

        Ok(())
    }

    async fn update_role(
        &self,
        id: &str,
        role: Role,
    ) -> Result<Option<IdentityRecord>, StoreError> {
        if !is_well_formed_id(id) {
            return Err(StoreError::InvalidId(id.to_string()));
        }

        let Some(mut record) = self.get_record(id)? else {
            return Ok(None);
        };

        record.role = role;
        self.put_record(&record)?;

        Ok(Some(record))
    }

    async fn touch_login(&self, id: &str) -> Result<(), StoreError> {
        let Some(mut record) = self.get_record(id)? else {
            return Ok(());
        };

        record.last_login = Some(Utc::now());
        self.put_record(&record)
    }

    async fn list(&self) -> Result<Vec<IdentityRecord>, StoreError> {
        let mut records = Vec::new();

        for result in self.tree.iter() {
            let (key, value) =
                result.map_err(|e| StoreError::Backend(format!("Iter error: {e}")))?;

            // Skip index entries
            if key.starts_with(b"idx:") {
                continue;
            }

            let record: IdentityRecord = serde_json::from_slice(&value)
                .map_err(|e| StoreError::Backend(format!("Deserialization error: {e}")))?;
            records.push(record);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, SledIdentityStore) {
        let dir = TempDir::new().unwrap();
        let store = SledIdentityStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let (_dir, store) = open_store();
        assert!(store.is_empty());

        let record =
            IdentityRecord::new("amina@example.com", "hunter22", Role::Student).unwrap();
        store.insert(&record).await.unwrap();

        assert_eq!(store.count(), 1);

        let by_id = store.find_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "amina@example.com");

        let by_email = store.find_by_email("amina@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, record.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (_dir, store) = open_store();

        let first = IdentityRecord::new("amina@example.com", "hunter22", Role::Student).unwrap();
        store.insert(&first).await.unwrap();

        let second = IdentityRecord::new("amina@example.com", "other-pass", Role::Admin).unwrap();
        let result = store.insert(&second).await;

        assert_eq!(
            result,
            Err(StoreError::Duplicate {
                field: "email".to_string()
            })
        );
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_id_rejected_without_lookup() {
        let (_dir, store) = open_store();

        let result = store.find_by_id("definitely-not-an-id").await;
        assert!(matches!(result, Err(StoreError::InvalidId(_))));
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let (_dir, store) = open_store();

        let record = IdentityRecord::new("amina@example.com", "hunter22", Role::Student).unwrap();
        // Never inserted; the ID is well formed but names nothing.
        let result = store.find_by_id(&record.id).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_update_role() {
        let (_dir, store) = open_store();

        let record = IdentityRecord::new("kofi@example.com", "hunter22", Role::Student).unwrap();
        store.insert(&record).await.unwrap();

        let updated = store
            .update_role(&record.id, Role::PlacementCoordinator)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.role, Role::PlacementCoordinator);

        let reread = store.find_by_id(&record.id).await.unwrap().unwrap();
        assert_eq!(reread.role, Role::PlacementCoordinator);
    }

    #[tokio::test]
    async fn test_touch_login() {
        let (_dir, store) = open_store();

        let record = IdentityRecord::new("kofi@example.com", "hunter22", Role::Student).unwrap();
        store.insert(&record).await.unwrap();
        assert!(record.last_login.is_none());

        store.touch_login(&record.id).await.unwrap();
        let reread = store.find_by_id(&record.id).await.unwrap().unwrap();
        assert!(reread.last_login.is_some());
    }

    #[tokio::test]
    async fn test_list_skips_index_entries() {
        let (_dir, store) = open_store();

        for i in 0..3 {
            let record = IdentityRecord::new(
                format!("user{i}@example.com"),
                "hunter22",
                Role::Student,
            )
            .unwrap();
            store.insert(&record).await.unwrap();
        }

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 3);
    }
}
