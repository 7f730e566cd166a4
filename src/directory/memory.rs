use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use super::{ResourceOwnerCheck, StoredCredential, UserDirectory};
use crate::auth::{Credential, Identity};
use crate::error::DirectoryError;

/// Process-local directory. A reference adapter and a test double; every
/// record lives only as long as the value.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<Identity, StoredCredential>>,
    resources: RwLock<HashMap<String, Identity>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user. Emails are unique.
    pub async fn insert(&self, email: &str, credential: Credential) -> Result<(), DirectoryError> {
        self.insert_record(StoredCredential::new(email, credential)).await
    }

    /// Insert a raw record, including one with no stored digest.
    pub async fn insert_record(&self, record: StoredCredential) -> Result<(), DirectoryError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == record.email) {
            return Err(DirectoryError::Duplicate(format!(
                "email {} already registered",
                record.email
            )));
        }
        if users.contains_key(&record.identity) {
            return Err(DirectoryError::Duplicate(format!(
                "uid {} already registered",
                record.identity
            )));
        }
        info!(uid = %record.identity, "User registered");
        users.insert(record.identity.clone(), record);
        Ok(())
    }

    /// Delete a user and every resource it owns. Returns whether it existed.
    pub async fn remove(&self, uid: &Identity) -> bool {
        let removed = self.users.write().await.remove(uid).is_some();
        if removed {
            self.resources.write().await.retain(|_, owner| owner != uid);
            info!(uid = %uid, "User removed");
        }
        removed
    }

    /// Swap in a new credential wholesale (password change). Returns
    /// whether the user existed.
    pub async fn replace_credential(&self, credential: Credential) -> bool {
        let mut users = self.users.write().await;
        match users.get_mut(&credential.identity) {
            Some(record) => {
                record.password_hash = Some(credential.password_hash);
                true
            }
            None => false,
        }
    }

    pub async fn assign_resource(&self, resource_id: impl Into<String>, owner: Identity) {
        self.resources.write().await.insert(resource_id.into(), owner);
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredCredential>, DirectoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn exists(&self, uid: &Identity) -> Result<bool, DirectoryError> {
        Ok(self.users.read().await.contains_key(uid))
    }
}

#[async_trait]
impl ResourceOwnerCheck for InMemoryDirectory {
    async fn owner_of(&self, resource_id: &str) -> Result<Option<Identity>, DirectoryError> {
        Ok(self.resources.read().await.get(resource_id).cloned())
    }
}
