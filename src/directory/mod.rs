//! External collaborators the auth core consumes.
//!
//! The User Directory owns identities and their stored credentials. The
//! Resource Owner Check answers "who owns X" for the route layer. Both are
//! network-backed in production; their clients enforce their own timeouts.

pub mod memory;

use async_trait::async_trait;

use crate::auth::{Credential, Identity};
use crate::error::DirectoryError;

pub use memory::InMemoryDirectory;

/// A directory record as found at login. `password_hash` is optional
/// because a corrupt record can lack it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub identity: Identity,
    pub email: String,
    pub password_hash: Option<String>,
}

impl StoredCredential {
    pub fn new(email: impl Into<String>, credential: Credential) -> Self {
        Self {
            identity: credential.identity,
            email: email.into(),
            password_hash: Some(credential.password_hash),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredCredential>, DirectoryError>;

    async fn exists(&self, uid: &Identity) -> Result<bool, DirectoryError>;
}

#[async_trait]
pub trait ResourceOwnerCheck: Send + Sync {
    /// `None` when the resource is unknown.
    async fn owner_of(&self, resource_id: &str) -> Result<Option<Identity>, DirectoryError>;
}
