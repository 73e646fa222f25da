//! Credential stores consulted by the authentication schemes.
//!
//! Stores hold the digest secret `HA1 = MD5(username:realm:password)` rather
//! than passwords, so the same entry serves Basic, Form and Digest logins.

use crate::digest::calculate_ha1;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A stored password hash.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct StoredCredential {
    /// Lowercase hex `MD5(username:realm:password)`
    pub ha1: String,

    /// After this instant the credential is refused
    #[zeroize(skip)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredCredential {
    pub fn new(ha1: impl Into<String>) -> Self {
        Self {
            ha1: ha1.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredential")
            .field("ha1", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of user credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up the password hash for `username` in `realm`.
    async fn password_hash(&self, username: &str, realm: &str)
    -> Result<Option<StoredCredential>>;

    /// Map a client certificate fingerprint to a username.
    async fn user_for_certificate(&self, _fingerprint: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Lowercase hex SHA-256 fingerprint of a DER encoded certificate.
pub fn certificate_fingerprint(der: &[u8]) -> String {
    hex::encode(Sha256::digest(der))
}

/// In-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: DashMap<(String, String), StoredCredential>,
    certificates: DashMap<String, String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user, hashing the password for `realm`.
    pub fn add_user(&self, username: &str, realm: &str, password: &str) {
        self.set_ha1(
            username,
            realm,
            StoredCredential::new(calculate_ha1(username, realm, password)),
        );
    }

    /// Add a user whose credential stops being accepted at `expires_at`.
    pub fn add_user_with_expiry(
        &self,
        username: &str,
        realm: &str,
        password: &str,
        expires_at: DateTime<Utc>,
    ) {
        self.set_ha1(
            username,
            realm,
            StoredCredential::new(calculate_ha1(username, realm, password)).with_expiry(expires_at),
        );
    }

    /// Store a precomputed credential.
    pub fn set_ha1(&self, username: &str, realm: &str, credential: StoredCredential) {
        self.users
            .insert((username.to_string(), realm.to_string()), credential);
    }

    pub fn remove_user(&self, username: &str, realm: &str) -> bool {
        self.users
            .remove(&(username.to_string(), realm.to_string()))
            .is_some()
    }

    /// Map the certificate's fingerprint to `username`.
    pub fn add_certificate(&self, der: &[u8], username: &str) {
        self.certificates
            .insert(certificate_fingerprint(der), username.to_string());
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn password_hash(
        &self,
        username: &str,
        realm: &str,
    ) -> Result<Option<StoredCredential>> {
        Ok(self
            .users
            .get(&(username.to_string(), realm.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn user_for_certificate(&self, fingerprint: &str) -> Result<Option<String>> {
        Ok(self
            .certificates
            .get(&fingerprint.to_ascii_lowercase())
            .map(|entry| entry.value().clone()))
    }
}
