//! Testing utilities.
//!
//! [`DigestClient`] plays the client side of the Digest handshake, and
//! [`FailingCredentialStore`] stands in for a credential store that is down.

use crate::digest::{
    DigestChallenge, DigestCredential, calculate_ha1, calculate_ha2, calculate_response,
};
use crate::errors::{AuthError, Result, StorageError};
use crate::storage::{CredentialStore, StoredCredential};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};

/// Computes `Authorization: Digest ...` headers the way a browser would.
///
/// Each call to [`authorize`](Self::authorize) uses the next nonce count.
#[derive(Debug)]
pub struct DigestClient {
    username: String,
    password: String,
    cnonce: String,
    nonce_count: AtomicU32,
}

impl DigestClient {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            cnonce: "0a4f113b".to_string(),
            nonce_count: AtomicU32::new(0),
        }
    }

    /// Use a fixed client nonce.
    pub fn with_cnonce(mut self, cnonce: impl Into<String>) -> Self {
        self.cnonce = cnonce.into();
        self
    }

    /// Answer a `WWW-Authenticate` header for a request to `method uri`.
    pub fn authorize(&self, www_authenticate: &str, method: &str, uri: &str) -> Result<String> {
        let challenge = DigestChallenge::parse(www_authenticate)?;
        let nc = self.nonce_count.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self
            .credential(&challenge, method, uri, &format!("{nc:08x}"))
            .to_header_value())
    }

    /// Build the credential for `challenge` with an explicit nonce count.
    pub fn credential(
        &self,
        challenge: &DigestChallenge,
        method: &str,
        uri: &str,
        nonce_count: &str,
    ) -> DigestCredential {
        let ha1 = calculate_ha1(&self.username, &challenge.realm, &self.password);
        let ha2 = calculate_ha2(method, uri);
        let qop = challenge.qop.as_str();

        DigestCredential {
            username: self.username.clone(),
            realm: challenge.realm.clone(),
            nonce: challenge.nonce.clone(),
            uri: uri.to_string(),
            response: calculate_response(
                &ha1,
                &challenge.nonce,
                nonce_count,
                &self.cnonce,
                qop,
                &ha2,
            ),
            qop: Some(qop.to_string()),
            nonce_count: Some(nonce_count.to_string()),
            cnonce: Some(self.cnonce.clone()),
            algorithm: Some(challenge.algorithm.to_string()),
            opaque: (!challenge.opaque.is_empty()).then(|| challenge.opaque.clone()),
            method: method.to_string(),
        }
    }
}

/// Credential store whose every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCredentialStore;

#[async_trait]
impl CredentialStore for FailingCredentialStore {
    async fn password_hash(
        &self,
        _username: &str,
        _realm: &str,
    ) -> Result<Option<StoredCredential>> {
        Err(AuthError::Storage(StorageError::BackendUnavailable))
    }

    async fn user_for_certificate(&self, _fingerprint: &str) -> Result<Option<String>> {
        Err(StorageError::connection_failed("certificate directory unreachable").into())
    }
}
