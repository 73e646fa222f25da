//! Authentication scheme implementations.
//!
//! The configured [`AuthType`] selects one [`AuthScheme`] variant when the
//! filter is built. Dispatch is a plain `match`, so an unsupported scheme is a
//! configuration error at construction rather than a runtime lookup failure.

use crate::config::FilterConfig;
use crate::credentials::Credential;
use crate::digest::{InvalidReason, NonceManager, calculate_ha1};
use crate::errors::{AuthError, Result};
use crate::identity::Principal;
use crate::request::{AuthRequest, AuthResponse};
use crate::security::timing_protection::constant_time_hex_compare;
use crate::storage::CredentialStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub mod basic;
pub mod client_cert;
pub mod digest;
pub mod form;

pub use basic::BasicScheme;
pub use client_cert::ClientCertScheme;
pub use digest::DigestScheme;
pub use form::FormScheme;

/// Supported authentication schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AuthType {
    Basic,
    Digest,
    Form,
    ClientCert,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Basic => "basic",
            AuthType::Digest => "digest",
            AuthType::Form => "form",
            AuthType::ClientCert => "client_cert",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = AuthError;

    /// Case-insensitive; `CLIENT-CERT`, `client_cert` and `clientcert` all
    /// name the certificate scheme.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "basic" => Ok(AuthType::Basic),
            "digest" => Ok(AuthType::Digest),
            "form" => Ok(AuthType::Form),
            "client_cert" | "clientcert" => Ok(AuthType::ClientCert),
            other => Err(AuthError::config(format!(
                "Unsupported authentication type '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for AuthType {
    type Error = AuthError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AuthType> for String {
    fn from(value: AuthType) -> Self {
        value.as_str().to_string()
    }
}

/// Result of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodResult {
    /// Authentication was successful
    Success(Principal),

    /// Authentication failed
    Failure(InvalidReason),
}

impl MethodResult {
    pub fn is_success(&self) -> bool {
        matches!(self, MethodResult::Success(_))
    }
}

/// The scheme a filter authenticates with.
#[derive(Debug)]
pub enum AuthScheme {
    Basic(BasicScheme),
    Digest(DigestScheme),
    Form(FormScheme),
    ClientCert(ClientCertScheme),
}

impl AuthScheme {
    /// Build the scheme named by `config.auth_type`.
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        let realm = config.realm_name();
        Ok(match config.auth_type {
            AuthType::Basic => AuthScheme::Basic(BasicScheme::new(realm)),
            AuthType::Digest => AuthScheme::Digest(
                DigestScheme::new(realm, Arc::new(NonceManager::new(config.nonce.clone())))
                    .with_uri_check(config.verify_digest_uri),
            ),
            AuthType::Form => AuthScheme::Form(FormScheme::new(realm, config.form.clone())),
            AuthType::ClientCert => AuthScheme::ClientCert(ClientCertScheme::new()),
        })
    }

    pub fn auth_type(&self) -> AuthType {
        match self {
            AuthScheme::Basic(_) => AuthType::Basic,
            AuthScheme::Digest(_) => AuthType::Digest,
            AuthScheme::Form(_) => AuthType::Form,
            AuthScheme::ClientCert(_) => AuthType::ClientCert,
        }
    }

    /// The protection space, for schemes that have one.
    pub fn realm(&self) -> Option<&str> {
        match self {
            AuthScheme::Basic(scheme) => Some(scheme.realm()),
            AuthScheme::Digest(scheme) => Some(scheme.realm()),
            AuthScheme::Form(scheme) => Some(scheme.realm()),
            AuthScheme::ClientCert(_) => None,
        }
    }

    /// Nonce store of the Digest scheme.
    pub fn nonces(&self) -> Option<&Arc<NonceManager>> {
        match self {
            AuthScheme::Digest(scheme) => Some(scheme.nonces()),
            _ => None,
        }
    }

    /// Requests the scheme itself must let through, such as the login page.
    pub fn permits_anonymous(&self, request: &AuthRequest) -> bool {
        match self {
            AuthScheme::Form(scheme) => scheme.permits_anonymous(request),
            _ => false,
        }
    }

    /// Pull the scheme's credential out of the request.
    ///
    /// `Ok(None)` means the client sent nothing for this scheme; `Err` means it
    /// sent something that could not be parsed.
    pub fn extract_credential(
        &self,
        request: &AuthRequest,
    ) -> std::result::Result<Option<Credential>, InvalidReason> {
        match self {
            AuthScheme::Basic(scheme) => scheme.extract_credential(request),
            AuthScheme::Digest(scheme) => scheme.extract_credential(request),
            AuthScheme::Form(scheme) => scheme.extract_credential(request),
            AuthScheme::ClientCert(scheme) => Ok(scheme.extract_credential(request)),
        }
    }

    /// Check a credential against the store.
    pub async fn authenticate(
        &self,
        credential: &Credential,
        store: &dyn CredentialStore,
    ) -> Result<MethodResult> {
        match self {
            AuthScheme::Basic(scheme) => scheme.authenticate(credential, store).await,
            AuthScheme::Digest(scheme) => scheme.authenticate(credential, store).await,
            AuthScheme::Form(scheme) => scheme.authenticate(credential, store).await,
            AuthScheme::ClientCert(scheme) => scheme.authenticate(credential, store).await,
        }
    }

    /// Response asking the client to (re-)authenticate.
    ///
    /// `reason` is the failure that led here, or `None` when the client sent
    /// no credential.
    pub fn challenge_client(
        &self,
        request: &AuthRequest,
        reason: Option<InvalidReason>,
    ) -> Result<AuthResponse> {
        if reason.is_some_and(|reason| !reason.requires_challenge()) {
            return Ok(AuthResponse::bad_request());
        }

        match self {
            AuthScheme::Basic(scheme) => scheme.challenge_client(),
            AuthScheme::Digest(scheme) => scheme.challenge_client(reason),
            AuthScheme::Form(scheme) => scheme.challenge_client(request),
            AuthScheme::ClientCert(_) => Ok(AuthResponse::forbidden()),
        }
    }

    /// Response to send instead of continuing once the client has logged in.
    pub fn post_authentication(&self, request: &AuthRequest) -> Result<Option<AuthResponse>> {
        match self {
            AuthScheme::Form(scheme) => scheme.post_authentication(request).map(Some),
            _ => Ok(None),
        }
    }
}

/// Check a plaintext password against the stored HA1 for `username` in `realm`.
pub(crate) async fn verify_password(
    store: &dyn CredentialStore,
    auth_type: AuthType,
    username: &str,
    password: &str,
    realm: &str,
) -> Result<MethodResult> {
    let Some(stored) = store.password_hash(username, realm).await? else {
        return Ok(MethodResult::Failure(InvalidReason::UnknownUser));
    };

    if stored.is_expired() {
        return Ok(MethodResult::Failure(InvalidReason::CredentialExpired));
    }

    let ha1 = calculate_ha1(username, realm, password);
    if constant_time_hex_compare(&stored.ha1, &ha1) {
        Ok(MethodResult::Success(Principal::new(username, auth_type)))
    } else {
        Ok(MethodResult::Failure(InvalidReason::HashMismatch))
    }
}
