//! HTTP Digest authentication.

use super::{AuthType, MethodResult};
use crate::credentials::Credential;
use crate::digest::{
    AuthResult, DigestChallenge, DigestCredential, DigestVerifier, InvalidReason, NonceManager,
    strip_scheme,
};
use crate::errors::Result;
use crate::identity::Principal;
use crate::request::{AuthRequest, AuthResponse};
use crate::storage::CredentialStore;
use http::Uri;
use std::sync::Arc;
use tracing::debug;

/// `Authorization: Digest ...` with `qop=auth` and MD5.
#[derive(Debug, Clone)]
pub struct DigestScheme {
    verifier: DigestVerifier,
    check_uri: bool,
}

impl DigestScheme {
    pub fn new(realm: impl Into<String>, nonces: Arc<NonceManager>) -> Self {
        Self {
            verifier: DigestVerifier::new(realm, nonces),
            check_uri: false,
        }
    }

    /// Require the header's `uri` to name the request-target.
    pub fn with_uri_check(mut self, enabled: bool) -> Self {
        self.check_uri = enabled;
        self
    }

    pub fn realm(&self) -> &str {
        self.verifier.realm()
    }

    pub fn nonces(&self) -> &Arc<NonceManager> {
        self.verifier.nonces()
    }

    pub fn verifier(&self) -> &DigestVerifier {
        &self.verifier
    }

    pub fn extract_credential(
        &self,
        request: &AuthRequest,
    ) -> std::result::Result<Option<Credential>, InvalidReason> {
        let Some(header) = request
            .authorization()
            .filter(|header| strip_scheme(header, "Digest").is_some())
        else {
            return Ok(None);
        };

        let credential = match DigestCredential::parse(header, request.method().as_str()) {
            Ok(credential) => credential,
            Err(e) => {
                debug!("Unparsable Digest authorization header: {}", e);
                return Err(InvalidReason::MalformedHeader);
            }
        };

        if self.check_uri && !uri_matches(&credential.uri, request.uri()) {
            debug!(
                "Digest uri '{}' does not match request-target '{}'",
                credential.uri,
                request.uri()
            );
            return Err(InvalidReason::UriMismatch);
        }

        Ok(Some(Credential::digest(credential)))
    }

    /// Verify a digest credential.
    ///
    /// Parameter, realm and nonce checks run before the store is consulted, so
    /// a request that can never succeed costs no lookup.
    pub async fn authenticate(
        &self,
        credential: &Credential,
        store: &dyn CredentialStore,
    ) -> Result<MethodResult> {
        let Credential::Digest(credential) = credential else {
            return Ok(MethodResult::Failure(InvalidReason::MalformedHeader));
        };

        if let Err(reason) = self.verifier.check_request(credential) {
            return Ok(MethodResult::Failure(reason));
        }

        let Some(stored) = store
            .password_hash(&credential.username, self.realm())
            .await?
        else {
            return Ok(MethodResult::Failure(InvalidReason::UnknownUser));
        };

        if stored.is_expired() {
            return Ok(MethodResult::Failure(InvalidReason::CredentialExpired));
        }

        Ok(match self.verifier.verify(credential, &stored.ha1) {
            AuthResult::Valid => {
                MethodResult::Success(Principal::new(&credential.username, AuthType::Digest))
            }
            AuthResult::Invalid(reason) => MethodResult::Failure(reason),
        })
    }

    /// 401 with a challenge around a freshly issued nonce.
    pub fn challenge_client(&self, reason: Option<InvalidReason>) -> Result<AuthResponse> {
        let nonce = self.nonces().issue()?;
        let challenge = DigestChallenge::new(self.realm(), &nonce)
            .stale(reason.is_some_and(|reason| reason.is_stale()));
        AuthResponse::unauthorized(&challenge.to_header_value())
    }
}

/// Whether `digest_uri` names the same resource as the request-target.
///
/// Clients may send the absolute form, so only path and query are compared.
fn uri_matches(digest_uri: &str, request_uri: &Uri) -> bool {
    let target = request_uri
        .path_and_query()
        .map_or(request_uri.path(), |pq| pq.as_str());
    if digest_uri == target {
        return true;
    }

    digest_uri
        .parse::<Uri>()
        .ok()
        .and_then(|uri| uri.path_and_query().map(|pq| pq.as_str() == target))
        .unwrap_or(false)
}
