//! RFC 2617 response verification.

use super::credential::DigestCredential;
use super::hash::{DigestAlgorithm, Qop, calculate_ha2, calculate_response, parse_nonce_count};
use super::nonce::{NonceManager, NonceStatus};
use crate::security::timing_protection::constant_time_hex_compare;
use http::StatusCode;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Outcome of verifying a digest credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Valid,
    Invalid(InvalidReason),
}

/// Why a credential was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    #[error("nonce was not issued by this server or does not match")]
    NonceMismatch,

    #[error("nonce has expired")]
    StaleNonce,

    #[error("response hash does not match")]
    HashMismatch,

    #[error("authorization header is malformed")]
    MalformedHeader,

    #[error("digest algorithm is not supported")]
    UnsupportedAlgorithm,

    #[error("quality of protection is not supported")]
    UnsupportedQop,

    #[error("realm does not match the protection space")]
    RealmMismatch,

    #[error("no credential stored for user")]
    UnknownUser,

    #[error("stored credential has expired")]
    CredentialExpired,

    #[error("digest uri does not match the request")]
    UriMismatch,
}

impl InvalidReason {
    /// Whether the client should retry with a new nonce without prompting the user.
    pub fn is_stale(&self) -> bool {
        matches!(self, InvalidReason::StaleNonce)
    }

    /// Status code the filter answers with.
    ///
    /// Requests the server can never accept get 400; everything else gets a
    /// fresh 401 challenge.
    pub fn status_code(&self) -> StatusCode {
        match self {
            InvalidReason::UnsupportedAlgorithm
            | InvalidReason::UnsupportedQop
            | InvalidReason::UriMismatch => StatusCode::BAD_REQUEST,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Whether the failure is answered with a new challenge.
    pub fn requires_challenge(&self) -> bool {
        self.status_code() == StatusCode::UNAUTHORIZED
    }
}

impl AuthResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, AuthResult::Valid)
    }
}

impl From<NonceStatus> for AuthResult {
    fn from(status: NonceStatus) -> Self {
        match status {
            NonceStatus::Valid => AuthResult::Valid,
            NonceStatus::Expired => AuthResult::Invalid(InvalidReason::StaleNonce),
            NonceStatus::Unknown | NonceStatus::Replayed | NonceStatus::OpaqueMismatch => {
                AuthResult::Invalid(InvalidReason::NonceMismatch)
            }
        }
    }
}

/// Verifies digest credentials for one protection space.
#[derive(Debug, Clone)]
pub struct DigestVerifier {
    realm: String,
    nonces: Arc<NonceManager>,
}

impl DigestVerifier {
    pub fn new(realm: impl Into<String>, nonces: Arc<NonceManager>) -> Self {
        Self {
            realm: realm.into(),
            nonces,
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn nonces(&self) -> &Arc<NonceManager> {
        &self.nonces
    }

    /// Checks that need no stored credential: parameter formats, realm and
    /// whether the nonce was issued here.
    ///
    /// Nonce freshness is checked by [`verify`](Self::verify) after the
    /// response hash, so a stale nonce is only reported for an otherwise
    /// correct response.
    pub fn check_request(&self, credential: &DigestCredential) -> Result<(), InvalidReason> {
        if let Some(algorithm) = &credential.algorithm {
            algorithm
                .parse::<DigestAlgorithm>()
                .map_err(|_| InvalidReason::UnsupportedAlgorithm)?;
        }

        credential
            .qop
            .as_deref()
            .ok_or(InvalidReason::UnsupportedQop)?
            .parse::<Qop>()
            .map_err(|_| InvalidReason::UnsupportedQop)?;

        let nc = credential
            .nonce_count
            .as_deref()
            .ok_or(InvalidReason::MalformedHeader)?;
        parse_nonce_count(nc).ok_or(InvalidReason::MalformedHeader)?;

        if credential.cnonce.as_deref().is_none_or(str::is_empty) {
            return Err(InvalidReason::MalformedHeader);
        }

        if credential.realm != self.realm {
            return Err(InvalidReason::RealmMismatch);
        }

        match self
            .nonces
            .lookup(&credential.nonce, credential.opaque.as_deref())
        {
            NonceStatus::Valid | NonceStatus::Expired => Ok(()),
            _ => Err(InvalidReason::NonceMismatch),
        }
    }

    /// Verify `credential` against the stored `ha1` for its user.
    pub fn verify(&self, credential: &DigestCredential, ha1: &str) -> AuthResult {
        if let Err(reason) = self.check_request(credential) {
            debug!("Digest request for '{}' rejected: {}", credential.username, reason);
            return AuthResult::Invalid(reason);
        }

        if !response_matches(credential, ha1) {
            debug!("Digest response mismatch for '{}'", credential.username);
            return AuthResult::Invalid(InvalidReason::HashMismatch);
        }

        let Some(nc) = credential.nonce_count.as_deref().and_then(parse_nonce_count) else {
            return AuthResult::Invalid(InvalidReason::MalformedHeader);
        };

        let result = AuthResult::from(self.nonces.validate(
            &credential.nonce,
            nc,
            credential.opaque.as_deref(),
        ));
        if let AuthResult::Invalid(reason) = result {
            debug!("Digest nonce for '{}' rejected: {}", credential.username, reason);
        }
        result
    }
}

/// Recompute the expected response from `ha1` and compare it in constant time.
pub fn response_matches(credential: &DigestCredential, ha1: &str) -> bool {
    expected_response(credential, ha1)
        .is_some_and(|expected| constant_time_hex_compare(&expected, &credential.response))
}

/// The response a client knowing the password behind `ha1` would send.
pub fn expected_response(credential: &DigestCredential, ha1: &str) -> Option<String> {
    let nonce_count = credential.nonce_count.as_deref()?;
    let cnonce = credential.cnonce.as_deref()?;
    let qop = credential.qop.as_deref()?;
    let ha2 = calculate_ha2(&credential.method, &credential.uri);

    Some(calculate_response(
        &ha1.to_ascii_lowercase(),
        &credential.nonce,
        nonce_count,
        cnonce,
        qop,
        &ha2,
    ))
}
