//! HTTP Digest access authentication (RFC 2617).
//!
//! The pieces fit together as follows:
//!
//! - [`NonceManager`] issues nonces and remembers which nonce counts were used.
//! - [`DigestChallenge`] renders the `WWW-Authenticate` header around a nonce.
//! - [`DigestCredential`] is parsed from the client's `Authorization` header.
//! - [`DigestVerifier`] recomputes the expected response from the stored HA1
//!   and reports an [`AuthResult`].
//!
//! ```rust
//! use http_auth_filter::digest::{calculate_ha1, DigestChallenge, DigestVerifier, NonceManager};
//! use std::sync::Arc;
//!
//! let nonces = Arc::new(NonceManager::default());
//! let verifier = DigestVerifier::new("testrealm@host.com", Arc::clone(&nonces));
//!
//! let nonce = nonces.issue().unwrap();
//! let challenge = DigestChallenge::new(verifier.realm(), &nonce);
//! assert!(challenge.to_header_value().starts_with("Digest realm=\"testrealm@host.com\""));
//!
//! let stored_ha1 = calculate_ha1("Mufasa", "testrealm@host.com", "Circle Of Life");
//! assert_eq!(stored_ha1.len(), 32);
//! ```

pub mod challenge;
pub mod credential;
pub mod hash;
pub mod nonce;
pub mod tokenizer;
pub mod verifier;

pub use challenge::DigestChallenge;
pub use credential::DigestCredential;
pub use hash::{
    DigestAlgorithm, Qop, calculate_ha1, calculate_ha2, calculate_response, md5_hex,
};
pub use nonce::{Nonce, NonceManager, NonceStatus};
pub use tokenizer::{parse_params, quote_tokenize, serialize_params, strip_scheme};
pub use verifier::{AuthResult, DigestVerifier, InvalidReason};
