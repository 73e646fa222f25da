//! `WWW-Authenticate: Digest ...` challenges.

use super::hash::{DigestAlgorithm, Qop};
use super::nonce::Nonce;
use super::tokenizer::{parse_params, strip_scheme};
use crate::errors::DigestError;
use std::fmt;

/// A Digest challenge sent with a 401 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: String,
    pub algorithm: DigestAlgorithm,
    pub qop: Qop,

    /// Set when the client's nonce expired but its response was otherwise valid
    pub stale: bool,
}

impl DigestChallenge {
    /// Build a challenge for `realm` around a freshly issued nonce.
    pub fn new(realm: impl Into<String>, nonce: &Nonce) -> Self {
        Self {
            realm: realm.into(),
            nonce: nonce.value.clone(),
            opaque: nonce.opaque.clone(),
            algorithm: DigestAlgorithm::Md5,
            qop: Qop::Auth,
            stale: false,
        }
    }

    /// Mark the challenge as answering a stale nonce.
    pub fn stale(mut self, stale: bool) -> Self {
        self.stale = stale;
        self
    }

    /// Render the header value, starting with the `Digest` scheme name.
    pub fn to_header_value(&self) -> String {
        let mut header = format!(
            "Digest realm=\"{}\", nonce=\"{}\", opaque=\"{}\", algorithm={}, qop=\"{}\"",
            self.realm, self.nonce, self.opaque, self.algorithm, self.qop
        );
        if self.stale {
            header.push_str(", stale=true");
        }
        header
    }

    /// Parse a challenge header value, as a client would.
    ///
    /// `qop` may list several options; the challenge is accepted when `auth`
    /// is among them.
    pub fn parse(header: &str) -> Result<Self, DigestError> {
        let params = strip_scheme(header, "Digest").ok_or(DigestError::NotDigestScheme)?;
        let params = parse_params(params)?;

        let required = |name: &'static str| {
            params
                .get(name)
                .cloned()
                .ok_or(DigestError::MissingField(name))
        };

        let algorithm = match params.get("algorithm") {
            Some(value) => value
                .parse()
                .map_err(DigestError::MalformedParameter)?,
            None => DigestAlgorithm::Md5,
        };

        let qop = required("qop")?;
        if !qop.split(',').any(|option| option.trim() == Qop::Auth.as_str()) {
            return Err(DigestError::MalformedParameter(format!(
                "unsupported qop '{qop}'"
            )));
        }

        Ok(Self {
            realm: required("realm")?,
            nonce: required("nonce")?,
            opaque: params.get("opaque").cloned().unwrap_or_default(),
            algorithm,
            qop: Qop::Auth,
            stale: params
                .get("stale")
                .is_some_and(|stale| stale.eq_ignore_ascii_case("true")),
        })
    }
}

impl fmt::Display for DigestChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}
