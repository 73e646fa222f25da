//! Client credentials carried by `Authorization: Digest ...` headers.

use super::tokenizer::{parse_params, serialize_params, strip_scheme};
use crate::errors::DigestError;
use std::collections::BTreeMap;
use std::fmt;

/// A client-asserted digest credential.
///
/// Built from the `Authorization` header plus the request method, and
/// consumed once by the verifier.
#[derive(Clone, PartialEq, Eq)]
pub struct DigestCredential {
    pub username: String,
    pub realm: String,
    pub nonce: String,
    pub uri: String,
    pub response: String,
    pub qop: Option<String>,
    pub nonce_count: Option<String>,
    pub cnonce: Option<String>,
    pub algorithm: Option<String>,
    pub opaque: Option<String>,

    /// Request method, taken from the request line rather than the header
    pub method: String,
}

impl DigestCredential {
    /// Parse an `Authorization` header value for a request made with `method`.
    ///
    /// Only the presence of the mandatory fields is checked here; the verifier
    /// decides whether their values are acceptable.
    pub fn parse(header: &str, method: &str) -> Result<Self, DigestError> {
        let params = strip_scheme(header, "Digest").ok_or(DigestError::NotDigestScheme)?;
        let params = parse_params(params)?;
        Self::from_params(params, method)
    }

    /// Build a credential from already tokenized parameters.
    pub fn from_params(
        mut params: BTreeMap<String, String>,
        method: &str,
    ) -> Result<Self, DigestError> {
        let mut required = |name: &'static str| {
            params.remove(name).ok_or(DigestError::MissingField(name))
        };

        let username = required("username")?;
        let realm = required("realm")?;
        let nonce = required("nonce")?;
        let uri = required("uri")?;
        let response = required("response")?;

        Ok(Self {
            username,
            realm,
            nonce,
            uri,
            response,
            qop: params.remove("qop"),
            nonce_count: params.remove("nc"),
            cnonce: params.remove("cnonce"),
            algorithm: params.remove("algorithm"),
            opaque: params.remove("opaque"),
            method: method.to_string(),
        })
    }

    /// Render the credential as an `Authorization` header value.
    ///
    /// `algorithm`, `qop` and `nc` are tokens in RFC 2617 and go out
    /// unquoted; everything else is a quoted string.
    pub fn to_header_value(&self) -> String {
        let quoted = |key: &str, value: &str| serialize_params([(key, value)]);
        let token = |key: &str, value: &str| format!("{key}={value}");

        let mut params = vec![
            quoted("username", &self.username),
            quoted("realm", &self.realm),
            quoted("nonce", &self.nonce),
            quoted("uri", &self.uri),
        ];
        if let Some(algorithm) = &self.algorithm {
            params.push(token("algorithm", algorithm));
        }
        if let Some(qop) = &self.qop {
            params.push(token("qop", qop));
        }
        if let Some(nc) = &self.nonce_count {
            params.push(token("nc", nc));
        }
        if let Some(cnonce) = &self.cnonce {
            params.push(quoted("cnonce", cnonce));
        }
        if let Some(opaque) = &self.opaque {
            params.push(quoted("opaque", opaque));
        }
        params.push(quoted("response", &self.response));

        format!("Digest {}", params.join(", "))
    }
}

impl fmt::Debug for DigestCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestCredential")
            .field("username", &self.username)
            .field("realm", &self.realm)
            .field("uri", &self.uri)
            .field("qop", &self.qop)
            .field("nonce_count", &self.nonce_count)
            .field("algorithm", &self.algorithm)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}
