//! Credentials extracted from requests by the authentication schemes.

use crate::digest::DigestCredential;
use base64::Engine;
use zeroize::Zeroizing;

/// A credential presented by a client.
#[derive(Clone)]
pub enum Credential {
    /// Username and password, from a Basic header or a login form
    Password {
        username: String,
        password: Zeroizing<String>,
    },

    /// Digest `Authorization` header
    Digest(Box<DigestCredential>),

    /// DER encoded client certificate
    Certificate { der: Vec<u8> },
}

impl Credential {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn digest(credential: DigestCredential) -> Self {
        Self::Digest(Box::new(credential))
    }

    pub fn certificate(der: impl Into<Vec<u8>>) -> Self {
        Self::Certificate { der: der.into() }
    }

    /// Decode the payload of a `Basic` header (`base64(username:password)`).
    ///
    /// Returns `None` when the payload is not valid base64, not UTF-8 or has
    /// no colon.
    pub fn from_basic_payload(payload: &str) -> Option<Self> {
        let decoded = Zeroizing::new(
            base64::engine::general_purpose::STANDARD
                .decode(payload.trim())
                .ok()?,
        );
        let decoded = std::str::from_utf8(&decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self::password(username, password))
    }

    /// Username asserted by the credential, if it carries one.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Password { username, .. } => Some(username),
            Self::Digest(credential) => Some(&credential.username),
            Self::Certificate { .. } => None,
        }
    }

    pub fn credential_type(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::Digest(_) => "digest",
            Self::Certificate { .. } => "certificate",
        }
    }

    /// Representation safe to log.
    pub fn safe_display(&self) -> String {
        match self {
            Self::Password { username, .. } => format!("Password(username: {username})"),
            Self::Digest(credential) => format!("Digest(username: {})", credential.username),
            Self::Certificate { der } => format!("Certificate({} bytes)", der.len()),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.safe_display())
    }
}
