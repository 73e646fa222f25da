//! RFC 2617 digest computations.
//!
//! All digests are MD5, rendered as lowercase hex.

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Digest algorithms understood by the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    #[default]
    #[serde(rename = "MD5")]
    Md5,
}

/// Quality of protection values understood by the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Qop {
    #[default]
    #[serde(rename = "auth")]
    Auth,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("MD5") {
            Ok(DigestAlgorithm::Md5)
        } else {
            Err(format!("unsupported digest algorithm '{s}'"))
        }
    }
}

impl Qop {
    pub fn as_str(&self) -> &'static str {
        match self {
            Qop::Auth => "auth",
        }
    }
}

impl fmt::Display for Qop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Qop {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "auth" {
            Ok(Qop::Auth)
        } else {
            Err(format!("unsupported qop '{s}'"))
        }
    }
}

/// MD5 over `parts` joined by `:`, as lowercase hex.
pub fn md5_hex(parts: &[&str]) -> String {
    let mut hasher = Md5::new();
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            hasher.update(b":");
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// HA1 = MD5(username ":" realm ":" password).
///
/// This is the value a credential store keeps instead of the password.
pub fn calculate_ha1(username: &str, realm: &str, password: &str) -> String {
    md5_hex(&[username, realm, password])
}

/// HA2 = MD5(method ":" digest-uri).
pub fn calculate_ha2(method: &str, uri: &str) -> String {
    md5_hex(&[method, uri])
}

/// Response = MD5(HA1 ":" nonce ":" nc ":" cnonce ":" qop ":" HA2).
pub fn calculate_response(
    ha1: &str,
    nonce: &str,
    nonce_count: &str,
    cnonce: &str,
    qop: &str,
    ha2: &str,
) -> String {
    md5_hex(&[ha1, nonce, nonce_count, cnonce, qop, ha2])
}

/// Whether `nc` is exactly eight hex digits.
pub fn is_valid_nonce_count(nc: &str) -> bool {
    nc.len() == 8 && nc.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Parse an eight hex digit nonce count.
pub fn parse_nonce_count(nc: &str) -> Option<u32> {
    if is_valid_nonce_count(nc) {
        u32::from_str_radix(nc, 16).ok()
    } else {
        None
    }
}
