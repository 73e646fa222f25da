//! Timing attack protection utilities
//!
//! Digest responses, stored HA1 values and opaque tokens are compared with
//! these helpers so that the time taken does not reveal where two values
//! first differ.

use subtle::ConstantTimeEq;

/// Perform constant-time comparison of byte arrays
///
/// Arrays of different lengths compare unequal immediately; the length of a
/// hex digest is not secret.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Perform a constant-time string comparison
pub fn constant_time_string_compare(a: &str, b: &str) -> bool {
    constant_time_compare(a.as_bytes(), b.as_bytes())
}

/// Constant-time comparison of hex strings, ignoring ASCII case.
///
/// Clients may send digests in upper case; both sides are folded to lower
/// case before comparing.
pub fn constant_time_hex_compare(expected: &str, supplied: &str) -> bool {
    let supplied = supplied.to_ascii_lowercase();
    let expected = expected.to_ascii_lowercase();
    constant_time_compare(expected.as_bytes(), supplied.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        let a = b"hello";
        let b = b"hello";
        let c = b"world";

        assert!(constant_time_compare(a, b));
        assert!(!constant_time_compare(a, c));
        assert!(!constant_time_compare(a, b"hi"));
    }

    #[test]
    fn test_constant_time_string_compare() {
        assert!(constant_time_string_compare("hello", "hello"));
        assert!(!constant_time_string_compare("hello", "world"));
        assert!(!constant_time_string_compare("hello", "hi"));
    }

    #[test]
    fn test_constant_time_hex_compare_ignores_case() {
        assert!(constant_time_hex_compare(
            "6629fae49393a05397450978507c4ef1",
            "6629FAE49393A05397450978507C4EF1"
        ));
        assert!(!constant_time_hex_compare(
            "6629fae49393a05397450978507c4ef1",
            "6629fae49393a05397450978507c4ef2"
        ));
    }
}
