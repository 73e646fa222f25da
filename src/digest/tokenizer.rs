//! Tokenizer for `Authorization` and `WWW-Authenticate` digest parameter lists.
//!
//! Parameter lists are comma separated `key="value"` or `key=value` tokens.
//! Commas inside quoted values never split a token, and surrounding quotes are
//! stripped from values when they are extracted.

use crate::errors::DigestError;
use std::collections::BTreeMap;

/// Split a parameter list on commas that are not inside double quotes.
///
/// Each returned token is trimmed and keeps its quotes. Empty tokens (for
/// example from a trailing comma) are dropped.
pub fn quote_tokenize(input: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, ch) in input.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                push_token(&mut tokens, &input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    push_token(&mut tokens, &input[start..]);

    tokens
}

fn push_token<'a>(tokens: &mut Vec<&'a str>, raw: &'a str) {
    let token = raw.trim();
    if !token.is_empty() {
        tokens.push(token);
    }
}

/// Extract the value of `token` if it starts with `key`.
///
/// `key` includes the `=` sign, e.g. `"nonce="`. One leading and one trailing
/// double quote are removed from the value.
pub fn extract<'a>(token: &'a str, key: &str) -> Option<&'a str> {
    if !token.starts_with(key) {
        return None;
    }
    let eq = token.find('=')?;
    Some(unquote(&token[eq + 1..]))
}

/// Remove one leading and one trailing double quote, if present.
pub fn unquote(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}

/// Split a single token into its lowercase key and unquoted value.
pub fn split_param(token: &str) -> Result<(String, &str), DigestError> {
    let (key, value) = token
        .split_once('=')
        .ok_or_else(|| DigestError::MalformedParameter(token.to_string()))?;

    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(DigestError::MalformedParameter(token.to_string()));
    }

    Ok((key.to_ascii_lowercase(), unquote(value.trim())))
}

/// Strip an authentication scheme prefix (case-insensitive) such as `Digest`.
///
/// Returns the parameter list that follows the scheme name, or `None` when the
/// header uses another scheme.
pub fn strip_scheme<'a>(header: &'a str, scheme: &str) -> Option<&'a str> {
    let header = header.trim_start();
    let prefix = header.get(..scheme.len())?;
    if !prefix.eq_ignore_ascii_case(scheme) {
        return None;
    }

    let rest = &header[scheme.len()..];
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest.trim_start()),
        Some(_) => None,
    }
}

/// Parse a parameter list into a key/value map.
///
/// Later duplicates of a key overwrite earlier ones.
pub fn parse_params(input: &str) -> Result<BTreeMap<String, String>, DigestError> {
    quote_tokenize(input)
        .into_iter()
        .map(|token| split_param(token).map(|(k, v)| (k, v.to_string())))
        .collect()
}

/// Serialize parameters as `key="value"` pairs joined by `, `.
///
/// Values must not contain double quotes.
pub fn serialize_params<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    params
        .into_iter()
        .map(|(key, value)| format!("{key}=\"{value}\""))
        .collect::<Vec<_>>()
        .join(", ")
}
