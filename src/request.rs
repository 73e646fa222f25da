//! Framework-neutral view of the HTTP exchange seen by the filter.
//!
//! Web framework integrations convert their own request types into an
//! [`AuthRequest`] and turn the filter's [`AuthResponse`] back into a response.

use crate::errors::{AuthError, Result};
use http::header::{AUTHORIZATION, HeaderName, LOCATION, WWW_AUTHENTICATE};
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use std::collections::HashMap;

/// The parts of an HTTP request the authentication schemes look at.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    form: HashMap<String, String>,
    client_certificate: Option<Vec<u8>>,
}

impl AuthRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            form: HashMap::new(),
            client_certificate: None,
        }
    }

    /// Build from the head of an `http` request.
    pub fn from_parts(parts: &http::request::Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            form: HashMap::new(),
            client_certificate: None,
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| AuthError::InvalidRequest(format!("invalid header value: {e}")))?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Set the `Authorization` header.
    pub fn with_authorization(self, value: &str) -> Result<Self> {
        self.with_header(AUTHORIZATION, value)
    }

    /// Attach an `application/x-www-form-urlencoded` body.
    pub fn with_form_body(mut self, body: &[u8]) -> Self {
        self.form = url::form_urlencoded::parse(body).into_owned().collect();
        self
    }

    /// Attach the DER certificate presented by the client during the TLS handshake.
    pub fn with_client_certificate(mut self, der: Vec<u8>) -> Self {
        self.client_certificate = Some(der);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if present and valid UTF-8.
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `Authorization` header, if any.
    pub fn authorization(&self) -> Option<&str> {
        self.header(&AUTHORIZATION)
    }

    pub fn form_value(&self, field: &str) -> Option<&str> {
        self.form.get(field).map(String::as_str)
    }

    pub fn client_certificate(&self) -> Option<&[u8]> {
        self.client_certificate.as_deref()
    }
}

/// A response produced by the filter instead of the protected resource.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    status: StatusCode,
    headers: HeaderMap,
}

impl AuthResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
        }
    }

    /// 401 with a `WWW-Authenticate` challenge.
    pub fn unauthorized(challenge: &str) -> Result<Self> {
        Self::new(StatusCode::UNAUTHORIZED).with_header(WWW_AUTHENTICATE, challenge)
    }

    /// A redirect to `location`.
    pub fn redirect(status: StatusCode, location: &str) -> Result<Self> {
        Self::new(status).with_header(LOCATION, location)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN)
    }

    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST)
    }

    pub fn internal_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| AuthError::internal(format!("invalid response header: {e}")))?;
        self.headers.append(name, value);
        Ok(self)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn www_authenticate(&self) -> Option<&str> {
        self.headers
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// Convert into an `http` response with the given body.
    pub fn into_http<B>(self, body: B) -> http::Response<B> {
        let mut response = http::Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accessors() {
        let request = AuthRequest::new(Method::POST, Uri::from_static("/j_security_check?x=1"))
            .with_authorization("Basic Zm9vOmJhcg==")
            .unwrap()
            .with_form_body(b"j_username=alice&j_password=s%26cret")
            .with_client_certificate(vec![1, 2, 3]);

        assert_eq!(request.path(), "/j_security_check");
        assert_eq!(request.authorization(), Some("Basic Zm9vOmJhcg=="));
        assert_eq!(request.form_value("j_username"), Some("alice"));
        assert_eq!(request.form_value("j_password"), Some("s&cret"));
        assert_eq!(request.client_certificate(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let result = AuthRequest::new(Method::GET, Uri::from_static("/"))
            .with_authorization("Digest\r\nInjected: yes");
        assert!(matches!(result, Err(AuthError::InvalidRequest(_))));
    }

    #[test]
    fn test_response_into_http() {
        let response = AuthResponse::unauthorized("Basic realm=\"r\"").unwrap();
        assert_eq!(response.www_authenticate(), Some("Basic realm=\"r\""));

        let http_response = response.into_http(());
        assert_eq!(http_response.status(), StatusCode::UNAUTHORIZED);
        assert!(http_response.headers().contains_key(WWW_AUTHENTICATE));
    }
}
