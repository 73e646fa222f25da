//! Axum integration for the authentication filter.
//!
//! [`require_authentication`] runs every request through an
//! [`AuthenticationFilter`] and either answers with the filter's challenge or
//! passes the request on with an [`AuthenticatedPrincipal`] extension.
//!
//! The middleware keeps no session of its own. Whenever a request ends
//! logged in, including the redirect after a form login, the
//! [`AuthenticatedPrincipal`] is also set on the response so an outer session
//! layer can store it and insert it into later requests.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::{Router, middleware, routing::get};
//! use http_auth_filter::integrations::axum::{AuthenticatedPrincipal, require_authentication};
//! use http_auth_filter::prelude::*;
//! use std::sync::Arc;
//!
//! async fn whoami(AuthenticatedPrincipal(principal): AuthenticatedPrincipal) -> String {
//!     principal.username
//! }
//!
//! # fn build() -> Result<Router, AuthError> {
//! let store = MemoryCredentialStore::new();
//! store.add_user("Mufasa", "testrealm@host.com", "Circle Of Life");
//!
//! let config = FilterConfig::new(AuthType::Digest).realm("testrealm@host.com");
//! let filter = Arc::new(AuthenticationFilter::new(&config, Arc::new(store))?);
//!
//! let app = Router::new()
//!     .route("/whoami", get(whoami))
//!     .layer(middleware::from_fn_with_state(filter, require_authentication));
//! # Ok(app)
//! # }
//! ```

use crate::errors::AuthError;
use crate::filter::{AuthenticationFilter, FilterDecision};
use crate::identity::{Identity, Principal, SessionIdentity};
use crate::methods::AuthScheme;
use crate::request::AuthRequest;
use axum::{
    body::{Body, to_bytes},
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

/// Largest login form body the middleware buffers.
const MAX_FORM_BODY: usize = 16 * 1024;

/// DER client certificate, inserted as a request extension by the TLS layer.
#[derive(Debug, Clone)]
pub struct ClientCertificate(pub Vec<u8>);

/// The principal the request was authenticated as.
///
/// Inserted by [`require_authentication`] into the request extensions and
/// into the response extensions. An upstream session layer may insert it
/// into the request too, in which case the request counts as already
/// logged in.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

/// Authentication middleware, for use with
/// [`axum::middleware::from_fn_with_state`].
pub async fn require_authentication(
    State(filter): State<Arc<AuthenticationFilter>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let mut auth_request = AuthRequest::from_parts(&parts);
    if let Some(ClientCertificate(der)) = parts.extensions.get::<ClientCertificate>() {
        auth_request = auth_request.with_client_certificate(der.clone());
    }

    let body = match filter.scheme() {
        AuthScheme::Form(scheme) if scheme.is_login_submission(&auth_request) => {
            let bytes = match to_bytes(body, MAX_FORM_BODY).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Unreadable login form body: {}", e);
                    return StatusCode::PAYLOAD_TOO_LARGE.into_response();
                }
            };
            auth_request = auth_request.with_form_body(&bytes);
            Body::from(bytes)
        }
        _ => body,
    };

    let mut identity = match parts.extensions.get::<AuthenticatedPrincipal>() {
        Some(AuthenticatedPrincipal(principal)) => SessionIdentity::logged_in(principal.clone()),
        None => SessionIdentity::new(),
    };

    match filter.process(&auth_request, &mut identity).await {
        FilterDecision::Proceed(_) => {
            let principal = identity.principal().cloned().map(AuthenticatedPrincipal);
            if let Some(principal) = &principal {
                parts.extensions.insert(principal.clone());
            }

            let mut response = next.run(Request::from_parts(parts, body)).await;
            if let Some(principal) = principal {
                response.extensions_mut().insert(principal);
            }
            response
        }
        FilterDecision::Respond(_, response) => {
            let mut response = response.into_http(Body::empty()).into_response();
            if let Some(principal) = identity.principal() {
                response
                    .extensions_mut()
                    .insert(AuthenticatedPrincipal(principal.clone()));
            }
            response
        }
    }
}

impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedPrincipal>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::InvalidRequest(_) | AuthError::Digest(_) => {
                (StatusCode::BAD_REQUEST, "Bad request")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        (status, message).into_response()
    }
}
