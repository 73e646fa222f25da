//! The per-request authentication state machine.
//!
//! ```text
//! Unauthenticated -> Challenged                      no or unparsable credential
//! Challenged      -> Verifying                       credential extracted
//! Verifying       -> Authenticated                   store accepts the credential
//! Verifying       -> Challenged                      rejected, fresh challenge issued
//! Verifying       -> Rejected                        400 or store failure
//! ```
//!
//! Each request is processed inside the filter's [`Span`]; there is no global
//! logger.

use crate::config::FilterConfig;
use crate::digest::InvalidReason;
use crate::errors::Result;
use crate::identity::Identity;
use crate::methods::{AuthScheme, MethodResult};
use crate::request::{AuthRequest, AuthResponse};
use crate::storage::CredentialStore;
use http::Method;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, Span, debug, error, info, warn};

/// Where a request ended up in the authentication flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Challenged,
    Verifying,
    Authenticated,

    /// The request was refused without a challenge
    Rejected,
}

/// What the caller should do with the request.
#[derive(Debug, Clone)]
pub enum FilterDecision {
    /// Pass the request on to the protected resource
    Proceed(AuthState),

    /// Answer with the response instead
    Respond(AuthState, AuthResponse),
}

impl FilterDecision {
    pub fn state(&self) -> AuthState {
        match self {
            FilterDecision::Proceed(state) | FilterDecision::Respond(state, _) => *state,
        }
    }

    pub fn response(&self) -> Option<&AuthResponse> {
        match self {
            FilterDecision::Proceed(_) => None,
            FilterDecision::Respond(_, response) => Some(response),
        }
    }

    pub fn into_response(self) -> Option<AuthResponse> {
        match self {
            FilterDecision::Proceed(_) => None,
            FilterDecision::Respond(_, response) => Some(response),
        }
    }

    pub fn is_proceed(&self) -> bool {
        matches!(self, FilterDecision::Proceed(_))
    }
}

/// Authenticates requests with one configured scheme.
pub struct AuthenticationFilter {
    scheme: AuthScheme,
    store: Arc<dyn CredentialStore>,
    unprotected_methods: HashSet<String>,
    force_reauthentication: bool,
    span: Span,
}

impl AuthenticationFilter {
    /// Build a filter from validated configuration.
    pub fn new(config: &FilterConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        config.validate()?;

        let scheme = AuthScheme::from_config(config)?;
        let span = tracing::info_span!(
            "auth_filter",
            auth_type = %config.auth_type,
            realm = config.realm_name()
        );

        info!(
            parent: &span,
            "Authentication filter configured with {} scheme", config.auth_type
        );

        Ok(Self {
            scheme,
            store,
            unprotected_methods: config
                .unprotected_methods
                .iter()
                .map(|method| method.trim().to_ascii_uppercase())
                .collect(),
            force_reauthentication: config.force_reauthentication,
            span,
        })
    }

    /// Process requests inside `span` instead of the default one.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn scheme(&self) -> &AuthScheme {
        &self.scheme
    }

    /// Whether requests with `method` must authenticate.
    pub fn is_protected(&self, method: &Method) -> bool {
        !self
            .unprotected_methods
            .contains(&method.as_str().to_ascii_uppercase())
    }

    /// Sweep expired Digest nonces every `interval`.
    ///
    /// Returns `None` for schemes without nonces. Must be called from within a
    /// tokio runtime.
    pub fn spawn_nonce_sweeper(&self, interval: Duration) -> Option<tokio::task::JoinHandle<()>> {
        self.scheme
            .nonces()
            .map(|nonces| nonces.spawn_sweeper(interval))
    }

    /// Decide what happens to `request`, updating `identity` on login.
    ///
    /// Failures of the filter itself are logged and answered with 500.
    pub async fn process(
        &self,
        request: &AuthRequest,
        identity: &mut dyn Identity,
    ) -> FilterDecision {
        let span = self.span.clone();
        async {
            match self.decide(request, identity).await {
                Ok(decision) => decision,
                Err(e) => {
                    error!("Authentication of {} {} failed: {}", request.method(), request.path(), e);
                    FilterDecision::Respond(AuthState::Rejected, AuthResponse::internal_error())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn decide(
        &self,
        request: &AuthRequest,
        identity: &mut dyn Identity,
    ) -> Result<FilterDecision> {
        let current = if identity.is_logged_in() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        };

        if !self.is_protected(request.method()) || self.scheme.permits_anonymous(request) {
            debug!("{} {} is not protected", request.method(), request.path());
            return Ok(FilterDecision::Proceed(current));
        }

        let extracted = self.scheme.extract_credential(request);

        if identity.is_logged_in() {
            let carries_credential = matches!(extracted, Ok(Some(_)));
            if !(self.force_reauthentication && carries_credential) {
                return Ok(FilterDecision::Proceed(AuthState::Authenticated));
            }
            debug!("Re-authenticating logged in identity");
            identity.logout();
        }

        let credential = match extracted {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                debug!("No credential on {} {}, challenging", request.method(), request.path());
                return self.challenge(request, None);
            }
            Err(reason) => {
                warn!("Rejected credential on {}: {}", request.path(), reason);
                return self.challenge(request, Some(reason));
            }
        };

        debug!(
            state = ?AuthState::Verifying,
            "Verifying credential: {}",
            credential.safe_display()
        );

        match self
            .scheme
            .authenticate(&credential, self.store.as_ref())
            .await?
        {
            MethodResult::Success(principal) => {
                info!(
                    "Authentication successful for user '{}' with {} scheme",
                    principal.username, principal.auth_type
                );
                identity.login(principal);

                Ok(match self.scheme.post_authentication(request)? {
                    Some(response) => FilterDecision::Respond(AuthState::Authenticated, response),
                    None => FilterDecision::Proceed(AuthState::Authenticated),
                })
            }
            MethodResult::Failure(reason) => {
                warn!(
                    "Authentication failed for {}: {}",
                    credential.safe_display(),
                    reason
                );
                self.challenge(request, Some(reason))
            }
        }
    }

    fn challenge(
        &self,
        request: &AuthRequest,
        reason: Option<InvalidReason>,
    ) -> Result<FilterDecision> {
        let response = self.scheme.challenge_client(request, reason)?;
        let state = if reason.is_none_or(|reason| reason.requires_challenge()) {
            AuthState::Challenged
        } else {
            AuthState::Rejected
        };
        Ok(FilterDecision::Respond(state, response))
    }
}

impl std::fmt::Debug for AuthenticationFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationFilter")
            .field("scheme", &self.scheme)
            .field("unprotected_methods", &self.unprotected_methods)
            .field("force_reauthentication", &self.force_reauthentication)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Principal, SessionIdentity};
    use crate::methods::AuthType;
    use crate::storage::MemoryCredentialStore;
    use http::{StatusCode, Uri};

    fn filter(config: FilterConfig) -> AuthenticationFilter {
        let store = MemoryCredentialStore::new();
        store.add_user("alice", config.realm_name(), "secret");
        AuthenticationFilter::new(&config, Arc::new(store)).unwrap()
    }

    fn get(path: &'static str) -> AuthRequest {
        AuthRequest::new(Method::GET, Uri::from_static(path))
    }

    #[tokio::test]
    async fn test_missing_credential_is_challenged() {
        let filter = filter(FilterConfig::default());
        let mut identity = SessionIdentity::new();

        let decision = filter.process(&get("/private"), &mut identity).await;
        assert_eq!(decision.state(), AuthState::Challenged);

        let response = decision.response().unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(
            response
                .www_authenticate()
                .unwrap()
                .starts_with("Digest realm=\"Default Realm\", nonce=\"")
        );
        assert!(!identity.is_logged_in());
    }

    #[tokio::test]
    async fn test_unprotected_methods_bypass() {
        let filter = filter(FilterConfig::default().unprotected_methods(&["options", "HEAD"]));
        let mut identity = SessionIdentity::new();

        assert!(filter.is_protected(&Method::GET));
        assert!(!filter.is_protected(&Method::OPTIONS));

        let request = AuthRequest::new(Method::HEAD, Uri::from_static("/private"));
        let decision = filter.process(&request, &mut identity).await;
        assert!(matches!(decision, FilterDecision::Proceed(AuthState::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_logged_in_identity_passes() {
        let filter = filter(FilterConfig::new(AuthType::Basic));
        let mut identity =
            SessionIdentity::logged_in(Principal::new("alice", AuthType::Basic));

        let request = get("/private")
            .with_authorization("Basic bm9ib2R5Ondyb25n")
            .unwrap();
        let decision = filter.process(&request, &mut identity).await;
        assert!(matches!(decision, FilterDecision::Proceed(AuthState::Authenticated)));
        assert!(identity.is_logged_in());
    }

    #[tokio::test]
    async fn test_basic_login() {
        let filter = filter(FilterConfig::new(AuthType::Basic).realm("Shop"));
        let mut identity = SessionIdentity::new();

        // alice:secret
        let request = get("/private")
            .with_authorization("Basic YWxpY2U6c2VjcmV0")
            .unwrap();
        let decision = filter.process(&request, &mut identity).await;
        assert!(matches!(decision, FilterDecision::Proceed(AuthState::Authenticated)));
        assert_eq!(identity.principal().unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_unparsable_digest_header_is_challenged() {
        let filter = filter(FilterConfig::default());
        let mut identity = SessionIdentity::new();

        let request = get("/private")
            .with_authorization("Digest username=\"alice\"")
            .unwrap();
        let decision = filter.process(&request, &mut identity).await;
        assert_eq!(decision.state(), AuthState::Challenged);
        assert_eq!(
            decision.response().unwrap().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_custom_span() {
        let filter = filter(FilterConfig::default())
            .with_span(tracing::info_span!("custom_filter_span"));
        let mut identity = SessionIdentity::new();

        let decision = filter.process(&get("/"), &mut identity).await;
        assert_eq!(decision.state(), AuthState::Challenged);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = FilterConfig::default().realm("bad \"realm\"");
        let result = AuthenticationFilter::new(&config, Arc::new(MemoryCredentialStore::new()));
        assert!(result.is_err());
    }
}
