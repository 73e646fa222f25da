//! Form based login.
//!
//! Unauthenticated clients are redirected to the login page; the login form
//! posts `application/x-www-form-urlencoded` credentials to the action path,
//! and a successful login redirects to the success page.

use super::{AuthType, MethodResult, verify_password};
use crate::config::FormConfig;
use crate::credentials::Credential;
use crate::digest::InvalidReason;
use crate::errors::Result;
use crate::request::{AuthRequest, AuthResponse};
use crate::storage::CredentialStore;
use http::{Method, StatusCode};

#[derive(Debug, Clone)]
pub struct FormScheme {
    realm: String,
    config: FormConfig,
}

impl FormScheme {
    pub fn new(realm: impl Into<String>, config: FormConfig) -> Self {
        Self {
            realm: realm.into(),
            config,
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Whether the request targets the login action.
    pub fn is_login_submission(&self, request: &AuthRequest) -> bool {
        request.method() == Method::POST && request.path() == self.config.action_path
    }

    /// The login page must be reachable without logging in.
    pub fn permits_anonymous(&self, request: &AuthRequest) -> bool {
        request.path() == self.config.login_page
    }

    pub fn extract_credential(
        &self,
        request: &AuthRequest,
    ) -> std::result::Result<Option<Credential>, InvalidReason> {
        if !self.is_login_submission(request) {
            return Ok(None);
        }

        match (
            request.form_value(&self.config.username_field),
            request.form_value(&self.config.password_field),
        ) {
            (Some(username), Some(password)) if !username.is_empty() => {
                Ok(Some(Credential::password(username, password)))
            }
            _ => Err(InvalidReason::MalformedHeader),
        }
    }

    pub async fn authenticate(
        &self,
        credential: &Credential,
        store: &dyn CredentialStore,
    ) -> Result<MethodResult> {
        match credential {
            Credential::Password { username, password } => {
                verify_password(store, AuthType::Form, username, password, &self.realm).await
            }
            _ => Ok(MethodResult::Failure(InvalidReason::MalformedHeader)),
        }
    }

    /// 302 redirect to the login page.
    pub fn challenge_client(&self, _request: &AuthRequest) -> Result<AuthResponse> {
        AuthResponse::redirect(StatusCode::FOUND, &self.config.login_page)
    }

    /// 303 redirect to the success page.
    pub fn post_authentication(&self, _request: &AuthRequest) -> Result<AuthResponse> {
        AuthResponse::redirect(StatusCode::SEE_OTHER, &self.config.success_page)
    }
}
