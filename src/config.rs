//! Configuration types for the authentication filter.

pub mod config_manager;

use crate::errors::{AuthError, Result};
use crate::methods::AuthType;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Realm presented to clients when none is configured.
pub const DEFAULT_REALM: &str = "Default Realm";

/// Main configuration for the authentication filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Authentication scheme used to challenge clients
    pub auth_type: AuthType,

    /// Protection space presented to clients
    pub realm: Option<String>,

    /// Request methods that bypass authentication
    pub unprotected_methods: Vec<String>,

    /// Log out and re-authenticate whenever a request carries credentials
    pub force_reauthentication: bool,

    /// Reject Digest credentials whose `uri` differs from the request-target
    pub verify_digest_uri: bool,

    /// Digest nonce settings
    pub nonce: NonceConfig,

    /// Form login settings
    pub form: FormConfig,
}

/// Nonce lifecycle settings for the Digest scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NonceConfig {
    /// How long an issued nonce is accepted
    pub ttl_seconds: u64,

    /// How long an expired nonce is remembered so clients are told it is stale
    pub stale_retention_seconds: u64,

    /// Require strictly increasing nonce counts per nonce
    pub enforce_nonce_count: bool,

    /// Most nonces tracked at once; the oldest are evicted past this
    pub max_entries: usize,
}

/// Form login settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Path the login form posts to
    pub action_path: String,

    /// Page unauthenticated clients are redirected to
    pub login_page: String,

    /// Page clients are redirected to after logging in
    pub success_page: String,

    /// Form field carrying the username
    pub username_field: String,

    /// Form field carrying the password
    pub password_field: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            auth_type: AuthType::Digest,
            realm: None,
            unprotected_methods: Vec::new(),
            force_reauthentication: false,
            verify_digest_uri: false,
            nonce: NonceConfig::default(),
            form: FormConfig::default(),
        }
    }
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,             // 5 minutes
            stale_retention_seconds: 300, // 5 minutes
            enforce_nonce_count: true,
            max_entries: 10_000,
        }
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            action_path: "/j_security_check".to_string(),
            login_page: "/login".to_string(),
            success_page: "/".to_string(),
            username_field: "j_username".to_string(),
            password_field: "j_password".to_string(),
        }
    }
}

impl FilterConfig {
    /// Create a configuration for the given scheme with default values.
    pub fn new(auth_type: AuthType) -> Self {
        Self {
            auth_type,
            ..Default::default()
        }
    }

    /// Set the realm.
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// Set the methods that bypass authentication.
    pub fn unprotected_methods(mut self, methods: &[&str]) -> Self {
        self.unprotected_methods = methods.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Enable or disable forced re-authentication.
    pub fn force_reauthentication(mut self, enabled: bool) -> Self {
        self.force_reauthentication = enabled;
        self
    }

    /// Enable or disable the Digest `uri` check against the request-target.
    pub fn verify_digest_uri(mut self, enabled: bool) -> Self {
        self.verify_digest_uri = enabled;
        self
    }

    /// Set the nonce configuration.
    pub fn nonce(mut self, config: NonceConfig) -> Self {
        self.nonce = config;
        self
    }

    /// Set the form login configuration.
    pub fn form(mut self, config: FormConfig) -> Self {
        self.form = config;
        self
    }

    /// The configured realm, or [`DEFAULT_REALM`] when unset or blank.
    pub fn realm_name(&self) -> &str {
        match self.realm.as_deref() {
            Some(realm) if !realm.trim().is_empty() => realm,
            _ => DEFAULT_REALM,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.realm_name().contains('"') || self.realm_name().contains(['\r', '\n']) {
            return Err(AuthError::config(
                "Realm must not contain quotes or line breaks",
            ));
        }

        if self.nonce.ttl_seconds == 0 {
            return Err(AuthError::config("Nonce TTL must be greater than 0"));
        }

        if self.nonce.max_entries == 0 {
            return Err(AuthError::config("Nonce capacity must be greater than 0"));
        }

        for method in &self.unprotected_methods {
            if method.trim().is_empty() {
                return Err(AuthError::config("Unprotected methods must not be blank"));
            }
        }

        if self.auth_type == AuthType::Form {
            self.form.validate()?;
        }

        Ok(())
    }
}

impl NonceConfig {
    /// Nonce lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Retention of expired nonces.
    pub fn stale_retention(&self) -> Duration {
        Duration::from_secs(self.stale_retention_seconds)
    }

    /// Set the nonce lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_seconds = ttl.as_secs();
        self
    }

    /// Enable or disable nonce count enforcement.
    pub fn with_nonce_count_enforcement(mut self, enabled: bool) -> Self {
        self.enforce_nonce_count = enabled;
        self
    }

    /// Set the most nonces tracked at once.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }
}

impl FormConfig {
    fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("action_path", &self.action_path),
            ("login_page", &self.login_page),
            ("success_page", &self.success_page),
        ] {
            if !path.starts_with('/') {
                return Err(AuthError::config(format!(
                    "Form {name} must be an absolute path, got '{path}'"
                )));
            }
        }

        if self.username_field.is_empty() || self.password_field.is_empty() {
            return Err(AuthError::config("Form field names must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_realm() {
        let config = FilterConfig::new(AuthType::Digest);
        assert_eq!(config.realm_name(), DEFAULT_REALM);

        let config = config.realm("   ");
        assert_eq!(config.realm_name(), DEFAULT_REALM);

        let config = FilterConfig::new(AuthType::Basic).realm("testrealm@host.com");
        assert_eq!(config.realm_name(), "testrealm@host.com");
    }

    #[test]
    fn test_validate() {
        assert!(FilterConfig::default().validate().is_ok());

        let config = FilterConfig::default().realm("bad\"realm");
        assert!(config.validate().is_err());

        let config = FilterConfig::default().nonce(NonceConfig {
            ttl_seconds: 0,
            ..Default::default()
        });
        assert!(config.validate().is_err());

        let config = FilterConfig::default().nonce(NonceConfig::default().with_max_entries(0));
        assert!(config.validate().is_err());

        let config = FilterConfig::default().unprotected_methods(&["GET", " "]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_form_paths_must_be_absolute() {
        let form = FormConfig {
            login_page: "login.html".to_string(),
            ..Default::default()
        };
        let config = FilterConfig::new(AuthType::Form).form(form);
        assert!(config.validate().is_err());
    }
}
