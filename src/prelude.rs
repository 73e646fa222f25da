//! Commonly used types.
//!
//! ```rust
//! use http_auth_filter::prelude::*;
//! ```

pub use crate::config::config_manager::{ConfigBuilder, ConfigManager};
pub use crate::config::{DEFAULT_REALM, FilterConfig, FormConfig, NonceConfig};
pub use crate::credentials::Credential;
pub use crate::digest::{
    AuthResult, DigestChallenge, DigestCredential, DigestVerifier, InvalidReason, NonceManager,
};
pub use crate::errors::{AuthError, DigestError, Result, StorageError};
pub use crate::filter::{AuthState, AuthenticationFilter, FilterDecision};
pub use crate::identity::{Identity, Principal, SessionIdentity};
pub use crate::methods::{AuthScheme, AuthType, MethodResult};
pub use crate::request::{AuthRequest, AuthResponse};
pub use crate::storage::{CredentialStore, MemoryCredentialStore, StoredCredential};

#[cfg(feature = "axum-integration")]
pub use crate::integrations::axum::{
    AuthenticatedPrincipal, ClientCertificate, require_authentication,
};
