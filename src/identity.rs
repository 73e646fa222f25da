//! The caller's login state across requests.

use crate::methods::AuthType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Login name
    pub username: String,

    /// Scheme the user authenticated with
    pub auth_type: AuthType,

    /// When the user authenticated
    pub authenticated_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(username: impl Into<String>, auth_type: AuthType) -> Self {
        Self {
            username: username.into(),
            auth_type,
            authenticated_at: Utc::now(),
        }
    }
}

/// Login state the filter reads and updates for one client.
///
/// Implementations are usually backed by the host application's session.
pub trait Identity: Send + Sync {
    /// Whether a principal is logged in.
    fn is_logged_in(&self) -> bool {
        self.principal().is_some()
    }

    /// The logged-in principal, if any.
    fn principal(&self) -> Option<&Principal>;

    /// Record a successful login.
    fn login(&mut self, principal: Principal);

    /// Forget the logged-in principal.
    fn logout(&mut self);
}

/// In-memory identity holding at most one principal.
#[derive(Debug, Clone, Default)]
pub struct SessionIdentity {
    principal: Option<Principal>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// An identity that is already logged in as `principal`.
    pub fn logged_in(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }
}

impl Identity for SessionIdentity {
    fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    fn login(&mut self, principal: Principal) {
        self.principal = Some(principal);
    }

    fn logout(&mut self) {
        self.principal = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_logout() {
        let mut identity = SessionIdentity::new();
        assert!(!identity.is_logged_in());

        identity.login(Principal::new("alice", AuthType::Digest));
        assert!(identity.is_logged_in());
        assert_eq!(identity.principal().map(|p| p.username.as_str()), Some("alice"));

        identity.logout();
        assert!(identity.principal().is_none());
    }
}
