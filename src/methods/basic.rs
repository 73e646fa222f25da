//! HTTP Basic authentication.

use super::{AuthType, MethodResult, verify_password};
use crate::credentials::Credential;
use crate::digest::{InvalidReason, strip_scheme};
use crate::errors::Result;
use crate::request::{AuthRequest, AuthResponse};
use crate::storage::CredentialStore;

/// `Authorization: Basic base64(username:password)`.
#[derive(Debug, Clone)]
pub struct BasicScheme {
    realm: String,
}

impl BasicScheme {
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn extract_credential(
        &self,
        request: &AuthRequest,
    ) -> std::result::Result<Option<Credential>, InvalidReason> {
        let Some(payload) = request
            .authorization()
            .and_then(|header| strip_scheme(header, "Basic"))
        else {
            return Ok(None);
        };

        Credential::from_basic_payload(payload)
            .map(Some)
            .ok_or(InvalidReason::MalformedHeader)
    }

    pub async fn authenticate(
        &self,
        credential: &Credential,
        store: &dyn CredentialStore,
    ) -> Result<MethodResult> {
        match credential {
            Credential::Password { username, password } => {
                verify_password(store, AuthType::Basic, username, password, &self.realm).await
            }
            _ => Ok(MethodResult::Failure(InvalidReason::MalformedHeader)),
        }
    }

    /// 401 with `WWW-Authenticate: Basic realm="..."`.
    pub fn challenge_client(&self) -> Result<AuthResponse> {
        AuthResponse::unauthorized(&format!("Basic realm=\"{}\"", self.realm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCredentialStore;
    use http::{Method, Uri};

    fn request(authorization: &str) -> AuthRequest {
        AuthRequest::new(Method::GET, Uri::from_static("/"))
            .with_authorization(authorization)
            .unwrap()
    }

    #[test]
    fn test_extract_credential() {
        let scheme = BasicScheme::new("r");

        let credential = scheme
            .extract_credential(&request("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="))
            .unwrap()
            .unwrap();
        assert_eq!(credential.username(), Some("Aladdin"));

        assert!(
            scheme
                .extract_credential(&AuthRequest::new(Method::GET, Uri::from_static("/")))
                .unwrap()
                .is_none()
        );
        assert!(
            scheme
                .extract_credential(&request("Bearer abc"))
                .unwrap()
                .is_none()
        );
        assert_eq!(
            scheme.extract_credential(&request("Basic !!!")).unwrap_err(),
            InvalidReason::MalformedHeader
        );
    }

    #[tokio::test]
    async fn test_authenticate() {
        let store = MemoryCredentialStore::new();
        store.add_user("Aladdin", "r", "open sesame");
        let scheme = BasicScheme::new("r");

        let result = scheme
            .authenticate(&Credential::password("Aladdin", "open sesame"), &store)
            .await
            .unwrap();
        assert!(matches!(result, MethodResult::Success(p) if p.auth_type == AuthType::Basic));

        let result = scheme
            .authenticate(&Credential::password("Aladdin", "wrong"), &store)
            .await
            .unwrap();
        assert_eq!(result, MethodResult::Failure(InvalidReason::HashMismatch));

        let result = scheme
            .authenticate(&Credential::password("nobody", "x"), &store)
            .await
            .unwrap();
        assert_eq!(result, MethodResult::Failure(InvalidReason::UnknownUser));
    }

    #[test]
    fn test_challenge() {
        let response = BasicScheme::new("Default Realm").challenge_client().unwrap();
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(response.www_authenticate(), Some("Basic realm=\"Default Realm\""));
    }
}
