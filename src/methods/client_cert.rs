//! TLS client certificate authentication.
//!
//! The TLS terminator hands the DER certificate to the filter; the credential
//! store maps its SHA-256 fingerprint to a username.

use super::{AuthType, MethodResult};
use crate::credentials::Credential;
use crate::digest::InvalidReason;
use crate::errors::Result;
use crate::identity::Principal;
use crate::request::AuthRequest;
use crate::storage::{CredentialStore, certificate_fingerprint};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ClientCertScheme;

impl ClientCertScheme {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_credential(&self, request: &AuthRequest) -> Option<Credential> {
        request.client_certificate().map(Credential::certificate)
    }

    pub async fn authenticate(
        &self,
        credential: &Credential,
        store: &dyn CredentialStore,
    ) -> Result<MethodResult> {
        let Credential::Certificate { der } = credential else {
            return Ok(MethodResult::Failure(InvalidReason::MalformedHeader));
        };

        let fingerprint = certificate_fingerprint(der);
        match store.user_for_certificate(&fingerprint).await? {
            Some(username) => Ok(MethodResult::Success(Principal::new(
                username,
                AuthType::ClientCert,
            ))),
            None => {
                debug!("No user mapped to certificate {}", fingerprint);
                Ok(MethodResult::Failure(InvalidReason::UnknownUser))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCredentialStore;
    use http::{Method, Uri};

    #[tokio::test]
    async fn test_certificate_login() {
        let store = MemoryCredentialStore::new();
        store.add_certificate(b"carol's certificate", "carol");
        let scheme = ClientCertScheme::new();

        let request = AuthRequest::new(Method::GET, Uri::from_static("/"))
            .with_client_certificate(b"carol's certificate".to_vec());
        let credential = scheme.extract_credential(&request).unwrap();

        let result = scheme.authenticate(&credential, &store).await.unwrap();
        assert!(matches!(result, MethodResult::Success(p) if p.username == "carol"));

        let unknown = Credential::certificate(b"someone else".to_vec());
        assert_eq!(
            scheme.authenticate(&unknown, &store).await.unwrap(),
            MethodResult::Failure(InvalidReason::UnknownUser)
        );
    }

    #[test]
    fn test_no_certificate() {
        let request = AuthRequest::new(Method::GET, Uri::from_static("/"));
        assert!(ClientCertScheme::new().extract_credential(&request).is_none());
    }
}
