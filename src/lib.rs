/*!
# HTTP Auth Filter

An HTTP authentication filter for Rust services, built around an RFC 2617
Digest challenge/response core.

The filter sits in front of protected resources. It extracts the client's
credential for the configured scheme, checks it against a
[`CredentialStore`](storage::CredentialStore) and either lets the request
through or answers with a challenge.

## Features

- HTTP Digest (`qop=auth`, MD5) with CSPRNG nonces, single-use nonce counts
  and `stale=true` re-challenges
- HTTP Basic, form login and TLS client certificate schemes
- Constant-time comparison of secrets
- Unprotected request methods and forced re-authentication
- Configuration from files and environment variables
- Axum middleware behind the `axum-integration` feature

## Quick Start

```rust
use http::{Method, Uri};
use http_auth_filter::prelude::*;
use http_auth_filter::testing::DigestClient;
use std::sync::Arc;

# #[tokio::main]
# async fn main() -> Result<(), AuthError> {
let store = MemoryCredentialStore::new();
store.add_user("Mufasa", "testrealm@host.com", "Circle Of Life");

let config = FilterConfig::new(AuthType::Digest).realm("testrealm@host.com");
let filter = AuthenticationFilter::new(&config, Arc::new(store))?;
let mut identity = SessionIdentity::new();

// The first request carries no credential and is challenged.
let request = AuthRequest::new(Method::GET, Uri::from_static("/dir/index.html"));
let decision = filter.process(&request, &mut identity).await;
let challenge = decision.response().and_then(|r| r.www_authenticate()).unwrap();

// The client answers the challenge.
let client = DigestClient::new("Mufasa", "Circle Of Life");
let authorization = client.authorize(challenge, "GET", "/dir/index.html")?;
let request = request.with_authorization(&authorization)?;

let decision = filter.process(&request, &mut identity).await;
assert_eq!(decision.state(), AuthState::Authenticated);
# Ok(())
# }
```

## Security Considerations

- Digest with MD5 protects the password, not the exchange; use HTTPS
- Credential stores keep `HA1 = MD5(username:realm:password)`, which is
  password-equivalent for its realm and must be protected like a password
- Run [`AuthenticationFilter::spawn_nonce_sweeper`](filter::AuthenticationFilter::spawn_nonce_sweeper)
  so expired nonces do not accumulate
*/

pub mod config;
pub mod credentials;
pub mod digest;
pub mod errors;
pub mod filter;
pub mod identity;
pub mod methods;
pub mod prelude;
pub mod request;
pub mod security;
pub mod storage;
pub mod testing;

// Web framework integrations
pub mod integrations {
    #[cfg(feature = "axum-integration")]
    pub mod axum;
}

pub use config::{FilterConfig, FormConfig, NonceConfig};
pub use credentials::Credential;
pub use errors::{AuthError, Result};
pub use filter::{AuthState, AuthenticationFilter, FilterDecision};
pub use identity::{Identity, Principal, SessionIdentity};
pub use methods::{AuthScheme, AuthType, MethodResult};
pub use request::{AuthRequest, AuthResponse};
pub use storage::{CredentialStore, MemoryCredentialStore, StoredCredential};
