//! Configuration loading tests
//!
//! Loads `FilterConfig` from files and environment variables through
//! `ConfigManager` and builds filters from the result.

use http_auth_filter::config::config_manager::{ConfigBuilder, ConfigManager};
use http_auth_filter::prelude::*;
use std::io::Write;
use std::sync::Arc;

fn config_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp config file");
    file.write_all(contents.as_bytes())
        .expect("write temp config file");
    file
}

#[test]
fn test_load_toml_file() {
    let file = config_file(
        ".toml",
        r#"
auth_type = "DIGEST"
realm = "testrealm@host.com"
unprotected_methods = ["OPTIONS"]
force_reauthentication = true

[nonce]
ttl_seconds = 120
enforce_nonce_count = false
"#,
    );

    let manager = ConfigBuilder::new()
        .with_env_prefix("AUTH_FILTER_TOML_TEST")
        .add_file(file.path(), true)
        .build()
        .unwrap();
    let config = manager.filter_config().unwrap();

    assert_eq!(config.auth_type, AuthType::Digest);
    assert_eq!(config.realm_name(), "testrealm@host.com");
    assert_eq!(config.unprotected_methods, vec!["OPTIONS".to_string()]);
    assert!(config.force_reauthentication);
    assert_eq!(config.nonce.ttl_seconds, 120);
    assert_eq!(config.nonce.stale_retention_seconds, 300, "unset keys keep defaults");
    assert!(!config.nonce.enforce_nonce_count);
    assert_eq!(config.form.action_path, "/j_security_check");
}

#[test]
fn test_load_yaml_form_config() {
    let file = config_file(
        ".yaml",
        r#"
auth_type: form
form:
  action_path: /session
  login_page: /signin
  username_field: user
  password_field: pass
"#,
    );

    let manager = ConfigBuilder::new()
        .with_env_prefix("AUTH_FILTER_YAML_TEST")
        .add_file(file.path(), true)
        .build()
        .unwrap();
    let config = manager.filter_config().unwrap();

    assert_eq!(config.auth_type, AuthType::Form);
    assert_eq!(config.form.action_path, "/session");
    assert_eq!(config.form.login_page, "/signin");
    assert_eq!(config.form.success_page, "/");
    assert_eq!(config.form.username_field, "user");
    assert!(manager.sources()[0].ends_with(".yaml"));
}

#[test]
fn test_unknown_auth_type_is_rejected() {
    let file = config_file(".toml", "auth_type = \"kerberos\"\n");

    let manager = ConfigBuilder::new()
        .with_env_prefix("AUTH_FILTER_UNKNOWN_TEST")
        .add_file(file.path(), true)
        .build()
        .unwrap();
    assert!(manager.filter_config().is_err());
}

#[test]
fn test_invalid_values_are_rejected() {
    let file = config_file(
        ".toml",
        r#"
auth_type = "form"

[form]
login_page = "login.html"
"#,
    );

    let manager = ConfigBuilder::new()
        .with_env_prefix("AUTH_FILTER_INVALID_TEST")
        .add_file(file.path(), true)
        .build()
        .unwrap();
    assert!(matches!(
        manager.filter_config(),
        Err(AuthError::Configuration { .. })
    ));
}

#[test]
fn test_optional_missing_file_uses_defaults() {
    let manager = ConfigBuilder::new()
        .with_env_prefix("AUTH_FILTER_OPTIONAL_TEST")
        .add_file("/nonexistent/auth-filter.toml", false)
        .build()
        .unwrap();
    let config = manager.filter_config().unwrap();
    assert_eq!(config.auth_type, AuthType::Digest);

    assert!(ConfigManager::from_file("/nonexistent/auth-filter.toml").is_err());
}

#[test]
fn test_environment_overrides_file() {
    let file = config_file(
        ".toml",
        r#"
auth_type = "digest"
realm = "from file"
"#,
    );

    // SAFETY: the variables use a prefix no other test reads.
    unsafe {
        std::env::set_var("AUTH_FILTER_ENV_TEST_AUTH_TYPE", "basic");
        std::env::set_var("AUTH_FILTER_ENV_TEST_UNPROTECTED_METHODS", "OPTIONS,HEAD");
        std::env::set_var("AUTH_FILTER_ENV_TEST_NONCE__TTL_SECONDS", "45");
    }

    let manager = ConfigBuilder::new()
        .with_env_prefix("AUTH_FILTER_ENV_TEST")
        .add_file(file.path(), true)
        .build()
        .unwrap();
    let config = manager.filter_config().unwrap();

    assert_eq!(config.auth_type, AuthType::Basic);
    assert_eq!(config.realm_name(), "from file");
    assert_eq!(
        config.unprotected_methods,
        vec!["OPTIONS".to_string(), "HEAD".to_string()]
    );
    assert_eq!(config.nonce.ttl_seconds, 45);
    assert_eq!(manager.env_prefix(), "AUTH_FILTER_ENV_TEST");
}

#[tokio::test]
async fn test_filter_from_loaded_config() {
    let file = config_file(
        ".json",
        r#"{ "auth_type": "basic", "realm": "Shop" }"#,
    );

    let config = ConfigBuilder::new()
        .with_env_prefix("AUTH_FILTER_JSON_TEST")
        .add_file(file.path(), true)
        .build()
        .unwrap()
        .filter_config()
        .unwrap();

    let filter = AuthenticationFilter::new(&config, Arc::new(MemoryCredentialStore::new())).unwrap();
    let request = AuthRequest::new(http::Method::GET, http::Uri::from_static("/"));
    let decision = filter.process(&request, &mut SessionIdentity::new()).await;

    assert_eq!(
        decision.response().and_then(|r| r.www_authenticate()),
        Some("Basic realm=\"Shop\"")
    );
}
