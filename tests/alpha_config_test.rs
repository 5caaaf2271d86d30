//! Tests for loading through the alpha schema

mod common;

use common::{args, bootstrap, path_arg, write_file, RecordingLauncher};
use gatekeeper::config::{ConfigError, FlagError, LoadError};
use gatekeeper::{BootstrapError, Outcome};
use serial_test::serial;

const OVERLAY: &str = r#"
upstreamConfig:
  upstreams:
    - id: backend
      path: /
      uri: http://127.0.0.1:9090
injectRequestHeaders:
  - name: X-Forwarded-Email
    values:
      - claim: email
server:
  bindAddress: 127.0.0.1:4181
providers:
  - id: oidc=gatekeeper
    provider: oidc
    clientId: gatekeeper
    clientSecret: s3cr3t
    oidcConfig:
      issuerUrl: https://issuer.example.com
"#;

#[test]
#[serial]
fn test_alpha_start_merges_overlay() {
    let overlay = write_file(OVERLAY);
    let config = write_file("cookie_secret = \"0123456789abcdef0123456789abcdef\"\nemail_domains = [\"*\"]\n");
    let launcher = RecordingLauncher::default();

    let outcome = bootstrap(&launcher)
        .run(
            &args(&[
                "--config",
                &path_arg(config.path()),
                "--alpha-config",
                &path_arg(overlay.path()),
                "--cookie-name",
                "_alpha",
            ]),
            &mut Vec::new(),
        )
        .unwrap();

    assert_eq!(outcome, Outcome::Started);
    let options = launcher.options().unwrap();
    assert_eq!(options.cookie.name, "_alpha");
    assert_eq!(options.cookie.secret.len(), 32);
    assert_eq!(options.server.bind_address, "127.0.0.1:4181");
    assert_eq!(options.upstream_servers.upstreams[0].id, "backend");
    assert_eq!(options.providers[0].provider_type, "oidc");
    assert_eq!(options.inject_request_headers.len(), 1);
    assert!(options.inject_response_headers.is_empty());
}

#[test]
#[serial]
fn test_missing_alpha_config_is_a_load_error() {
    let launcher = RecordingLauncher::default();
    let err = bootstrap(&launcher)
        .run(&args(&["--alpha-config", "/nonexistent/alpha.yaml"]), &mut Vec::new())
        .unwrap_err();

    assert!(matches!(
        err,
        BootstrapError::Load(LoadError::AlphaLoad(ConfigError::FileNotFound(_)))
    ));
    assert!(err.to_string().starts_with("failed to load alpha options: "));
}

#[test]
#[serial]
fn test_unknown_overlay_key_is_rejected() {
    let overlay = write_file("server:\n  bindAddress: 127.0.0.1:4181\n  listen: 127.0.0.1:4182\n");
    let launcher = RecordingLauncher::default();

    let err = bootstrap(&launcher)
        .run(&args(&["--alpha-config", &path_arg(overlay.path())]), &mut Vec::new())
        .unwrap_err();

    assert!(matches!(err, BootstrapError::Load(LoadError::AlphaLoad(ConfigError::Parse(_)))));
}

#[test]
#[serial]
fn test_alpha_owned_flags_are_rejected() {
    let overlay = write_file(OVERLAY);
    let launcher = RecordingLauncher::default();

    let err = bootstrap(&launcher)
        .run(
            &args(&["--alpha-config", &path_arg(overlay.path()), "--upstream", "http://127.0.0.1:8080"]),
            &mut Vec::new(),
        )
        .unwrap_err();

    match err {
        BootstrapError::Load(LoadError::CoreOptions(inner)) => {
            assert!(matches!(*inner, LoadError::FlagParse(FlagError::Unknown(_))));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
#[serial]
fn test_empty_overlay_keeps_defaults() {
    let overlay = write_file("# nothing configured yet\n");
    let launcher = RecordingLauncher::default();

    // No provider configured, so validation fails after a successful load
    let err = bootstrap(&launcher)
        .run(
            &args(&[
                "--alpha-config",
                &path_arg(overlay.path()),
                "--cookie-secret",
                "0123456789abcdef",
                "--email-domain",
                "example.com",
            ]),
            &mut Vec::new(),
        )
        .unwrap_err();

    match err {
        BootstrapError::Validation(validation) => {
            assert_eq!(validation.0, vec!["at least one provider must be configured".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
