#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use relayhub_gateway::config::{self, AuthMode};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
hub:
  listen: "0.0.0.0:8080"
  ping_intervall_ms: 30000 # typo should fail
"#;

    let err = config::load_hub_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_hub_config() {
    let cfg = config::load_hub_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.hub.listen, "0.0.0.0:8080");
    assert_eq!(cfg.hub.ping_interval_ms, 30000);
    assert_eq!(cfg.hub.read_deadline_ms, 120000);
    assert_eq!(cfg.auth.mode, AuthMode::Open);
}

#[test]
fn wrong_version_is_rejected() {
    let err = config::load_hub_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn read_deadline_must_exceed_ping_interval() {
    let bad = r#"
version: 1
hub:
  ping_interval_ms: 30000
  read_deadline_ms: 30000
"#;
    assert!(config::load_hub_from_str(bad).is_err());
}

#[test]
fn accounts_mode_requires_unique_tokens() {
    let bad = r#"
version: 1
auth:
  mode: accounts
  accounts:
    - { id: "alice", token: "t" }
    - { id: "bob", token: "t" }
"#;
    assert!(config::load_hub_from_str(bad).is_err());

    let empty = "version: 1\nauth:\n  mode: accounts\n";
    assert!(config::load_hub_from_str(empty).is_err());

    let ok = r#"
version: 1
auth:
  mode: accounts
  accounts:
    - { id: "alice", display_name: "Alice", token: "t-a" }
"#;
    let cfg = config::load_hub_from_str(ok).expect("must parse");
    assert_eq!(cfg.auth.accounts[0].display_name.as_deref(), Some("Alice"));
}

#[test]
fn ok_minimal_bridge_config() {
    let cfg = config::load_bridge_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.bridge.listen, "127.0.0.1:9000");
    assert_eq!(cfg.bridge.hub_addr, "chat-server:8080");
    assert_eq!(cfg.backoff.base_ms, 2000);
    assert_eq!(cfg.backoff.max_attempts, 5);
    assert_eq!(cfg.health.interval_ms, 2000);
}

#[test]
fn bridge_hub_addr_needs_port() {
    let bad = "version: 1\nbridge:\n  hub_addr: \"chat-server\"\n";
    let err = config::load_bridge_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn bridge_backoff_cap_below_base_fails() {
    let bad = r#"
version: 1
backoff:
  base_ms: 2000
  cap_ms: 1000
"#;
    assert!(config::load_bridge_from_str(bad).is_err());
}

#[test]
fn shipped_sample_configs_load() {
    let root = concat!(env!("CARGO_MANIFEST_DIR"), "/../..");
    let hub = config::load_hub_from_file(&format!("{root}/hub.yaml")).expect("hub.yaml");
    assert_eq!(hub.hub.listen, "0.0.0.0:8080");
    let bridge = config::load_bridge_from_file(&format!("{root}/bridge.yaml")).expect("bridge.yaml");
    assert_eq!(bridge.backoff.max_attempts, 5);
}
