//! Configuration loading tests
//!
//! Loads YAML files from a temp directory and checks defaults, overrides and
//! startup validation.

use pool_sniper::config::{AppConfig, TransportMode};
use pool_sniper::constants::programs;
use pool_sniper::pipeline::Mode;
use pool_sniper::transport::Commitment;
use secrecy::ExposeSecret;
use parking_lot::{const_mutex, Mutex, MutexGuard};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Environment overrides are process-wide; config loads in this module run one at a time
static ENV_LOCK: Mutex<()> = const_mutex(());

/// Sets environment variables for the lifetime of the guard
struct EnvGuard {
    keys: Vec<&'static str>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    fn set(vars: &[(&'static str, &str)]) -> Self {
        let lock = ENV_LOCK.lock();
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        Self {
            keys: vars.iter().map(|(key, _)| *key).collect(),
            _lock: lock,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            std::env::remove_var(key);
        }
    }
}

fn write_yaml(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_minimal_config_uses_defaults() {
    let _env = EnvGuard::set(&[]);
    let file = write_yaml(
        r#"
transport:
  mode: wss
  wss_url: "wss://api.mainnet-beta.solana.com"
"#,
    );

    let config = AppConfig::load_from(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.transport.mode, TransportMode::Wss);
    assert_eq!(config.pipeline.mode(), Mode::Full);
    assert_eq!(config.pipeline.concurrency_limit, 1);
    assert!(config.swap.simulation_mode);
    assert!(config.server.enabled);

    let spec = config.subscription_spec();
    assert_eq!(
        spec.program_ids().collect::<Vec<_>>(),
        vec![programs::RAYDIUM_AMM_V4]
    );
    assert_eq!(spec.markers(), vec!["initialize2".to_string()]);
    assert!(spec.discriminator().is_none());
}

#[test]
fn test_full_config_overrides() {
    let _env = EnvGuard::set(&[]);
    let file = write_yaml(
        r#"
transport:
  mode: grpc
  grpc_url: "https://grpc.example.com:443"
  grpc_token: "secret-token"
  commitment: confirmed
  backoff:
    initial_delay_ms: 500
    max_delay_ms: 8000
    max_attempts: 5
subscription:
  filter_tag: raydium_pools
  discriminator: "01"
  programs:
    - program_id: "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8"
      markers: ["initialize2"]
pipeline:
  mode: snipe
  concurrency_limit: 3
  allow_freeze_authority: true
swap:
  simulation_mode: false
  provider_url: "https://swap.example.com"
  api_key: "provider-key"
  amount_sol: 0.25
"#,
    );

    let config = AppConfig::load_from(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.transport.mode, TransportMode::Grpc);
    assert_eq!(config.transport.commitment, Commitment::Confirmed);
    assert!(config.transport.grpc_token.is_some());
    assert_eq!(config.pipeline.mode(), Mode::Snipe);

    let policy = config.pipeline.check_policy();
    assert!(policy.allow_freeze_authority);
    assert!(!policy.allow_mint_authority);

    let backoff = config.transport.backoff.policy();
    assert_eq!(backoff.delay(0), Duration::from_millis(500));
    assert_eq!(backoff.delay(10), Duration::from_millis(8000));
    assert_eq!(backoff.max_attempts(), Some(5));

    let spec = config.subscription_spec();
    assert_eq!(spec.filter_tag(), "raydium_pools");
    assert_eq!(spec.discriminator(), Some(&[1u8][..]));
    assert_eq!(spec.commitment(), Commitment::Confirmed);
}

#[test]
fn test_unknown_transport_mode_fails_to_load() {
    let _env = EnvGuard::set(&[]);
    let file = write_yaml(
        r#"
transport:
  mode: carrier_pigeon
"#,
    );

    assert!(AppConfig::load_from(file.path()).is_err());
}

#[test]
fn test_missing_grpc_endpoint_fails_validation() {
    let _env = EnvGuard::set(&[]);
    let file = write_yaml(
        r#"
transport:
  mode: grpc
"#,
    );

    let config = AppConfig::load_from(file.path()).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_live_provider_requires_api_key() {
    let _env = EnvGuard::set(&[]);
    let file = write_yaml(
        r#"
transport:
  mode: wss
  wss_url: "wss://api.mainnet-beta.solana.com"
swap:
  simulation_mode: false
  provider_url: "https://swap.example.com"
"#,
    );

    let config = AppConfig::load_from(file.path()).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_inverted_backoff_fails_validation() {
    let _env = EnvGuard::set(&[]);
    let file = write_yaml(
        r#"
transport:
  mode: wss
  wss_url: "wss://api.mainnet-beta.solana.com"
  backoff:
    initial_delay_ms: 10000
    max_delay_ms: 1000
"#,
    );

    let config = AppConfig::load_from(file.path()).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_discriminator_fails_validation() {
    let _env = EnvGuard::set(&[]);
    let file = write_yaml(
        r#"
transport:
  mode: wss
  wss_url: "wss://api.mainnet-beta.solana.com"
subscription:
  discriminator: "zz"
"#,
    );

    let config = AppConfig::load_from(file.path()).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_unknown_pipeline_mode_runs_full() {
    let _env = EnvGuard::set(&[]);
    let file = write_yaml(
        r#"
transport:
  mode: wss
  wss_url: "wss://api.mainnet-beta.solana.com"
pipeline:
  mode: yolo
"#,
    );

    let config = AppConfig::load_from(file.path()).unwrap();
    assert_eq!(config.pipeline.mode(), Mode::Full);
}

#[test]
fn test_environment_overrides_file() {
    let file = write_yaml(
        r#"
transport:
  mode: grpc
  grpc_url: "https://grpc.example.com:443"
pipeline:
  concurrency_limit: 1
"#,
    );
    let _env = EnvGuard::set(&[
        ("SNIPER_TRANSPORT__MODE", "wss"),
        ("SNIPER_TRANSPORT__WSS_URL", "wss://rpc.example.com"),
        ("SNIPER_PIPELINE__CONCURRENCY_LIMIT", "3"),
        ("SNIPER_SWAP__SIMULATION_MODE", "false"),
        ("SNIPER_SWAP__PROVIDER_URL", "https://swap.example.com"),
        ("SNIPER_SWAP__API_KEY", "provider-key"),
    ]);

    let config = AppConfig::load_from(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.transport.mode, TransportMode::Wss);
    assert_eq!(config.transport.wss_url, "wss://rpc.example.com");
    assert_eq!(config.pipeline.concurrency_limit, 3);
    assert!(!config.swap.simulation_mode);
    assert!(config.swap.api_key.is_some());
}

#[test]
fn test_environment_keeps_numeric_strings_verbatim() {
    let file = write_yaml(
        r#"
transport:
  mode: grpc
  grpc_url: "https://grpc.example.com:443"
"#,
    );
    let _env = EnvGuard::set(&[
        ("SNIPER_SUBSCRIPTION__DISCRIMINATOR", "01"),
        ("SNIPER_TRANSPORT__GRPC_TOKEN", "007"),
    ]);

    let config = AppConfig::load_from(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.subscription.discriminator.as_deref(), Some("01"));
    assert_eq!(config.subscription_spec().discriminator(), Some(&[1u8][..]));
    let token = config.transport.grpc_token.as_ref().unwrap();
    assert_eq!(token.expose_secret(), "007");
}
