//! Tests for configuration validation

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use polling_scheduler::config::{
    DispatchConfig, EmitterConfig, GuardRailConfig, SchedulerConfig, StoreBackendConfig,
};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (format!("POLLING_SCHEDULER_{k}"), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_config_is_valid() {
    let cfg = SchedulerConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.store, StoreBackendConfig::InMemory);
    assert_eq!(cfg.emitter.channel_capacity, 1024);
    assert_eq!(cfg.guard_rails.min_interval_secs, 1);
    assert_eq!(cfg.guard_rails.max_interval_secs, 86_400);
    assert_eq!(cfg.dispatch.idle_wait_ms, 60_000);
}

#[test]
fn test_zero_channel_capacity_rejected() {
    let cfg = SchedulerConfig {
        emitter: EmitterConfig { channel_capacity: 0 },
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_inverted_guard_rails_rejected() {
    let cfg = SchedulerConfig {
        guard_rails: GuardRailConfig {
            min_interval_secs: 600,
            max_interval_secs: 60,
        },
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().unwrap_err().contains("guard_rails"));
}

#[test]
fn test_zero_idle_wait_rejected() {
    let cfg = SchedulerConfig {
        dispatch: DispatchConfig { idle_wait_ms: 0 },
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_empty_file_store_path_rejected() {
    let cfg = SchedulerConfig {
        store: StoreBackendConfig::File {
            path: PathBuf::new(),
            stream: "schedules".into(),
        },
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_from_json_str_with_file_store() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{"store":{"file":{"path":"/var/lib/scheduler"}},"guard_rails":{"min_interval_secs":30}}"#,
    )
    .unwrap();
    assert_eq!(
        cfg.store,
        StoreBackendConfig::File {
            path: PathBuf::from("/var/lib/scheduler"),
            stream: "schedules".into(),
        }
    );
    assert_eq!(cfg.guard_rails.min_interval_secs, 30);
    assert_eq!(cfg.guard_rails.max_interval_secs, 86_400);
}

#[test]
fn test_from_json_str_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str(r#"{"emitter":{"channel_capacity":0}}"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_from_lookup_reads_prefixed_vars() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[
        ("STORE", "file"),
        ("STORE_PATH", "/tmp/schedules"),
        ("STORE_STREAM", "prod"),
        ("CHANNEL_CAPACITY", "16"),
        ("MIN_INTERVAL_SECS", "5"),
        ("IDLE_WAIT_MS", "250"),
    ]))
    .unwrap();
    assert_eq!(
        cfg.store,
        StoreBackendConfig::File {
            path: PathBuf::from("/tmp/schedules"),
            stream: "prod".into(),
        }
    );
    assert_eq!(cfg.emitter.channel_capacity, 16);
    let options = cfg.scheduler_options().unwrap();
    assert_eq!(options.idle_wait, Duration::from_millis(250));
    assert!(options.guard_rails.check_interval(Duration::from_secs(4)).is_err());
    assert!(options.guard_rails.check_interval(Duration::from_secs(5)).is_ok());
}

#[test]
fn test_from_lookup_with_nothing_set_is_default() {
    let cfg = SchedulerConfig::from_lookup(|_| None).unwrap();
    assert_eq!(cfg, SchedulerConfig::default());
}

#[test]
fn test_from_lookup_errors() {
    assert!(SchedulerConfig::from_lookup(lookup(&[("STORE", "file")])).is_err());
    assert!(SchedulerConfig::from_lookup(lookup(&[("STORE", "redis")])).is_err());
    assert!(SchedulerConfig::from_lookup(lookup(&[("CHANNEL_CAPACITY", "many")])).is_err());
    assert!(SchedulerConfig::from_lookup(lookup(&[("MAX_INTERVAL_SECS", "0")])).is_err());
}
