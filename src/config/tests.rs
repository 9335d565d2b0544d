use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use tempfile::TempDir;

use super::environment::{env_u32, env_u64, split_list};
use super::{CheckSettings, Config, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS};

const CONFIG_VARS: &[&str] = &[
    "REELPIPE_STAGE_ENDPOINT",
    "REELPIPE_API_KEY",
    "REELPIPE_MAX_RETRIES",
    "REELPIPE_RETRY_DELAY_MS",
    "REELPIPE_STAGE_TIMEOUT_SECS",
    "REELPIPE_CHECK_TIMEOUT_SECS",
    "REELPIPE_STORE_DIR",
    "REELPIPE_PUBLISH_PLATFORMS",
];

fn env_lock<'a>() -> MutexGuard<'a, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    /// Clears every config variable, then applies `vars`.
    fn new(vars: &[(&str, &str)]) -> Self {
        let saved = CONFIG_VARS
            .iter()
            .map(|key| (key.to_string(), std::env::var(key).ok()))
            .collect::<Vec<_>>();
        for key in CONFIG_VARS {
            unsafe { std::env::remove_var(key) };
        }
        for (key, value) in vars {
            unsafe { std::env::set_var(key, value) };
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(val) => unsafe { std::env::set_var(key, val) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("config");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn missing_file_yields_defaults() {
    let _lock = env_lock();
    let _env = EnvGuard::new(&[]);
    let temp = TempDir::new().unwrap();

    let config = Config::load_from(&temp.path().join("absent")).unwrap();

    assert_eq!(config.preflight.ready_threshold, 90);
    assert_eq!(config.preflight.warn_threshold, 70);
    assert_eq!(config.preflight.check_timeout_secs, 15);
    assert!(config.preflight.checks.is_empty());
    assert_eq!(config.stages.max_retries, DEFAULT_MAX_RETRIES);
    assert_eq!(
        config.stages.retry_base_delay(),
        Duration::from_millis(DEFAULT_RETRY_DELAY_MS)
    );
    assert_eq!(config.stages.timeout(), Some(Duration::from_secs(300)));
    assert_eq!(config.stages.api_key, None);
    assert!(config.store.dir.ends_with(".reelpipe/records"));
    assert_eq!(config.store.terminal_field, "published");
    assert_eq!(config.breaker.failure_threshold, 5);
    assert_eq!(config.breaker.cooldown_secs, 60);
}

#[test]
fn file_values_override_defaults() {
    let _lock = env_lock();
    let _env = EnvGuard::new(&[]);
    let temp = TempDir::new().unwrap();
    let path = write_config(
        &temp,
        r#"{
            "preflight": {
                "ready_threshold": 95,
                "checks": [
                    { "type": "env", "name": "api-key", "var": "REELPIPE_API_KEY" },
                    { "type": "quota", "name": "tts", "url": "http://localhost:9000/quota", "timeout_secs": 5 }
                ]
            },
            "stages": {
                "endpoint": "https://stages.internal/api",
                "api_key": "file-key",
                "max_retries": 4,
                "timeout_secs": 0,
                "publish_platforms": ["youtube"]
            },
            "store": { "dir": "/var/lib/reelpipe", "terminal_field": "finalized_at" },
            "breaker": { "failure_threshold": 0 }
        }"#,
    );

    let config = Config::load_from(&path).unwrap();

    assert_eq!(config.preflight.ready_threshold, 95);
    assert_eq!(config.preflight.warn_threshold, 70);
    assert_eq!(
        config.preflight.checks,
        vec![
            CheckSettings::Env {
                name: "api-key".to_string(),
                var: "REELPIPE_API_KEY".to_string(),
            },
            CheckSettings::Quota {
                name: "tts".to_string(),
                url: "http://localhost:9000/quota".to_string(),
                timeout_secs: Some(5),
            },
        ]
    );
    assert_eq!(config.stages.endpoint, "https://stages.internal/api");
    assert_eq!(config.stages.api_key.as_deref(), Some("file-key"));
    assert_eq!(config.stages.max_retries, 4);
    assert_eq!(config.stages.timeout(), None);
    assert_eq!(config.stages.publish_platforms, vec!["youtube".to_string()]);
    assert_eq!(config.store.dir, PathBuf::from("/var/lib/reelpipe"));
    assert_eq!(config.store.terminal_field, "finalized_at");
    assert_eq!(config.breaker.failure_threshold, 0);
    assert_eq!(config.breaker.cooldown_secs, 60);
}

#[test]
fn env_overrides_file() {
    let _lock = env_lock();
    let _env = EnvGuard::new(&[
        ("REELPIPE_STAGE_ENDPOINT", "http://env-host:7000"),
        ("REELPIPE_API_KEY", "env-key"),
        ("REELPIPE_MAX_RETRIES", "7"),
        ("REELPIPE_RETRY_DELAY_MS", "250"),
        ("REELPIPE_CHECK_TIMEOUT_SECS", "3"),
        ("REELPIPE_STORE_DIR", "/tmp/reelpipe-env"),
        ("REELPIPE_PUBLISH_PLATFORMS", "youtube, instagram ,"),
    ]);
    let temp = TempDir::new().unwrap();
    let path = write_config(
        &temp,
        r#"{ "stages": { "endpoint": "http://file-host", "api_key": "file-key", "max_retries": 1 } }"#,
    );

    let config = Config::load_from(&path).unwrap();

    assert_eq!(config.stages.endpoint, "http://env-host:7000");
    assert_eq!(config.stages.api_key.as_deref(), Some("env-key"));
    assert_eq!(config.stages.max_retries, 7);
    assert_eq!(config.stages.retry_base_delay(), Duration::from_millis(250));
    assert_eq!(config.preflight.check_timeout_secs, 3);
    assert_eq!(config.store.dir, PathBuf::from("/tmp/reelpipe-env"));
    assert_eq!(
        config.stages.publish_platforms,
        vec!["youtube".to_string(), "instagram".to_string()]
    );
}

#[test]
fn empty_file_is_ignored() {
    let _lock = env_lock();
    let _env = EnvGuard::new(&[]);
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "   \n");

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.stages.max_retries, DEFAULT_MAX_RETRIES);
}

#[test]
fn malformed_file_reports_path() {
    let _lock = env_lock();
    let _env = EnvGuard::new(&[]);
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, "{ not json");

    let err = Config::load_from(&path).unwrap_err();
    assert!(format!("{err:#}").contains("Failed parsing JSON config"));
}

#[test]
fn unknown_sections_are_rejected() {
    let _lock = env_lock();
    let _env = EnvGuard::new(&[]);
    let temp = TempDir::new().unwrap();
    let path = write_config(&temp, r#"{ "llm": { "api_key": "x" } }"#);

    assert!(Config::load_from(&path).is_err());
}

#[test]
fn invalid_env_number_is_an_error() {
    let _lock = env_lock();
    let _env = EnvGuard::new(&[("REELPIPE_MAX_RETRIES", "lots")]);
    let temp = TempDir::new().unwrap();

    let err = Config::load_from(&temp.path().join("absent")).unwrap_err();
    assert!(err.to_string().contains("REELPIPE_MAX_RETRIES"));
}

#[test]
fn validation_rejects_inverted_thresholds() {
    let config = Config::builder()
        .with_preflight(|preflight| {
            preflight.ready_threshold = 60;
            preflight.warn_threshold = 80;
        })
        .build()
        .unwrap();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("warn_threshold"));
}

#[test]
fn validation_rejects_out_of_range_ready_threshold() {
    let config = Config::builder()
        .with_preflight(|preflight| preflight.ready_threshold = 101)
        .build()
        .unwrap();

    assert!(config.validate().is_err());
}

#[test]
fn validation_rejects_zero_check_timeout() {
    let config = Config::builder()
        .with_preflight(|preflight| preflight.check_timeout_secs = 0)
        .build()
        .unwrap();

    assert!(config.validate().is_err());
}

#[test]
fn validation_rejects_non_http_endpoint() {
    let config = Config::builder()
        .with_stages(|stages| stages.endpoint = "ftp://stages".to_string())
        .build()
        .unwrap();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("http(s)"));
}

#[test]
fn validation_rejects_empty_publish_platforms() {
    let config = Config::builder()
        .with_stages(|stages| stages.publish_platforms.clear())
        .build()
        .unwrap();

    assert!(config.validate().is_err());
}

#[test]
fn validation_rejects_duplicate_check_names() {
    let check = CheckSettings::Env {
        name: "key".to_string(),
        var: "REELPIPE_API_KEY".to_string(),
    };
    let config = Config::builder()
        .with_preflight(|preflight| preflight.checks = vec![check.clone(), check])
        .build()
        .unwrap();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("more than once"));
}

#[test]
fn validation_rejects_blank_terminal_field() {
    let config = Config::builder()
        .with_store(|store| store.terminal_field = "  ".to_string())
        .build()
        .unwrap();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("terminal_field"));
}

#[test]
fn default_config_is_valid() {
    Config::default().validate().unwrap();
}

#[test]
fn env_number_helpers_parse_and_skip_absent() {
    let _lock = env_lock();
    let _env = EnvGuard::new(&[
        ("REELPIPE_MAX_RETRIES", " 3 "),
        ("REELPIPE_RETRY_DELAY_MS", "1500"),
    ]);

    assert_eq!(env_u32("REELPIPE_MAX_RETRIES").unwrap(), Some(3));
    assert_eq!(env_u64("REELPIPE_RETRY_DELAY_MS").unwrap(), Some(1500));
    assert_eq!(env_u64("REELPIPE_STAGE_TIMEOUT_SECS").unwrap(), None);
}

#[test]
fn split_list_drops_blanks() {
    assert_eq!(
        split_list(" a,, b ,c "),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
    assert!(split_list(" , ").is_empty());
}
