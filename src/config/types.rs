use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub preflight: PreflightSettings,
    pub stages: StageSettings,
    pub store: StoreSettings,
    pub breaker: BreakerSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreflightSettings {
    pub ready_threshold: u8,
    pub warn_threshold: u8,
    pub check_timeout_secs: u64,
    pub checks: Vec<CheckSettings>,
}

/// One configured health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CheckSettings {
    Env {
        name: String,
        var: String,
    },
    Http {
        name: String,
        url: String,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    Quota {
        name: String,
        url: String,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

impl CheckSettings {
    pub fn name(&self) -> &str {
        match self {
            CheckSettings::Env { name, .. }
            | CheckSettings::Http { name, .. }
            | CheckSettings::Quota { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Per-attempt deadline; zero disables it.
    pub timeout_secs: u64,
    pub publish_platforms: Vec<String>,
    pub user_agent: String,
}

impl StageSettings {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub dir: PathBuf,
    /// A record carrying this field is finished and never resumed.
    pub terminal_field: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

// File configuration types. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct FileConfig {
    #[serde(default)]
    pub preflight: Option<FilePreflightSettings>,
    #[serde(default)]
    pub stages: Option<FileStageSettings>,
    #[serde(default)]
    pub store: Option<FileStoreSettings>,
    #[serde(default)]
    pub breaker: Option<FileBreakerSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct FilePreflightSettings {
    pub ready_threshold: Option<u8>,
    pub warn_threshold: Option<u8>,
    pub check_timeout_secs: Option<u64>,
    pub checks: Option<Vec<CheckSettings>>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct FileStageSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub max_retries: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub publish_platforms: Option<Vec<String>>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct FileStoreSettings {
    pub dir: Option<PathBuf>,
    pub terminal_field: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct FileBreakerSettings {
    pub failure_threshold: Option<u32>,
    pub cooldown_secs: Option<u64>,
}
