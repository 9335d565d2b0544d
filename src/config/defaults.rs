use std::path::PathBuf;

use dirs::home_dir;

use super::constants::*;
use super::types::{BreakerSettings, PreflightSettings, StageSettings, StoreSettings};

pub fn default_user_agent() -> String {
    format!("reelpipe/{}", env!("CARGO_PKG_VERSION"))
}

pub fn default_records_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(RECORDS_RELATIVE_PATH)
}

impl Default for PreflightSettings {
    fn default() -> Self {
        Self {
            ready_threshold: DEFAULT_READY_THRESHOLD,
            warn_threshold: DEFAULT_WARN_THRESHOLD,
            check_timeout_secs: DEFAULT_CHECK_TIMEOUT_SECS,
            checks: Vec::new(),
        }
    }
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_STAGE_ENDPOINT.to_string(),
            api_key: None,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_DELAY_MS,
            timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
            publish_platforms: DEFAULT_PUBLISH_PLATFORMS
                .iter()
                .map(|platform| platform.to_string())
                .collect(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            dir: default_records_dir(),
            terminal_field: DEFAULT_TERMINAL_FIELD.to_string(),
        }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_BREAKER_THRESHOLD,
            cooldown_secs: DEFAULT_BREAKER_COOLDOWN_SECS,
        }
    }
}
