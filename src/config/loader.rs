use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs::home_dir;

use super::Config;
use super::builder::ConfigBuilder;
use super::constants::CONFIG_RELATIVE_PATH;
use super::environment::apply_env_overrides;
use super::types::FileConfig;
use super::validation::validate;

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        let mut path = home_dir().context("Could not determine home directory")?;
        path.push(CONFIG_RELATIVE_PATH);
        Ok(path)
    }

    #[cfg(test)]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Defaults, then `path` if it exists, then environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut builder = ConfigBuilder::new();

        if path.exists() {
            builder = Self::apply_file(builder, path)?;
        }

        builder = apply_env_overrides(builder)?;

        let config = builder.build()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate(self)
    }

    fn apply_file(builder: ConfigBuilder, path: &Path) -> Result<ConfigBuilder> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed reading config at {}", path.display()))?;

        if contents.trim().is_empty() {
            return Ok(builder);
        }

        let file: FileConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed parsing JSON config at {}", path.display()))?;

        Ok(file.apply(builder))
    }
}

impl FileConfig {
    pub fn apply(self, builder: ConfigBuilder) -> ConfigBuilder {
        let FileConfig {
            preflight,
            stages,
            store,
            breaker,
        } = self;
        let preflight = preflight.unwrap_or_default();
        let stages = stages.unwrap_or_default();
        let store = store.unwrap_or_default();
        let breaker = breaker.unwrap_or_default();

        builder
            .with_preflight(|settings| {
                if let Some(ready) = preflight.ready_threshold {
                    settings.ready_threshold = ready;
                }
                if let Some(warn) = preflight.warn_threshold {
                    settings.warn_threshold = warn;
                }
                if let Some(timeout) = preflight.check_timeout_secs {
                    settings.check_timeout_secs = timeout;
                }
                if let Some(checks) = preflight.checks {
                    settings.checks = checks;
                }
            })
            .with_stages(|settings| {
                if let Some(endpoint) = stages.endpoint {
                    settings.endpoint = endpoint;
                }
                if stages.api_key.is_some() {
                    settings.api_key = stages.api_key;
                }
                if let Some(max_retries) = stages.max_retries {
                    settings.max_retries = max_retries;
                }
                if let Some(delay) = stages.retry_base_delay_ms {
                    settings.retry_base_delay_ms = delay;
                }
                if let Some(timeout) = stages.timeout_secs {
                    settings.timeout_secs = timeout;
                }
                if let Some(platforms) = stages.publish_platforms {
                    settings.publish_platforms = platforms;
                }
                if let Some(user_agent) = stages.user_agent {
                    settings.user_agent = user_agent;
                }
            })
            .with_store(|settings| {
                if let Some(dir) = store.dir {
                    settings.dir = dir;
                }
                if let Some(field) = store.terminal_field {
                    settings.terminal_field = field;
                }
            })
            .with_breaker(|settings| {
                if let Some(threshold) = breaker.failure_threshold {
                    settings.failure_threshold = threshold;
                }
                if let Some(cooldown) = breaker.cooldown_secs {
                    settings.cooldown_secs = cooldown;
                }
            })
    }
}
