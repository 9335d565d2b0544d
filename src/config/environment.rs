use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use super::builder::ConfigBuilder;

pub fn apply_env_overrides(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    if let Some(endpoint) = env_string("REELPIPE_STAGE_ENDPOINT")? {
        builder = builder.with_stages(|stages| stages.endpoint = endpoint);
    }

    if let Some(api_key) = env_string("REELPIPE_API_KEY")? {
        builder = builder.with_stages(|stages| stages.api_key = Some(api_key));
    }

    if let Some(max_retries) = env_u32("REELPIPE_MAX_RETRIES")? {
        builder = builder.with_stages(|stages| stages.max_retries = max_retries);
    }

    if let Some(delay) = env_u64("REELPIPE_RETRY_DELAY_MS")? {
        builder = builder.with_stages(|stages| stages.retry_base_delay_ms = delay);
    }

    if let Some(timeout) = env_u64("REELPIPE_STAGE_TIMEOUT_SECS")? {
        builder = builder.with_stages(|stages| stages.timeout_secs = timeout);
    }

    if let Some(timeout) = env_u64("REELPIPE_CHECK_TIMEOUT_SECS")? {
        builder = builder.with_preflight(|preflight| preflight.check_timeout_secs = timeout);
    }

    if let Some(dir) = env_string("REELPIPE_STORE_DIR")? {
        builder = builder.with_store(|store| store.dir = PathBuf::from(dir));
    }

    if let Some(platforms) = env_string("REELPIPE_PUBLISH_PLATFORMS")? {
        let platforms = split_list(&platforms);
        builder = builder.with_stages(|stages| stages.publish_platforms = platforms);
    }

    Ok(builder)
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn env_string(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(anyhow!("{key} contains invalid UTF-8")),
    }
}

pub fn env_u64(key: &str) -> Result<Option<u64>> {
    if let Some(value) = env_string(key)? {
        let parsed = value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {key} as u64"))?;
        Ok(Some(parsed))
    } else {
        Ok(None)
    }
}

pub fn env_u32(key: &str) -> Result<Option<u32>> {
    if let Some(value) = env_string(key)? {
        let parsed = value
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Failed to parse {key} as u32"))?;
        Ok(Some(parsed))
    } else {
        Ok(None)
    }
}
