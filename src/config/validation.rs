use std::collections::HashSet;

use anyhow::{Result, anyhow, bail};

use super::types::Config;

pub fn validate(config: &Config) -> Result<()> {
    let preflight = &config.preflight;
    if preflight.ready_threshold > 100 {
        bail!(
            "ready_threshold must be at most 100, got {}",
            preflight.ready_threshold
        );
    }
    if preflight.warn_threshold > preflight.ready_threshold {
        bail!(
            "warn_threshold ({}) must not exceed ready_threshold ({})",
            preflight.warn_threshold,
            preflight.ready_threshold
        );
    }
    if preflight.check_timeout_secs == 0 {
        bail!("check_timeout_secs must be greater than zero");
    }

    let mut seen = HashSet::new();
    for check in &preflight.checks {
        if !seen.insert(check.name()) {
            bail!("Health check '{}' is configured more than once", check.name());
        }
    }

    let endpoint = config.stages.endpoint.trim();
    if endpoint.is_empty() {
        return Err(anyhow!(
            "Stage endpoint not configured. Set REELPIPE_STAGE_ENDPOINT or add stages.endpoint to {}",
            Config::config_path()?.display()
        ));
    }
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        bail!("Stage endpoint must be an http(s) URL, got '{endpoint}'");
    }

    if config.stages.publish_platforms.is_empty() {
        bail!("At least one publish platform must be configured");
    }

    if config.store.terminal_field.trim().is_empty() {
        bail!("store.terminal_field must not be empty");
    }

    Ok(())
}
