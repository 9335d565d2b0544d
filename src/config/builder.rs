use anyhow::Result;

use super::types::{BreakerSettings, Config, PreflightSettings, StageSettings, StoreSettings};

#[derive(Debug)]
pub struct ConfigBuilder {
    pub(super) preflight: PreflightSettings,
    pub(super) stages: StageSettings,
    pub(super) store: StoreSettings,
    pub(super) breaker: BreakerSettings,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            preflight: PreflightSettings::default(),
            stages: StageSettings::default(),
            store: StoreSettings::default(),
            breaker: BreakerSettings::default(),
        }
    }

    pub fn with_preflight<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut PreflightSettings),
    {
        update(&mut self.preflight);
        self
    }

    pub fn with_stages<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut StageSettings),
    {
        update(&mut self.stages);
        self
    }

    pub fn with_store<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut StoreSettings),
    {
        update(&mut self.store);
        self
    }

    pub fn with_breaker<F>(mut self, update: F) -> Self
    where
        F: FnOnce(&mut BreakerSettings),
    {
        update(&mut self.breaker);
        self
    }

    pub fn build(self) -> Result<Config> {
        Ok(Config {
            preflight: self.preflight,
            stages: self.stages,
            store: self.store,
            breaker: self.breaker,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
