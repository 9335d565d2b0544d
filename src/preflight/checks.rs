use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::config::CheckSettings;

use super::gate::HealthCheck;
use super::types::{CheckStatus, HealthCheckResult};

/// Credential supplied through an environment variable.
pub struct EnvCredentialCheck {
    name: String,
    var: String,
}

impl EnvCredentialCheck {
    pub fn new(name: impl Into<String>, var: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            var: var.into(),
        }
    }
}

#[async_trait]
impl HealthCheck for EnvCredentialCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<HealthCheckResult> {
        let present = env::var(&self.var)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);
        let result = if present {
            HealthCheckResult::valid(&self.name, format!("{} is set", self.var))
        } else {
            HealthCheckResult::new(
                &self.name,
                CheckStatus::Missing,
                0,
                format!("{} is not set", self.var),
            )
        };
        Ok(result.with_extra("var", json!(self.var)))
    }
}

/// Reachability and authorization of an HTTP service.
pub struct HttpEndpointCheck {
    name: String,
    url: String,
    timeout: Option<Duration>,
    http: Client,
}

impl HttpEndpointCheck {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout: None,
            http: Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl HealthCheck for HttpEndpointCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn probe(&self) -> Result<HealthCheckResult> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.url))?;
        let status = response.status();

        let result = match status {
            status if status.is_success() => {
                HealthCheckResult::valid(&self.name, format!("{} answered {status}", self.url))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HealthCheckResult::new(
                &self.name,
                CheckStatus::Invalid,
                0,
                format!("{} rejected our credentials ({status})", self.url),
            ),
            StatusCode::TOO_MANY_REQUESTS => HealthCheckResult::new(
                &self.name,
                CheckStatus::RefreshNeeded,
                40,
                format!("{} is rate limiting ({status})", self.url),
            )
            .retriable(true),
            status if status.is_server_error() => HealthCheckResult::new(
                &self.name,
                CheckStatus::Unknown,
                20,
                format!("{} is failing ({status})", self.url),
            )
            .retriable(true),
            status => HealthCheckResult::new(
                &self.name,
                CheckStatus::Unknown,
                0,
                format!("{} answered unexpected {status}", self.url),
            ),
        };
        Ok(result.with_extra("http_status", json!(status.as_u16())))
    }
}

#[derive(Debug, Deserialize)]
struct QuotaResponse {
    remaining: u64,
    limit: u64,
}

/// Remaining quota reported by a service as `{"remaining": n, "limit": m}`.
pub struct QuotaCheck {
    name: String,
    url: String,
    timeout: Option<Duration>,
    http: Client,
}

impl QuotaCheck {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout: None,
            http: Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl HealthCheck for QuotaCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn probe(&self) -> Result<HealthCheckResult> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.url))?
            .error_for_status()
            .with_context(|| format!("Quota endpoint {} returned an error", self.url))?;
        let quota: QuotaResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse quota response from {}", self.url))?;

        if quota.limit == 0 {
            return Err(anyhow!("Quota endpoint {} reported a zero limit", self.url));
        }

        let remaining = quota.remaining.min(quota.limit);
        let score = ((remaining as f64 / quota.limit as f64) * 100.0).round() as u8;
        let result = if remaining == 0 {
            HealthCheckResult::new(&self.name, CheckStatus::Expired, 0, "quota exhausted")
                .retriable(true)
        } else {
            HealthCheckResult::new(
                &self.name,
                CheckStatus::Valid,
                score,
                format!("{remaining} of {} remaining", quota.limit),
            )
        };

        Ok(result
            .with_extra("remaining", json!(quota.remaining))
            .with_extra("limit", json!(quota.limit)))
    }
}

/// Instantiate the configured checks, in configuration order.
pub fn from_settings(settings: &[CheckSettings]) -> Vec<Arc<dyn HealthCheck>> {
    settings
        .iter()
        .map(|check| -> Arc<dyn HealthCheck> {
            match check {
                CheckSettings::Env { name, var } => {
                    Arc::new(EnvCredentialCheck::new(name.clone(), var.clone()))
                }
                CheckSettings::Http {
                    name,
                    url,
                    timeout_secs,
                } => Arc::new(
                    HttpEndpointCheck::new(name.clone(), url.clone())
                        .with_timeout(timeout_secs.map(Duration::from_secs)),
                ),
                CheckSettings::Quota {
                    name,
                    url,
                    timeout_secs,
                } => Arc::new(
                    QuotaCheck::new(name.clone(), url.clone())
                        .with_timeout(timeout_secs.map(Duration::from_secs)),
                ),
            }
        })
        .collect()
}
