use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::StageSettings;
use crate::errors::{ErrorKind, StageError};
use crate::pipeline::{Artifacts, Fields};

/// HTTP client for the services that implement the stage bodies.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    user_agent: String,
}

/// Body posted to a stage endpoint.
#[derive(Debug, Serialize)]
pub struct StageRequest<'a> {
    pub record_id: &'a str,
    pub fields: &'a Fields,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    kind: Option<String>,
    message: Option<String>,
}

impl ServiceClient {
    pub fn new(settings: &StageSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone().filter(|key| !key.trim().is_empty()),
            user_agent: settings.user_agent.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST the record to `{base_url}/{path}` and return the artifact map.
    pub async fn invoke(&self, path: &str, request: &StageRequest<'_>) -> Result<Artifacts, StageError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let mut builder = self
            .http
            .post(&url)
            .header("User-Agent", &self.user_agent)
            .json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| StageError::transient(format!("request to {url} failed: {err}")))?;

        let status = response.status();
        if status.is_success() {
            let body: Value = response.json().await.map_err(|err| {
                StageError::invalid_output(format!("response from {url} is not JSON: {err}"))
            })?;
            return match body {
                Value::Object(artifacts) => Ok(artifacts),
                other => Err(StageError::invalid_output(format!(
                    "expected a JSON object from {url}, got {other}"
                ))),
            };
        }

        let text = response.text().await.unwrap_or_default();
        Err(error_from_response(status, &text))
    }
}

/// Map a failed response onto the error taxonomy.
///
/// An explicit `{"error": {"kind": ...}}` body wins over the status code.
pub fn error_from_response(status: StatusCode, body: &str) -> StageError {
    let explicit = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = explicit
        .as_ref()
        .and_then(|envelope| envelope.error.message.clone())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("service returned {status}")
            } else {
                format!("service returned {status}: {trimmed}")
            }
        });

    let kind = explicit
        .and_then(|envelope| envelope.error.kind)
        .and_then(|kind| kind.parse::<ErrorKind>().ok())
        .unwrap_or_else(|| classify_status(status));

    StageError::new(kind, message)
}

pub fn classify_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::PermanentUpstream,
        StatusCode::PAYMENT_REQUIRED => ErrorKind::QuotaExhausted,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            ErrorKind::TransientUpstream
        }
        status if status.is_server_error() => ErrorKind::TransientUpstream,
        _ => ErrorKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST),
            ErrorKind::PermanentUpstream
        );
        assert_eq!(
            classify_status(StatusCode::PAYMENT_REQUIRED),
            ErrorKind::QuotaExhausted
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            ErrorKind::TransientUpstream
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY),
            ErrorKind::TransientUpstream
        );
        assert_eq!(classify_status(StatusCode::NOT_FOUND), ErrorKind::Unknown);
    }

    #[test]
    fn explicit_error_kind_overrides_status() {
        let err = error_from_response(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"kind": "quota_exhausted", "message": "monthly render minutes used"}}"#,
        );
        assert_eq!(err.kind, ErrorKind::QuotaExhausted);
        assert_eq!(err.message, "monthly render minutes used");
    }

    #[test]
    fn unrecognised_error_kind_falls_back_to_status() {
        let err = error_from_response(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"error": {"kind": "overloaded"}}"#,
        );
        assert_eq!(err.kind, ErrorKind::TransientUpstream);
        assert!(err.message.contains("503"));
    }
}
