use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use httpmock::prelude::*;
use serde_json::json;

use crate::config::CheckSettings;

use super::checks::{self, EnvCredentialCheck, HttpEndpointCheck, QuotaCheck};
use super::gate::{HealthCheck, PreflightGate};
use super::types::{CheckStatus, HealthCheckResult, OverallStatus, PreflightReport, Thresholds};

struct FixedCheck {
    name: &'static str,
    score: u8,
}

#[async_trait]
impl HealthCheck for FixedCheck {
    fn name(&self) -> &str {
        self.name
    }

    async fn probe(&self) -> Result<HealthCheckResult> {
        let status = if self.score == 0 {
            CheckStatus::Missing
        } else {
            CheckStatus::Valid
        };
        Ok(HealthCheckResult::new(self.name, status, self.score, "fixed"))
    }
}

struct HangingCheck;

#[async_trait]
impl HealthCheck for HangingCheck {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn probe(&self) -> Result<HealthCheckResult> {
        std::future::pending().await
    }
}

/// Never answers; gives up after its own deadline.
struct StalledCheck {
    name: &'static str,
    timeout: Duration,
}

#[async_trait]
impl HealthCheck for StalledCheck {
    fn name(&self) -> &str {
        self.name
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    async fn probe(&self) -> Result<HealthCheckResult> {
        std::future::pending().await
    }
}

struct ErroringCheck;

#[async_trait]
impl HealthCheck for ErroringCheck {
    fn name(&self) -> &str {
        "erroring"
    }

    async fn probe(&self) -> Result<HealthCheckResult> {
        Err(anyhow!("connection refused"))
    }
}

struct PanickingCheck;

#[async_trait]
impl HealthCheck for PanickingCheck {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn probe(&self) -> Result<HealthCheckResult> {
        panic!("probe blew up");
    }
}

struct MisnamedCheck;

#[async_trait]
impl HealthCheck for MisnamedCheck {
    fn name(&self) -> &str {
        "declared"
    }

    async fn probe(&self) -> Result<HealthCheckResult> {
        Ok(HealthCheckResult::valid("something-else", "ok"))
    }
}

fn fixed(name: &'static str, score: u8) -> Arc<dyn HealthCheck> {
    Arc::new(FixedCheck { name, score })
}

fn gate() -> PreflightGate {
    PreflightGate::new(Thresholds::default(), Duration::from_secs(15))
}

#[tokio::test]
async fn mixed_scores_fail_with_critical_and_warning() {
    let checks = vec![
        fixed("check1", 100),
        fixed("check2", 100),
        fixed("check3", 0),
        fixed("check4", 40),
    ];

    let report = gate().run(&checks).await;

    assert_eq!(report.overall_score, 60);
    assert_eq!(report.critical, vec!["check3".to_string()]);
    assert_eq!(report.warnings, vec!["check4".to_string()]);
    assert_eq!(report.overall_status, OverallStatus::Failed);
    assert!(!report.can_proceed);
    assert_eq!(report.results.len(), 4);
}

#[tokio::test]
async fn all_healthy_checks_are_ready() {
    let checks = vec![fixed("a", 100), fixed("b", 95)];

    let report = gate().run(&checks).await;

    assert_eq!(report.overall_score, 98);
    assert_eq!(report.overall_status, OverallStatus::Ready);
    assert!(report.can_proceed);
    assert!(report.critical.is_empty());
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn empty_check_set_fails() {
    let report = gate().run(&[]).await;

    assert_eq!(report.overall_score, 0);
    assert_eq!(report.overall_status, OverallStatus::Failed);
    assert!(!report.can_proceed);
    assert!(report.results.is_empty());
}

#[tokio::test(start_paused = true)]
async fn hanging_check_times_out_as_retriable_unknown() {
    let checks: Vec<Arc<dyn HealthCheck>> = vec![Arc::new(HangingCheck), fixed("ok", 100)];

    let report = gate().run(&checks).await;

    let hanging = &report.results["hanging"];
    assert_eq!(hanging.status, CheckStatus::Unknown);
    assert_eq!(hanging.score, 0);
    assert!(hanging.retriable);
    assert_eq!(report.critical, vec!["hanging".to_string()]);
    assert_eq!(report.results["ok"].score, 100);
}

#[tokio::test(start_paused = true)]
async fn stalled_checks_run_concurrently_and_finish_at_longest_deadline() {
    let checks: Vec<Arc<dyn HealthCheck>> = vec![
        Arc::new(StalledCheck {
            name: "voice-api",
            timeout: Duration::from_secs(2),
        }),
        Arc::new(StalledCheck {
            name: "render-farm",
            timeout: Duration::from_secs(5),
        }),
        Arc::new(StalledCheck {
            name: "uploader",
            timeout: Duration::from_secs(3),
        }),
    ];

    let start = tokio::time::Instant::now();
    let report = gate().run(&checks).await;

    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert_eq!(report.results.len(), 3);
    for result in report.results.values() {
        assert_eq!(result.status, CheckStatus::Unknown, "{}", result.name);
        assert_eq!(result.score, 0, "{}", result.name);
        assert!(result.retriable, "{}", result.name);
    }
    assert_eq!(report.overall_score, 0);
    assert_eq!(report.overall_status, OverallStatus::Failed);
}

#[tokio::test]
async fn duplicate_check_names_keep_the_first_check() {
    let checks = vec![fixed("api-key", 100), fixed("api-key", 0), fixed("quota", 80)];

    let report = gate().run(&checks).await;

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results["api-key"].score, 100);
    assert!(report.critical.is_empty());
    assert_eq!(report.overall_score, 90);
    assert_eq!(report.overall_status, OverallStatus::Ready);
}

#[tokio::test]
async fn erroring_and_panicking_checks_degrade_to_unknown() {
    let checks: Vec<Arc<dyn HealthCheck>> = vec![Arc::new(ErroringCheck), Arc::new(PanickingCheck)];

    let report = gate().run(&checks).await;

    for name in ["erroring", "panicking"] {
        let result = &report.results[name];
        assert_eq!(result.status, CheckStatus::Unknown);
        assert_eq!(result.score, 0);
        assert!(!result.retriable);
    }
    assert!(report.results["erroring"].message.contains("connection refused"));
    assert_eq!(report.overall_status, OverallStatus::Failed);
}

#[tokio::test]
async fn results_are_keyed_by_declared_check_name() {
    let checks: Vec<Arc<dyn HealthCheck>> = vec![Arc::new(MisnamedCheck)];

    let report = gate().run(&checks).await;

    assert!(report.results.contains_key("declared"));
    assert_eq!(report.results["declared"].name, "declared");
}

#[test]
fn overall_score_is_rounded_mean() {
    let results = vec![
        HealthCheckResult::new("a", CheckStatus::Valid, 100, ""),
        HealthCheckResult::new("b", CheckStatus::Valid, 75, ""),
        HealthCheckResult::new("c", CheckStatus::Valid, 74, ""),
    ];

    let report = PreflightReport::from_results(results, &Thresholds::default());

    // 249 / 3 = 83.0
    assert_eq!(report.overall_score, 83);
    assert_eq!(report.overall_status, OverallStatus::Warning);
    assert!(report.can_proceed);
}

#[test]
fn critical_check_blocks_warning_status() {
    let thresholds = Thresholds { ready: 90, warn: 70 };

    assert_eq!(thresholds.decide(90, true), OverallStatus::Ready);
    assert_eq!(thresholds.decide(89, false), OverallStatus::Warning);
    assert_eq!(thresholds.decide(75, true), OverallStatus::Failed);
    assert_eq!(thresholds.decide(69, false), OverallStatus::Failed);
}

#[test]
fn scores_above_hundred_are_clamped() {
    let result = HealthCheckResult::new("a", CheckStatus::Valid, 250, "");
    assert_eq!(result.score, 100);
    assert!(!result.is_critical());
    assert!(!result.is_warning());
}

#[tokio::test]
async fn env_credential_check_reports_presence() {
    let var = "REELPIPE_TEST_PREFLIGHT_TOKEN";
    unsafe { std::env::remove_var(var) };
    let check = EnvCredentialCheck::new("token", var);

    let missing = check.probe().await.unwrap();
    assert_eq!(missing.status, CheckStatus::Missing);
    assert_eq!(missing.score, 0);

    unsafe { std::env::set_var(var, "secret") };
    let present = check.probe().await.unwrap();
    unsafe { std::env::remove_var(var) };

    assert_eq!(present.status, CheckStatus::Valid);
    assert_eq!(present.score, 100);
    assert_eq!(present.extra["var"], json!(var));
}

#[tokio::test]
async fn http_check_maps_statuses() {
    let server = MockServer::start_async().await;
    let cases = [
        ("/ok", 200, CheckStatus::Valid, 100, false),
        ("/forbidden", 403, CheckStatus::Invalid, 0, false),
        ("/limited", 429, CheckStatus::RefreshNeeded, 40, true),
        ("/down", 503, CheckStatus::Unknown, 20, true),
    ];

    for (path, code, _, _, _) in cases {
        server
            .mock_async(|when, then| {
                when.method(GET).path(path);
                then.status(code);
            })
            .await;
    }

    for (path, code, status, score, retriable) in cases {
        let check = HttpEndpointCheck::new("svc", server.url(path));
        let result = check.probe().await.unwrap();
        assert_eq!(result.status, status, "status for {path}");
        assert_eq!(result.score, score, "score for {path}");
        assert_eq!(result.retriable, retriable, "retriable for {path}");
        assert_eq!(result.extra["http_status"], json!(code));
    }
}

#[tokio::test]
async fn http_check_transport_failure_degrades_through_gate() {
    // Nothing listens on port 9 on a test host.
    let checks: Vec<Arc<dyn HealthCheck>> =
        vec![Arc::new(HttpEndpointCheck::new("svc", "http://127.0.0.1:9/health"))];

    let report = gate().run(&checks).await;

    assert_eq!(report.results["svc"].status, CheckStatus::Unknown);
    assert_eq!(report.critical, vec!["svc".to_string()]);
}

#[tokio::test]
async fn quota_check_scores_remaining_fraction() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/quota");
            then.status(200)
                .json_body(json!({ "remaining": 333, "limit": 1000 }));
        })
        .await;

    let result = QuotaCheck::new("quota", server.url("/quota"))
        .probe()
        .await
        .unwrap();

    assert_eq!(result.status, CheckStatus::Valid);
    assert_eq!(result.score, 33);
    assert!(result.is_warning());
    assert_eq!(result.extra["remaining"], json!(333));
    assert_eq!(result.extra["limit"], json!(1000));
    mock.assert_async().await;
}

#[tokio::test]
async fn exhausted_quota_is_expired() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/quota");
            then.status(200).json_body(json!({ "remaining": 0, "limit": 50 }));
        })
        .await;

    let result = QuotaCheck::new("quota", server.url("/quota"))
        .probe()
        .await
        .unwrap();

    assert_eq!(result.status, CheckStatus::Expired);
    assert_eq!(result.score, 0);
    assert!(result.retriable);
}

#[tokio::test]
async fn quota_check_rejects_malformed_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/quota");
            then.status(200).body("not json");
        })
        .await;

    let err = QuotaCheck::new("quota", server.url("/quota"))
        .probe()
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("Failed to parse quota response"));
}

#[test]
fn checks_are_built_from_settings_in_order() {
    let settings = vec![
        CheckSettings::Env {
            name: "api-key".to_string(),
            var: "REELPIPE_API_KEY".to_string(),
        },
        CheckSettings::Http {
            name: "stages".to_string(),
            url: "http://localhost:8080/health".to_string(),
            timeout_secs: Some(3),
        },
        CheckSettings::Quota {
            name: "tts-quota".to_string(),
            url: "http://localhost:8080/quota".to_string(),
            timeout_secs: None,
        },
    ];

    let built = checks::from_settings(&settings);

    let names: Vec<&str> = built.iter().map(|check| check.name()).collect();
    assert_eq!(names, vec!["api-key", "stages", "tts-quota"]);
    assert_eq!(built[1].timeout(), Some(Duration::from_secs(3)));
    assert_eq!(built[2].timeout(), None);
}
