use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use tracing::debug;

use crate::client::{ServiceClient, StageRequest};
use crate::errors::{ErrorKind, StageError};
use crate::recovery::predicates;

use super::record::{Artifacts, WorkRecord};
use super::stages::Stage;
use super::types::StageKind;

/// Stage whose body is an HTTP service at `{endpoint}/{path}`.
pub struct HttpStage {
    kind: StageKind,
    name: String,
    path: String,
    client: Arc<ServiceClient>,
}

impl HttpStage {
    pub fn new(kind: StageKind, client: Arc<ServiceClient>) -> Self {
        Self {
            kind,
            name: kind.to_string(),
            path: kind.to_string(),
            client,
        }
    }

    /// Publish branch for one platform, posted to `{endpoint}/publish/{platform}`.
    pub fn publish_to(platform: &str, client: Arc<ServiceClient>) -> Self {
        Self {
            kind: StageKind::Publish,
            name: format!("publish:{platform}"),
            path: format!("publish/{platform}"),
            client,
        }
    }
}

#[async_trait]
impl Stage for HttpStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn validate_input(&self, record: &WorkRecord) -> Result<(), StageError> {
        let Some(previous) = self.kind.prerequisite() else {
            return Ok(());
        };
        if predicates::for_kind(previous)(&record.fields) {
            Ok(())
        } else {
            Err(StageError::invalid_input(format!(
                "{} needs the output of {previous}, which record {} does not have",
                self.name, record.id
            )))
        }
    }

    async fn run(&self, record: &WorkRecord) -> Result<Artifacts, StageError> {
        debug!(stage = %self.name, url = %self.client.base_url(), "invoking stage service");
        let request = StageRequest {
            record_id: &record.id,
            fields: &record.fields,
        };
        self.client.invoke(&self.path, &request).await
    }
}

/// Runs independent sub-stages concurrently and reports them as one stage.
///
/// Branch outputs are merged; object values under the same key are unioned so
/// that e.g. per-platform `published` maps combine. If any branch fails, the
/// most severe error is reported. A retry re-runs every branch, so branch
/// services must be idempotent per record id.
pub struct ParallelStage {
    kind: StageKind,
    branches: Vec<Arc<dyn Stage>>,
}

impl ParallelStage {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            branches: Vec::new(),
        }
    }

    pub fn with_branch<S>(mut self, branch: S) -> Self
    where
        S: Stage + 'static,
    {
        self.branches.push(Arc::new(branch));
        self
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }
}

#[async_trait]
impl Stage for ParallelStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn validate_input(&self, record: &WorkRecord) -> Result<(), StageError> {
        if self.branches.is_empty() {
            return Err(StageError::invalid_input(format!(
                "{} has no branches configured",
                self.kind
            )));
        }
        self.branches
            .iter()
            .try_for_each(|branch| branch.validate_input(record))
    }

    async fn run(&self, record: &WorkRecord) -> Result<Artifacts, StageError> {
        let results = join_all(self.branches.iter().map(|branch| branch.run(record))).await;

        let mut merged = Artifacts::new();
        let mut worst: Option<StageError> = None;
        for result in results {
            match result {
                Ok(output) => merge_branch_output(&mut merged, output),
                Err(error) => {
                    let replace = worst
                        .as_ref()
                        .is_none_or(|current| severity(error.kind) > severity(current.kind));
                    if replace {
                        worst = Some(error);
                    }
                }
            }
        }

        match worst {
            Some(error) => Err(error),
            None => Ok(merged),
        }
    }
}

fn merge_branch_output(merged: &mut Artifacts, output: Artifacts) {
    for (key, value) in output {
        match (merged.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => existing.extend(incoming),
            (_, value) => {
                merged.insert(key, value);
            }
        }
    }
}

fn severity(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::TransientUpstream => 1,
        ErrorKind::Unknown => 2,
        ErrorKind::QuotaExhausted => 3,
        ErrorKind::InvalidInput | ErrorKind::PermanentUpstream => 4,
    }
}
