use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::errors::StoreError;
use crate::pipeline::WorkRecord;

use super::RecordStore;

/// One pretty-printed JSON file per record, `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn load(&self, id: &str) -> Result<Option<WorkRecord>, StoreError> {
        let path = self.path_for(id)?;
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(source) if source.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        let record = serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            id: id.to_string(),
            source,
        })?;
        Ok(Some(record))
    }

    async fn save(&self, record: &WorkRecord) -> Result<(), StoreError> {
        let path = self.path_for(&record.id)?;
        let json = serde_json::to_string_pretty(record).map_err(|source| StoreError::Serialize {
            id: record.id.clone(),
            source,
        })?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Write {
                path: self.dir.clone(),
                source,
            })?;

        // Write then rename so a crash never leaves a half-written checkpoint.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json)
            .await
            .map_err(|source| StoreError::Write {
                path: staging.clone(),
                source,
            })?;
        fs::rename(&staging, &path)
            .await
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;

        debug!(record = %record.id, path = %path.display(), "record saved");
        Ok(())
    }
}
