use crate::directory::DirectoryEntry;
use crate::error::{PickupError, PickupResult};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Newest directory already picked up for a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub name: String,
    /// Creation time of that directory, seconds since the Unix epoch
    pub time: f64,
}

impl From<&DirectoryEntry> for Checkpoint {
    fn from(entry: &DirectoryEntry) -> Self {
        Self {
            name: entry.name.clone(),
            time: entry.created_at,
        }
    }
}

/// Checkpoints keyed by job name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckpointStore {
    entries: BTreeMap<String, Checkpoint>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, job: &str) -> Option<&Checkpoint> {
        self.entries.get(job)
    }

    /// Replace the checkpoint for `job`, leaving every other job untouched.
    pub fn record(&mut self, job: &str, checkpoint: Checkpoint) -> Option<Checkpoint> {
        self.entries.insert(job.to_string(), checkpoint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct CheckpointManager {
    path: PathBuf,
}

impl CheckpointManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the store. A missing file is an empty store; malformed entries are dropped.
    pub async fn load(&self) -> PickupResult<CheckpointStore> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No checkpoint file at {:?}, starting fresh", self.path);
                return Ok(CheckpointStore::new());
            }
            Err(e) => return Err(self.load_failed(e.to_string())),
        };

        let document: Value =
            serde_yaml::from_str(&contents).map_err(|e| self.load_failed(e.to_string()))?;

        let mapping = match document {
            Value::Null => return Ok(CheckpointStore::new()),
            Value::Mapping(mapping) => mapping,
            _ => return Err(self.load_failed("expected a mapping of job names to checkpoints".to_string())),
        };

        let mut store = CheckpointStore::new();
        for (key, value) in mapping {
            let Some(job) = key.as_str() else {
                warn!("Ignoring checkpoint with non-string job name {:?}", key);
                continue;
            };
            match serde_yaml::from_value::<Checkpoint>(value) {
                Ok(checkpoint) => {
                    store.record(job, checkpoint);
                }
                Err(e) => warn!(job = %job, "Ignoring malformed checkpoint: {}", e),
            }
        }

        info!("Loaded {} checkpoint(s) from {:?}", store.len(), self.path);
        Ok(store)
    }

    /// Overwrite the store in one step: write a sibling temp file, then rename it over.
    pub async fn save(&self, store: &CheckpointStore) -> PickupResult<()> {
        let yaml = serde_yaml::to_string(&store.entries).map_err(|e| self.save_failed(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.save_failed(e.to_string()))?;
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| self.save_failed(e.to_string()))?;
        file.write_all(yaml.as_bytes())
            .await
            .map_err(|e| self.save_failed(e.to_string()))?;
        file.sync_all()
            .await
            .map_err(|e| self.save_failed(e.to_string()))?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| self.save_failed(e.to_string()))?;

        debug!("Saved {} checkpoint(s) to {:?}", store.len(), self.path);
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn load_failed(&self, reason: String) -> PickupError {
        PickupError::CheckpointLoadFailed {
            path: self.path.clone(),
            reason,
        }
    }

    fn save_failed(&self, reason: String) -> PickupError {
        PickupError::CheckpointSaveFailed {
            path: self.path.clone(),
            reason,
        }
    }
}
