//! Job configuration document.
//!
//! The document is a YAML mapping of job names to job specs. Each job is
//! decoded on its own so that one malformed entry never hides the others.

use crate::error::{PickupError, PickupResult};
use serde::Deserialize;
use serde_yaml::Value;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// `filenames` accepts a single name or a list of names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Filenames {
    One(String),
    Many(Vec<String>),
}

impl Filenames {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Filenames::One(name) => vec![name],
            Filenames::Many(names) => names,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawJobSpec {
    path: Option<PathBuf>,
    size: Option<u64>,
    output: Option<PathBuf>,
    filenames: Option<Filenames>,
    archive_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Pack picked files into a zip archive, split into volumes when a size is given
    Archive {
        volume_size_mb: Option<u64>,
        archive_dir: PathBuf,
    },
    /// Copy picked files below this directory, one subdirectory per entry
    Directory(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: String,
    pub source_path: PathBuf,
    pub destination: Destination,
    pub filenames: Vec<String>,
}

impl JobSpec {
    fn from_raw(name: String, raw: RawJobSpec) -> PickupResult<Self> {
        let invalid = |reason: &str| PickupError::InvalidJob {
            job: name.clone(),
            reason: reason.to_string(),
        };

        let source_path = raw.path.ok_or_else(|| invalid("missing 'path'"))?;

        let destination = match (raw.size, raw.output) {
            (Some(_), Some(_)) => return Err(invalid("'size' and 'output' are mutually exclusive")),
            (None, None) => return Err(invalid("missing 'size' or 'output'")),
            (Some(size), None) => Destination::Archive {
                volume_size_mb: (size > 0).then_some(size),
                archive_dir: raw.archive_dir.unwrap_or_else(|| PathBuf::from(".")),
            },
            (None, Some(output)) => Destination::Directory(output),
        };

        let filenames = raw
            .filenames
            .ok_or_else(|| invalid("missing 'filenames'"))?
            .into_vec();
        if filenames.is_empty() {
            return Err(invalid("'filenames' is empty"));
        }
        if let Some(bad) = filenames
            .iter()
            .find(|f| {
                let path = Path::new(f);
                f.trim().is_empty()
                    || path.is_absolute()
                    || path.components().any(|c| c == Component::ParentDir)
            })
        {
            return Err(invalid(&format!(
                "filename {:?} must be a non-empty relative path inside the entry",
                bad
            )));
        }

        Ok(Self {
            name,
            source_path,
            destination,
            filenames,
        })
    }

    /// Check that the source directory is present before it is enumerated.
    pub async fn validate_source(&self) -> PickupResult<()> {
        match tokio::fs::metadata(&self.source_path).await {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            _ => Err(PickupError::SourceNotFound {
                job: self.name.clone(),
                path: self.source_path.clone(),
            }),
        }
    }
}

/// Jobs in document order, plus the entries that failed validation.
#[derive(Debug, Default)]
pub struct JobConfig {
    pub jobs: Vec<JobSpec>,
    pub rejected: Vec<PickupError>,
}

impl JobConfig {
    pub async fn load(path: &Path) -> PickupResult<Self> {
        if !path.exists() {
            return Err(PickupError::ConfigurationNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PickupError::filesystem(path, e))?;

        let config = Self::from_yaml_str(&content)?;
        debug!(
            "Loaded {} job(s) from {:?} ({} rejected)",
            config.jobs.len(),
            path,
            config.rejected.len()
        );
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> PickupResult<Self> {
        let document: Value = serde_yaml::from_str(content).map_err(|e| {
            PickupError::ConfigurationParseError {
                reason: e.to_string(),
            }
        })?;

        let mapping = match document {
            Value::Mapping(mapping) => mapping,
            Value::Null => return Ok(Self::default()),
            _ => {
                return Err(PickupError::ConfigurationParseError {
                    reason: "expected a mapping of job names to job specs".to_string(),
                })
            }
        };

        let mut config = Self::default();
        for (key, value) in mapping {
            let name = match key {
                Value::String(name) => name,
                Value::Number(number) => number.to_string(),
                other => {
                    let error = PickupError::InvalidJob {
                        job: format!("{:?}", other),
                        reason: "job names must be strings".to_string(),
                    };
                    warn!("Skipping job: {}", error);
                    config.rejected.push(error);
                    continue;
                }
            };

            let decoded = serde_yaml::from_value::<RawJobSpec>(value)
                .map_err(|e| PickupError::InvalidJob {
                    job: name.clone(),
                    reason: e.to_string(),
                })
                .and_then(|raw| JobSpec::from_raw(name, raw));

            match decoded {
                Ok(job) => config.jobs.push(job),
                Err(error) => {
                    warn!("Skipping job because it's not valid: {}", error);
                    config.rejected.push(error);
                }
            }
        }

        Ok(config)
    }
}
