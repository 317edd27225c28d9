use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

pub const APP_NAME: &str = "pickup";
pub const CHECKPOINT_FILE: &str = "timestamps.yml";
pub const LOG_FILE: &str = "pickup.log";
pub const DEFAULT_ARCHIVER: &str = "7z";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Persistent state: checkpoints, manifests and the verbose log
    pub state_dir: PathBuf,
    /// Program invoked in archive mode
    pub archiver: String,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            archiver: DEFAULT_ARCHIVER.to_string(),
            verbose: false,
        }
    }
}

impl Settings {
    /// Resolve settings from the command line overrides and the environment.
    pub fn load(state_dir: Option<PathBuf>, verbose: bool) -> Self {
        let state_dir = state_dir
            .or_else(|| std::env::var_os("PICKUP_STATE_DIR").map(PathBuf::from))
            .unwrap_or_else(default_state_dir);

        let archiver = std::env::var("PICKUP_ARCHIVER")
            .ok()
            .filter(|program| !program.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ARCHIVER.to_string());

        Self {
            state_dir,
            archiver,
            verbose,
        }
    }

    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            ..Self::default()
        }
    }

    pub async fn ensure_directories(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.state_dir)
            .await
            .with_context(|| format!("Failed to create state directory: {:?}", self.state_dir))?;
        debug!("Using state directory {:?}", self.state_dir);
        Ok(())
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.state_dir.join(CHECKPOINT_FILE)
    }

    /// Manifest of files handed to the archiver for one job
    pub fn manifest_path(&self, job: &str) -> PathBuf {
        self.state_dir.join(format!("{}.txt", sanitize_name(job)))
    }
}

fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(format!(".{}", APP_NAME)))
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' { ch } else { '_' })
        .collect()
}
