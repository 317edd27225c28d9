use crate::error::{PickupError, PickupResult};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

/// What happens to a picked file. Injected so runs can be driven without
/// touching real tools.
#[allow(async_fn_in_trait)]
pub trait PickupAction {
    /// Copy `source` to `destination`, creating parent directories as needed.
    async fn copy_file(&self, source: &Path, destination: &Path) -> PickupResult<u64>;

    /// Pack every path listed in `manifest` into `archive`.
    async fn add_to_archive(
        &self,
        manifest: &Path,
        archive: &Path,
        volume_size_mb: Option<u64>,
    ) -> PickupResult<()>;
}

/// Copies with the filesystem and archives with an external 7-Zip compatible program.
pub struct SystemAction {
    archiver: String,
}

impl SystemAction {
    pub fn new(archiver: impl Into<String>) -> Self {
        Self {
            archiver: archiver.into(),
        }
    }

    pub fn archiver_args(manifest: &Path, archive: &Path, volume_size_mb: Option<u64>) -> Vec<String> {
        let mut args = vec!["a".to_string(), "-spf".to_string()];
        if let Some(size) = volume_size_mb {
            args.push(format!("-v{}m", size));
        }
        args.push(format!("-ir@{}", manifest.display()));
        args.push(archive.display().to_string());
        args
    }
}

impl PickupAction for SystemAction {
    async fn copy_file(&self, source: &Path, destination: &Path) -> PickupResult<u64> {
        let metadata = tokio::fs::metadata(source)
            .await
            .map_err(|e| PickupError::filesystem(source, e))?;
        if !metadata.is_file() {
            return Err(PickupError::FileNotFound {
                path: source.to_path_buf(),
            });
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PickupError::filesystem(parent, e))?;
        }

        let bytes = tokio::fs::copy(source, destination)
            .await
            .map_err(|e| PickupError::filesystem(source, e))?;
        debug!("Copied {:?} to {:?} ({} bytes)", source, destination, bytes);
        Ok(bytes)
    }

    async fn add_to_archive(
        &self,
        manifest: &Path,
        archive: &Path,
        volume_size_mb: Option<u64>,
    ) -> PickupResult<()> {
        let args = Self::archiver_args(manifest, archive, volume_size_mb);
        info!("Running {} {}", self.archiver, args.join(" "));

        let output = Command::new(&self.archiver)
            .args(&args)
            .output()
            .await
            .map_err(|e| PickupError::ArchiverFailed {
                program: self.archiver.clone(),
                reason: e.to_string(),
            })?;

        debug!("{} stdout: {}", self.archiver, String::from_utf8_lossy(&output.stdout).trim());

        if !output.status.success() {
            return Err(PickupError::ArchiverFailed {
                program: self.archiver.clone(),
                reason: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(())
    }
}
