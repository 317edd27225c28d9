use crate::action::PickupAction;
use crate::config::{Destination, JobSpec};
use crate::directory::DirectoryEntry;
use crate::error::{PickupError, PickupResult};
use crate::settings::Settings;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

/// Outcome of picking up files for one job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub entries: usize,
    pub files_picked: usize,
    pub files_failed: usize,
    pub archive: Option<PathBuf>,
}

/// Walks selected entries oldest first and each configured filename in order.
pub struct EntryProcessor<'a, A> {
    action: &'a A,
    settings: &'a Settings,
}

impl<'a, A: PickupAction> EntryProcessor<'a, A> {
    pub fn new(action: &'a A, settings: &'a Settings) -> Self {
        Self { action, settings }
    }

    pub async fn process(&self, job: &JobSpec, entries: &[DirectoryEntry]) -> PickupResult<JobReport> {
        match &job.destination {
            Destination::Directory(output) => Ok(self.copy_entries(job, output, entries).await),
            Destination::Archive {
                volume_size_mb,
                archive_dir,
            } => {
                self.archive_entries(job, archive_dir, *volume_size_mb, entries)
                    .await
            }
        }
    }

    async fn copy_entries(&self, job: &JobSpec, output: &Path, entries: &[DirectoryEntry]) -> JobReport {
        let mut report = JobReport {
            entries: entries.len(),
            ..JobReport::default()
        };

        for entry in entries {
            for filename in &job.filenames {
                let source = source_file(job, entry, filename);
                let destination = output.join(&entry.name).join(filename);
                match self.action.copy_file(&source, &destination).await {
                    Ok(_) => report.files_picked += 1,
                    Err(e) => {
                        error!(job = %job.name, entry = %entry.name, "Failed to copy {:?}: {}", source, e);
                        report.files_failed += 1;
                    }
                }
            }
        }

        report
    }

    async fn archive_entries(
        &self,
        job: &JobSpec,
        archive_dir: &Path,
        volume_size_mb: Option<u64>,
        entries: &[DirectoryEntry],
    ) -> PickupResult<JobReport> {
        let mut report = JobReport {
            entries: entries.len(),
            ..JobReport::default()
        };

        let mut manifest = String::new();
        for entry in entries {
            for filename in &job.filenames {
                let source = source_file(job, entry, filename);
                match tokio::fs::metadata(&source).await {
                    Ok(metadata) if metadata.is_file() => {
                        manifest.push_str(&source.display().to_string());
                        manifest.push('\n');
                        report.files_picked += 1;
                    }
                    _ => {
                        let e = PickupError::FileNotFound { path: source };
                        error!(job = %job.name, entry = %entry.name, "Not archiving: {}", e);
                        report.files_failed += 1;
                    }
                }
            }
        }

        if report.files_picked == 0 {
            info!(job = %job.name, "No files to archive");
            return Ok(report);
        }

        let manifest_path = self.settings.manifest_path(&job.name);
        write_manifest(&manifest_path, &manifest).await?;
        debug!(job = %job.name, "Wrote manifest {:?}", manifest_path);

        tokio::fs::create_dir_all(archive_dir)
            .await
            .map_err(|e| PickupError::filesystem(archive_dir, e))?;
        let archive = archive_dir.join(archive_file_name(&job.name, chrono::Utc::now().timestamp_millis()));

        self.action
            .add_to_archive(&manifest_path, &archive, volume_size_mb)
            .await?;
        info!(job = %job.name, "Archived {} file(s) into {:?}", report.files_picked, archive);

        report.archive = Some(archive);
        Ok(report)
    }
}

fn source_file(job: &JobSpec, entry: &DirectoryEntry, filename: &str) -> PathBuf {
    job.source_path.join(&entry.name).join(filename)
}

/// `<job>_<millis>.zip`, without doubling a `.zip` already on the job name.
pub fn archive_file_name(job: &str, timestamp_millis: i64) -> String {
    let stem = job.strip_suffix(".zip").unwrap_or(job);
    format!("{}_{}.zip", stem, timestamp_millis)
}

async fn write_manifest(path: &Path, contents: &str) -> PickupResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PickupError::filesystem(parent, e))?;
    }
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| PickupError::filesystem(path, e))?;
    file.write_all(contents.as_bytes())
        .await
        .map_err(|e| PickupError::filesystem(path, e))?;
    file.flush().await.map_err(|e| PickupError::filesystem(path, e))?;
    Ok(())
}
