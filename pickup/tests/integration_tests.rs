use anyhow::Result;
use pickup::{
    CheckpointManager, JobConfig, PickupAction, PickupError, PickupResult, RunContext, Settings,
    SystemAction,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use tokio::fs;

/// Records every request and refuses to copy anything listed in `broken`.
#[derive(Default)]
struct RecordingAction {
    copies: Mutex<Vec<(PathBuf, PathBuf)>>,
    archives: Mutex<Vec<(Vec<String>, Option<u64>)>>,
    broken: Vec<PathBuf>,
}

impl RecordingAction {
    fn copied_sources(&self) -> Vec<PathBuf> {
        self.copies.lock().unwrap().iter().map(|(src, _)| src.clone()).collect()
    }
}

impl PickupAction for RecordingAction {
    async fn copy_file(&self, source: &Path, destination: &Path) -> PickupResult<u64> {
        self.copies
            .lock()
            .unwrap()
            .push((source.to_path_buf(), destination.to_path_buf()));
        if self.broken.iter().any(|b| b == source) {
            return Err(PickupError::FileNotFound {
                path: source.to_path_buf(),
            });
        }
        Ok(1)
    }

    async fn add_to_archive(
        &self,
        manifest: &Path,
        _archive: &Path,
        volume_size_mb: Option<u64>,
    ) -> PickupResult<()> {
        let listed = std::fs::read_to_string(manifest)
            .map_err(|source| PickupError::Filesystem {
                path: manifest.to_path_buf(),
                source,
            })?
            .lines()
            .map(str::to_string)
            .collect();
        self.archives.lock().unwrap().push((listed, volume_size_mb));
        Ok(())
    }
}

struct Fixture {
    temp_dir: TempDir,
    settings: Settings,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::with_state_dir(temp_dir.path().join("state"));
        Self { temp_dir, settings }
    }

    fn source(&self) -> PathBuf {
        self.temp_dir.path().join("source")
    }

    fn output(&self) -> PathBuf {
        self.temp_dir.path().join("output")
    }

    /// Entries must be created oldest first and fully populated before the next one.
    async fn add_entry(&self, name: &str, files: &[&str]) -> Result<()> {
        let dir = self.source().join(name);
        fs::create_dir_all(&dir).await?;
        for file in files {
            fs::write(dir.join(file), format!("{}:{}", name, file)).await?;
        }
        // Keep creation times distinct across entries
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        Ok(())
    }

    fn copy_config(&self, filenames: &str) -> JobConfig {
        JobConfig::from_yaml_str(&format!(
            "daily:\n  path: {:?}\n  output: {:?}\n  filenames: {}\n",
            self.source(),
            self.output(),
            filenames
        ))
        .unwrap()
    }

    async fn run<A: PickupAction>(&self, config: JobConfig, action: A) -> Result<RunContext<A>> {
        let mut context = RunContext::new(self.settings.clone(), config, action).await;
        context.run().await?;
        Ok(context)
    }

    async fn stored_checkpoint(&self, job: &str) -> Option<String> {
        CheckpointManager::new(self.settings.checkpoint_path())
            .load()
            .await
            .unwrap()
            .get(job)
            .map(|c| c.name.clone())
    }
}

#[tokio::test]
async fn test_first_run_picks_everything() -> Result<()> {
    let fixture = Fixture::new();
    for name in ["A", "B", "C"] {
        fixture.add_entry(name, &["data.txt"]).await?;
    }

    fixture
        .run(fixture.copy_config("data.txt"), SystemAction::new("7z"))
        .await?;

    for name in ["A", "B", "C"] {
        let copied = fs::read_to_string(fixture.output().join(name).join("data.txt")).await?;
        assert_eq!(copied, format!("{}:data.txt", name));
    }
    assert_eq!(fixture.stored_checkpoint("daily").await.as_deref(), Some("C"));
    Ok(())
}

#[tokio::test]
async fn test_incremental_runs_only_pick_new_entries() -> Result<()> {
    let fixture = Fixture::new();
    fixture.add_entry("A", &["data.txt"]).await?;
    fixture.add_entry("B", &["data.txt"]).await?;

    let first = fixture
        .run(fixture.copy_config("data.txt"), RecordingAction::default())
        .await?;
    assert_eq!(
        first.action().copied_sources(),
        vec![
            fixture.source().join("A").join("data.txt"),
            fixture.source().join("B").join("data.txt"),
        ]
    );
    assert_eq!(fixture.stored_checkpoint("daily").await.as_deref(), Some("B"));

    // The checkpointed entry B is not picked up again
    fixture.add_entry("C", &["data.txt"]).await?;
    let second = fixture
        .run(fixture.copy_config("data.txt"), RecordingAction::default())
        .await?;
    assert_eq!(
        second.action().copied_sources(),
        vec![fixture.source().join("C").join("data.txt")]
    );
    assert_eq!(
        second.action().copies.lock().unwrap()[0].1,
        fixture.output().join("C").join("data.txt")
    );
    assert_eq!(fixture.stored_checkpoint("daily").await.as_deref(), Some("C"));

    let third = fixture
        .run(fixture.copy_config("data.txt"), RecordingAction::default())
        .await?;
    assert!(third.action().copied_sources().is_empty());
    assert_eq!(fixture.stored_checkpoint("daily").await.as_deref(), Some("C"));
    Ok(())
}

#[tokio::test]
async fn test_missing_file_does_not_stop_other_files() -> Result<()> {
    let fixture = Fixture::new();
    fixture.add_entry("A", &["one.txt", "two.txt"]).await?;
    fixture.add_entry("B", &["one.txt"]).await?;
    fixture.add_entry("C", &["one.txt", "two.txt"]).await?;

    let mut context = RunContext::new(
        fixture.settings.clone(),
        fixture.copy_config("[one.txt, two.txt]"),
        SystemAction::new("7z"),
    )
    .await;
    let summary = context.run().await?;

    assert_eq!(summary.files_picked, 5);
    assert_eq!(summary.files_failed, 1);
    assert!(fixture.output().join("B").join("one.txt").exists());
    assert!(!fixture.output().join("B").join("two.txt").exists());
    assert!(fixture.output().join("C").join("two.txt").exists());
    assert_eq!(fixture.stored_checkpoint("daily").await.as_deref(), Some("C"));
    Ok(())
}

#[tokio::test]
async fn test_failures_still_advance_checkpoint() -> Result<()> {
    let fixture = Fixture::new();
    fixture.add_entry("A", &["data.txt"]).await?;
    fixture.add_entry("B", &["data.txt"]).await?;

    let action = RecordingAction {
        broken: vec![fixture.source().join("B").join("data.txt")],
        ..RecordingAction::default()
    };
    let context = fixture.run(fixture.copy_config("data.txt"), action).await?;

    assert_eq!(
        context.action().copied_sources(),
        vec![
            fixture.source().join("A").join("data.txt"),
            fixture.source().join("B").join("data.txt"),
        ]
    );
    assert_eq!(fixture.stored_checkpoint("daily").await.as_deref(), Some("B"));
    Ok(())
}

#[tokio::test]
async fn test_vanished_checkpoint_reprocesses_everything() -> Result<()> {
    let fixture = Fixture::new();
    fixture.add_entry("A", &["data.txt"]).await?;
    fixture.add_entry("B", &["data.txt"]).await?;
    fixture
        .run(fixture.copy_config("data.txt"), RecordingAction::default())
        .await?;

    fs::remove_dir_all(fixture.source().join("B")).await?;
    fixture.add_entry("D", &["data.txt"]).await?;

    let context = fixture
        .run(fixture.copy_config("data.txt"), RecordingAction::default())
        .await?;
    assert_eq!(
        context.action().copied_sources(),
        vec![
            fixture.source().join("A").join("data.txt"),
            fixture.source().join("D").join("data.txt"),
        ]
    );
    assert_eq!(fixture.stored_checkpoint("daily").await.as_deref(), Some("D"));
    Ok(())
}

#[tokio::test]
async fn test_archive_mode_hands_manifest_to_archiver() -> Result<()> {
    let fixture = Fixture::new();
    fixture.add_entry("A", &["log.txt"]).await?;
    fixture.add_entry("B", &["log.txt"]).await?;

    let config = JobConfig::from_yaml_str(&format!(
        "logs.zip:\n  path: {:?}\n  size: 25\n  archive_dir: {:?}\n  filenames: log.txt\n",
        fixture.source(),
        fixture.temp_dir.path().join("archives"),
    ))?;
    let context = fixture.run(config, RecordingAction::default()).await?;

    let archives = context.action().archives.lock().unwrap().clone();
    assert_eq!(archives.len(), 1);
    assert_eq!(
        archives[0].0,
        vec![
            fixture.source().join("A").join("log.txt").display().to_string(),
            fixture.source().join("B").join("log.txt").display().to_string(),
        ]
    );
    assert_eq!(archives[0].1, Some(25));
    assert_eq!(fixture.stored_checkpoint("logs.zip").await.as_deref(), Some("B"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_jobs_do_not_block_valid_ones() -> Result<()> {
    let fixture = Fixture::new();
    fixture.add_entry("A", &["data.txt"]).await?;

    let config_path = fixture.temp_dir.path().join("jobs.yml");
    fs::write(
        &config_path,
        format!(
            "broken:\n  path: {:?}\nmissing_source:\n  path: {:?}\n  output: {:?}\n  filenames: data.txt\ngood:\n  path: {:?}\n  output: {:?}\n  filenames: data.txt\n",
            fixture.source(),
            fixture.temp_dir.path().join("nowhere"),
            fixture.output(),
            fixture.source(),
            fixture.output(),
        ),
    )
    .await?;

    let config = JobConfig::load(&config_path).await?;
    assert_eq!(config.jobs.len(), 2);
    assert_eq!(config.rejected.len(), 1);

    let mut context = RunContext::new(fixture.settings.clone(), config, SystemAction::new("7z")).await;
    let summary = context.run().await?;
    assert_eq!(summary.jobs_run, 1);
    assert_eq!(summary.jobs_skipped, 2);
    assert!(fixture.output().join("A").join("data.txt").exists());
    assert_eq!(fixture.stored_checkpoint("good").await.as_deref(), Some("A"));
    assert_eq!(fixture.stored_checkpoint("missing_source").await, None);
    Ok(())
}

#[tokio::test]
async fn test_missing_config_is_fatal() {
    let fixture = Fixture::new();
    let err = JobConfig::load(&fixture.temp_dir.path().join("nope.yml"))
        .await
        .unwrap_err();
    assert_eq!(err.severity(), pickup::ErrorSeverity::Fatal);
}
