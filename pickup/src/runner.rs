use crate::action::PickupAction;
use crate::checkpoint::{Checkpoint, CheckpointManager, CheckpointStore};
use crate::config::{JobConfig, JobSpec};
use crate::directory::DirectoryHandler;
use crate::error::{PickupError, PickupResult};
use crate::processor::{EntryProcessor, JobReport};
use crate::selector::{select, SelectionOutcome};
use crate::settings::Settings;
use tracing::{error, info, warn};

/// Totals for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub jobs_run: usize,
    pub jobs_skipped: usize,
    pub jobs_failed: usize,
    pub files_picked: usize,
    pub files_failed: usize,
}

struct JobRun {
    checkpoint: Option<Checkpoint>,
    outcome: SelectionOutcome,
    result: PickupResult<JobReport>,
}

/// Everything a run needs, built once at startup and passed down explicitly.
pub struct RunContext<A> {
    settings: Settings,
    jobs: Vec<JobSpec>,
    rejected_jobs: usize,
    checkpoints: CheckpointStore,
    manager: CheckpointManager,
    action: A,
}

impl<A: PickupAction> RunContext<A> {
    /// Load the checkpoint store; an unreadable store is treated as empty.
    pub async fn new(settings: Settings, config: JobConfig, action: A) -> Self {
        let manager = CheckpointManager::new(settings.checkpoint_path());
        let checkpoints = match manager.load().await {
            Ok(store) => store,
            Err(e) => {
                warn!("{}; every job starts from scratch", e);
                CheckpointStore::new()
            }
        };

        Self {
            settings,
            jobs: config.jobs,
            rejected_jobs: config.rejected.len(),
            checkpoints,
            manager,
            action,
        }
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    /// Process every job in order, then persist all checkpoints in a single write.
    pub async fn run(&mut self) -> PickupResult<RunSummary> {
        let mut summary = RunSummary {
            jobs_skipped: self.rejected_jobs,
            ..RunSummary::default()
        };
        let processor = EntryProcessor::new(&self.action, &self.settings);

        for job in &self.jobs {
            let run = match Self::run_job(job, &self.checkpoints, &processor).await {
                Ok(run) => run,
                Err(e) => {
                    warn!(job = %job.name, "Skipping job: {}", e);
                    summary.jobs_skipped += 1;
                    continue;
                }
            };

            summary.jobs_run += 1;
            match run.result {
                Ok(report) => {
                    summary.files_picked += report.files_picked;
                    summary.files_failed += report.files_failed;
                    info!(
                        job = %job.name,
                        "{:?}: {} entries, {} file(s) picked, {} failed",
                        run.outcome,
                        report.entries,
                        report.files_picked,
                        report.files_failed
                    );
                }
                Err(e) => {
                    error!(job = %job.name, "Pickup failed: {}", e);
                    summary.jobs_failed += 1;
                }
            }

            if let Some(checkpoint) = run.checkpoint {
                self.checkpoints.record(&job.name, checkpoint);
            }
        }

        self.manager.save(&self.checkpoints).await?;
        info!(
            "Run complete: {} job(s) run, {} skipped, {} failed, {} file(s) picked, {} missing",
            summary.jobs_run,
            summary.jobs_skipped,
            summary.jobs_failed,
            summary.files_picked,
            summary.files_failed
        );
        Ok(summary)
    }

    async fn run_job(
        job: &JobSpec,
        checkpoints: &CheckpointStore,
        processor: &EntryProcessor<'_, A>,
    ) -> PickupResult<JobRun> {
        job.validate_source().await?;

        let listing = DirectoryHandler::list_directories(&job.source_path)
            .await
            .map_err(|e| match e {
                PickupError::FileNotFound { .. } => PickupError::SourceNotFound {
                    job: job.name.clone(),
                    path: job.source_path.clone(),
                },
                other => other,
            })?;

        let selection = select(&listing, checkpoints.get(&job.name));
        let result = if selection.is_empty() {
            info!(job = %job.name, "Nothing new since last run");
            Ok(JobReport::default())
        } else {
            info!(job = %job.name, "Picking up {} new entries", selection.entries.len());
            processor.process(job, selection.entries).await
        };

        Ok(JobRun {
            checkpoint: selection.checkpoint,
            outcome: selection.outcome,
            result,
        })
    }
}
