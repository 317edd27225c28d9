//! Incremental selection of directories created since the last run.
//!
//! The checkpoint names the newest directory picked up by the previous run.
//! Everything strictly after it in the current listing is new; the checkpointed
//! directory itself is never selected again.

use crate::checkpoint::Checkpoint;
use crate::directory::DirectoryEntry;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Nothing listed, nothing to record
    Empty,
    /// No prior checkpoint, everything is selected
    FirstRun,
    /// Entries after the checkpoint are selected; `skipped` were already picked up
    Resumed { skipped: usize },
    /// The checkpoint is still the newest entry
    UpToDate,
    /// The checkpointed directory vanished, everything is selected
    CheckpointNotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    pub entries: &'a [DirectoryEntry],
    /// Checkpoint to store after processing; `None` only for an empty listing
    pub checkpoint: Option<Checkpoint>,
    pub outcome: SelectionOutcome,
}

impl Selection<'_> {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Pick the entries of an ascending `listing` that come after `prior`.
pub fn select<'a>(listing: &'a [DirectoryEntry], prior: Option<&Checkpoint>) -> Selection<'a> {
    let Some(newest) = listing.last() else {
        return Selection {
            entries: &[],
            checkpoint: None,
            outcome: SelectionOutcome::Empty,
        };
    };
    let checkpoint = Some(Checkpoint::from(newest));

    let Some(prior) = prior else {
        return Selection {
            entries: listing,
            checkpoint,
            outcome: SelectionOutcome::FirstRun,
        };
    };

    match listing.iter().position(|entry| entry.name == prior.name) {
        Some(index) if index + 1 >= listing.len() => Selection {
            entries: &[],
            checkpoint,
            outcome: SelectionOutcome::UpToDate,
        },
        Some(index) => Selection {
            entries: listing.get(index + 1..).unwrap_or(&[]),
            checkpoint,
            outcome: SelectionOutcome::Resumed { skipped: index + 1 },
        },
        None => {
            warn!(
                "Checkpointed directory {:?} is no longer listed, selecting all {} entries",
                prior.name,
                listing.len()
            );
            Selection {
                entries: listing,
                checkpoint,
                outcome: SelectionOutcome::CheckpointNotFound,
            }
        }
    }
}
