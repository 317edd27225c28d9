use crate::error::{PickupError, PickupResult};
use std::cmp::Ordering;
use std::fs::Metadata;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::{debug, warn};

/// One immediate subdirectory of a source path.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryEntry {
    pub name: String,
    /// Seconds since the Unix epoch
    pub created_at: f64,
}

impl DirectoryEntry {
    pub fn new(name: impl Into<String>, created_at: f64) -> Self {
        Self {
            name: name.into(),
            created_at,
        }
    }

    /// Ascending by creation time, ties broken by name.
    pub fn listing_order(&self, other: &Self) -> Ordering {
        self.created_at
            .total_cmp(&other.created_at)
            .then_with(|| self.name.cmp(&other.name))
    }
}

pub struct DirectoryHandler;

impl DirectoryHandler {
    /// List the immediate subdirectories of `path`, oldest first.
    pub async fn list_directories(path: &Path) -> PickupResult<Vec<DirectoryEntry>> {
        let mut entries = fs::read_dir(path)
            .await
            .map_err(|e| PickupError::filesystem(path, e))?;

        let mut listing = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PickupError::filesystem(path, e))?
        {
            // Follow symlinks to directories
            let metadata = match fs::metadata(entry.path()).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Ignoring {:?}: {}", entry.path(), e);
                    continue;
                }
            };
            if !metadata.is_dir() {
                continue;
            }

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("Ignoring non UTF-8 directory name {:?}", entry.path());
                continue;
            };

            listing.push(DirectoryEntry::new(name, creation_time(&metadata)));
        }

        listing.sort_by(DirectoryEntry::listing_order);
        debug!("Found {} directories in {:?}", listing.len(), path);
        Ok(listing)
    }
}

/// Birth time when the filesystem reports it, otherwise the inode change time.
fn creation_time(metadata: &Metadata) -> f64 {
    if let Ok(created) = metadata.created() {
        return seconds_since_epoch(created);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        metadata.ctime() as f64 + metadata.ctime_nsec() as f64 / 1_000_000_000.0
    }

    #[cfg(not(unix))]
    {
        metadata.modified().map(seconds_since_epoch).unwrap_or(0.0)
    }
}

fn seconds_since_epoch(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
