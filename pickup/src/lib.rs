pub mod action;
pub mod checkpoint;
pub mod config;
pub mod directory;
pub mod error;
pub mod logging;
pub mod processor;
pub mod runner;
pub mod selector;
pub mod settings;

// Re-export commonly used types
pub use action::{PickupAction, SystemAction};
pub use checkpoint::{Checkpoint, CheckpointManager, CheckpointStore};
pub use config::{Destination, Filenames, JobConfig, JobSpec};
pub use directory::{DirectoryEntry, DirectoryHandler};
pub use error::{ErrorSeverity, PickupError, PickupResult};
pub use processor::{EntryProcessor, JobReport};
pub use runner::{RunContext, RunSummary};
pub use selector::{select, Selection, SelectionOutcome};
pub use settings::Settings;
