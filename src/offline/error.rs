use thiserror::Error;

use super::synchronizer::SyncReport;

/// Errors surfaced by the offline synchronizer
#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("An offline mode change is already in progress")]
    AlreadyRunning,

    #[error("No user is logged in")]
    NotLoggedIn,

    #[error("Failed to clear offline data: {}", .0.join("; "))]
    Cleanup(Vec<String>),

    #[error("Failed to save offline user data; offline mode was not enabled")]
    SnapshotNotSaved(SyncReport),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, OfflineError>;
