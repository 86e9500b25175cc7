//! Offline library mirroring

pub mod downloader;
pub mod error;
pub mod notify;
pub mod progress;
pub mod storage;
pub mod synchronizer;

pub use downloader::{CachingDownloader, TrackDownloader};
pub use error::OfflineError;
pub use notify::{ConsoleNotifier, Notification, NotificationHandle, Notifier};
pub use progress::{NotificationState, ProgressTracker};
pub use storage::OfflineStorage;
pub use synchronizer::{LoadOutcome, OfflineState, OfflineSynchronizer, SyncReport};
