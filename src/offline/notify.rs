//! In-app notifications for offline progress

use chrono::{DateTime, Utc};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::progress::NotificationState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Progress,
}

/// A notification as posted by the synchronizer
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub date: DateTime<Utc>,
    pub icon: String,
    pub state: NotificationState,
}

impl Notification {
    /// A one-shot informational notification
    pub fn info(message: impl Into<String>, icon: &str) -> Self {
        Self {
            kind: NotificationKind::Info,
            message: message.into(),
            date: Utc::now(),
            icon: icon.to_string(),
            state: NotificationState::Idle,
        }
    }

    /// A progress notification starting at zero
    pub fn progress(message: impl Into<String>, icon: &str, total: usize) -> Self {
        Self {
            kind: NotificationKind::Progress,
            message: message.into(),
            date: Utc::now(),
            icon: icon.to_string(),
            state: NotificationState::start(total),
        }
    }
}

/// Identifies a posted notification for later updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationHandle(pub u64);

/// Sink for notifications
pub trait Notifier: Send + Sync {
    fn show(&self, notification: Notification) -> NotificationHandle;
    fn update(&self, handle: NotificationHandle, state: NotificationState);
    fn dismiss(&self, handle: NotificationHandle);
}

/// Renders notifications on the terminal, progress ones as bars
#[derive(Default)]
pub struct ConsoleNotifier {
    next_id: AtomicU64,
    bars: Mutex<HashMap<u64, ProgressBar>>,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
    }
}

impl Notifier for ConsoleNotifier {
    fn show(&self, notification: Notification) -> NotificationHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        match notification.state {
            NotificationState::InProgress { current, total } => {
                let bar = ProgressBar::new(total as u64);
                bar.set_style(Self::bar_style());
                bar.set_position(current as u64);
                bar.set_message(notification.message);
                if let Ok(mut bars) = self.bars.lock() {
                    bars.insert(id, bar);
                }
            }
            _ => {
                println!(
                    "{} {}",
                    notification.date.format("%H:%M:%S").to_string().dimmed(),
                    notification.message.green()
                );
            }
        }

        NotificationHandle(id)
    }

    fn update(&self, handle: NotificationHandle, state: NotificationState) {
        let Ok(bars) = self.bars.lock() else {
            return;
        };
        if let Some(bar) = bars.get(&handle.0) {
            match state {
                NotificationState::InProgress { current, .. } => bar.set_position(current as u64),
                NotificationState::Complete { completed, .. } => {
                    bar.set_position(completed as u64);
                    bar.finish();
                }
                NotificationState::Idle => {}
            }
        }
    }

    fn dismiss(&self, handle: NotificationHandle) {
        if let Ok(mut bars) = self.bars.lock() {
            if let Some(bar) = bars.remove(&handle.0) {
                bar.finish_and_clear();
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_notification_starts_at_zero() {
        let n = Notification::progress("Downloading offline data...", "file-download", 5);
        assert_eq!(n.kind, NotificationKind::Progress);
        assert_eq!(n.state, NotificationState::InProgress { current: 0, total: 5 });
    }

    #[test]
    fn test_console_notifier_tracks_bars() {
        let notifier = ConsoleNotifier::new();
        let handle = notifier.show(Notification::progress("x", "", 3));
        notifier.update(handle, NotificationState::InProgress { current: 2, total: 3 });
        assert_eq!(notifier.bars.lock().unwrap().len(), 1);
        notifier.dismiss(handle);
        assert!(notifier.bars.lock().unwrap().is_empty());
    }
}
