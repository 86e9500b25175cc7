//! Offline state synchronizer
//!
//! Mirrors the live user library onto local storage and restores it at
//! startup. Enabling fans out one unit of work per playlist file, per
//! track download and for the root snapshot, then joins on all of them
//! while a timer refreshes the progress notification.

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::downloader::TrackDownloader;
use super::error::{OfflineError, Result};
use super::notify::{Notification, Notifier};
use super::progress::{NotificationState, ProgressSnapshot, ProgressTracker};
use super::storage::OfflineStorage;
use crate::backend::session::dedup_playlists;
use crate::backend::{OfflineUserData, Playlist, TrackData, User, UserSession};
use crate::settings::ConfigSource;

const NOTIFICATION_ICON: &str = "file-download";
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Outcome of an offline-enable run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

impl From<ProgressSnapshot> for SyncReport {
    fn from(s: ProgressSnapshot) -> Self {
        Self {
            total: s.total,
            completed: s.completed,
            failed: s.failed,
        }
    }
}

/// What `load_state` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Offline mode is off; nothing was read
    Disabled,
    /// No usable snapshot on disk; callbacks were not invoked
    MissingSnapshot,
    Loaded { playlists: usize, favorites: usize },
}

/// Library reconstructed from disk
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineState {
    pub user: User,
    pub playlists: Vec<Playlist>,
    pub favorites: Vec<TrackData>,
}

/// One countable piece of an enable run
enum Unit {
    Snapshot(OfflineUserData),
    Playlist(Playlist),
    /// A track download standing in for `weight` references to it
    Track { track: TrackData, weight: usize },
}

impl Unit {
    fn weight(&self) -> usize {
        match self {
            Unit::Track { weight, .. } => *weight,
            _ => 1,
        }
    }

    fn describe(&self) -> String {
        match self {
            Unit::Snapshot(_) => "user data".to_string(),
            Unit::Playlist(p) => format!("playlist {}", p.name),
            Unit::Track { track, .. } => format!("track {} ({})", track.title, track.id),
        }
    }
}

/// Everything an enable run will do, captured up front
struct SyncPlan {
    units: Vec<Unit>,
    total: usize,
}

impl SyncPlan {
    fn from_session(user: &User, session: &UserSession) -> Self {
        let mut playlists = Vec::new();
        for playlist in &session.playlists {
            if playlist.id.is_some() {
                playlists.push(playlist.clone());
            } else {
                warn!("Skipping playlist without an ID: {}", playlist.name);
            }
        }

        // The same track may appear in several places; download it once
        let mut order = Vec::new();
        let mut tracks: HashMap<String, (TrackData, usize)> = HashMap::new();
        let referenced = playlists
            .iter()
            .flat_map(|p| p.tracks.iter())
            .chain(session.favorites.iter());
        for track in referenced {
            tracks
                .entry(track.id.clone())
                .or_insert_with(|| {
                    order.push(track.id.clone());
                    (track.clone(), 0)
                })
                .1 += 1;
        }

        let snapshot = OfflineUserData {
            user: user.clone(),
            playlists: playlists.iter().filter_map(|p| p.id.clone()).collect(),
            favorites: session.favorites.iter().map(|t| t.id.clone()).collect(),
        };

        let mut units = vec![Unit::Snapshot(snapshot)];
        units.extend(playlists.into_iter().map(Unit::Playlist));
        units.extend(order.into_iter().filter_map(|id| {
            tracks
                .remove(&id)
                .map(|(track, weight)| Unit::Track { track, weight })
        }));

        let total = units.iter().map(Unit::weight).sum();
        Self { units, total }
    }
}

/// Owns offline mode: the mirror on disk, the flag, and run progress
pub struct OfflineSynchronizer {
    storage: OfflineStorage,
    downloader: Arc<dyn TrackDownloader>,
    notifier: Arc<dyn Notifier>,
    config: Arc<dyn ConfigSource>,
    progress: Arc<ProgressTracker>,
    offline: AtomicBool,
    /// Held for the duration of an enable, disable or load
    operation: Mutex<()>,
    refresh_interval: Duration,
}

impl OfflineSynchronizer {
    pub fn new(
        storage: OfflineStorage,
        downloader: Arc<dyn TrackDownloader>,
        notifier: Arc<dyn Notifier>,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            storage,
            downloader,
            notifier,
            config,
            progress: Arc::new(ProgressTracker::new()),
            offline: AtomicBool::new(false),
            operation: Mutex::new(()),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    /// How often the progress notification is refreshed during a run
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Live counters of the current run, for UI timers
    pub fn progress(&self) -> Arc<ProgressTracker> {
        self.progress.clone()
    }

    pub fn storage(&self) -> &OfflineStorage {
        &self.storage
    }

    /// Restore the mirrored library if offline mode is on
    ///
    /// Callbacks run in order (user, playlists, favorites) and only when
    /// the snapshot could be read.
    pub async fn load_state<U, P, F>(
        &self,
        on_user: U,
        on_playlists: P,
        on_favorites: F,
    ) -> LoadOutcome
    where
        U: FnOnce(User),
        P: FnOnce(Vec<Playlist>),
        F: FnOnce(Vec<TrackData>),
    {
        let _guard = self.operation.lock().await;

        let enabled = self.config.system().offline;
        self.offline.store(enabled, Ordering::SeqCst);
        if !enabled {
            return LoadOutcome::Disabled;
        }

        let Some(state) = self.read_mirror().await else {
            return LoadOutcome::MissingSnapshot;
        };

        let outcome = LoadOutcome::Loaded {
            playlists: state.playlists.len(),
            favorites: state.favorites.len(),
        };

        on_user(state.user);
        on_playlists(state.playlists);
        on_favorites(state.favorites);

        outcome
    }

    /// Read the mirror back regardless of the offline flag
    ///
    /// Unreadable playlists or favorites are logged and left out.
    pub async fn load_snapshot(&self) -> Option<OfflineState> {
        let _guard = self.operation.lock().await;
        self.read_mirror().await
    }

    /// Caller holds `operation`
    async fn read_mirror(&self) -> Option<OfflineState> {
        let snapshot: OfflineUserData =
            match self.storage.read_record(&self.storage.user_data_path()).await {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => {
                    error!("Unable to load offline user data.");
                    return None;
                }
                Err(e) => {
                    error!("Unable to load offline user data: {:#}", e);
                    return None;
                }
            };
        info!("Loaded offline user data.");

        let playlists = self.read_playlists(&snapshot.playlists).await;
        info!("Loaded {} offline playlists.", playlists.len());

        let favorites = self.read_favorites(&snapshot.favorites).await;
        info!("Loaded {} offline favorites.", favorites.len());

        Some(OfflineState {
            user: snapshot.user,
            playlists,
            favorites,
        })
    }

    /// The playlists the snapshot lists, unique by ID, in snapshot order
    ///
    /// Files for playlists the snapshot does not reference are ignored.
    async fn read_playlists(&self, snapshot_order: &[String]) -> Vec<Playlist> {
        let dir = self.storage.playlists_dir();
        let names = match self.storage.list_dir(&dir).await {
            Ok(names) => names,
            Err(e) => {
                error!("Unable to list offline playlists: {:#}", e);
                return Vec::new();
            }
        };

        let position: HashMap<&str, usize> = snapshot_order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let reads = names
            .iter()
            .filter(|name| name.ends_with(".json"))
            .map(|name| {
                let path = dir.join(name);
                async move {
                    match self.storage.read_record::<Playlist>(&path).await {
                        Ok(playlist) => playlist.map(|p| (path, p)),
                        Err(e) => {
                            warn!("Skipping offline playlist: {:#}", e);
                            None
                        }
                    }
                }
            });
        let mut found: Vec<(PathBuf, Playlist)> = join_all(reads)
            .await
            .into_iter()
            .flatten()
            .filter(|(path, p)| {
                let listed = p.id.as_deref().is_some_and(|id| position.contains_key(id));
                if !listed {
                    debug!("Ignoring unreferenced playlist file {}", path.display());
                }
                listed
            })
            .collect();

        // A file at the playlist's own key wins over stray copies
        found.sort_by_key(|(path, p)| {
            p.id.as_deref()
                .is_none_or(|id| *path != self.storage.playlist_path(id))
        });
        let mut playlists: Vec<Playlist> = found.into_iter().map(|(_, p)| p).collect();
        dedup_playlists(&mut playlists);

        playlists.sort_by_key(|p| {
            p.id.as_deref()
                .and_then(|id| position.get(id).copied())
                .unwrap_or(usize::MAX)
        });

        if playlists.len() < snapshot_order.len() {
            warn!(
                "{} of {} offline playlists could not be read",
                snapshot_order.len() - playlists.len(),
                snapshot_order.len()
            );
        }

        playlists
    }

    /// Cached records for the given favorite IDs, in the same order
    async fn read_favorites(&self, ids: &[String]) -> Vec<TrackData> {
        let reads = ids.iter().map(|id| async move {
            let path = self.storage.track_data_path(id);
            match self.storage.read_record::<TrackData>(&path).await {
                Ok(Some(track)) => Some(track),
                Ok(None) => {
                    warn!("Favorite track {} is not cached", id);
                    None
                }
                Err(e) => {
                    warn!("Skipping favorite track {}: {:#}", id, e);
                    None
                }
            }
        });

        join_all(reads).await.into_iter().flatten().collect()
    }

    /// Turn offline mode on (mirror `session`) or off (wipe the mirror)
    ///
    /// Returns the run report when enabling.
    pub async fn set_offline_mode(
        &self,
        enabled: bool,
        session: &UserSession,
    ) -> Result<Option<SyncReport>> {
        if enabled {
            self.enable(session).await.map(Some)
        } else {
            self.disable().await.map(|_| None)
        }
    }

    /// Mirror the live session to disk
    ///
    /// Playlist files from earlier runs are removed first. Individual
    /// failures are logged and counted; the run always settles and closes
    /// its notification. Offline mode is only switched on when the root
    /// snapshot was written.
    pub async fn enable(&self, session: &UserSession) -> Result<SyncReport> {
        let _guard = self
            .operation
            .try_lock()
            .map_err(|_| OfflineError::AlreadyRunning)?;

        let user = session.user.as_ref().ok_or(OfflineError::NotLoggedIn)?;
        let plan = SyncPlan::from_session(user, session);
        info!("Started downloading offline data. ({} objects)", plan.total);

        self.storage.init().await?;
        let playlists_dir = self.storage.playlists_dir();
        self.storage.delete_path(&playlists_dir).await?;
        self.storage.create_dir(&playlists_dir).await?;

        self.progress.reset(plan.total);
        let mut state = NotificationState::start(plan.total);
        let handle = self.notifier.show(Notification::progress(
            "Downloading offline data...",
            NOTIFICATION_ICON,
            plan.total,
        ));

        let parallelism = self.config.system().download_parallelism.max(1);
        let work = stream::iter(plan.units)
            .map(|unit| async move {
                let is_snapshot = matches!(unit, Unit::Snapshot(_));
                (is_snapshot, self.run_unit(unit).await)
            })
            .buffer_unordered(parallelism)
            .collect::<Vec<(bool, bool)>>();
        tokio::pin!(work);

        let mut ticker = tokio::time::interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let outcomes = loop {
            tokio::select! {
                outcomes = &mut work => break outcomes,
                _ = ticker.tick() => {
                    state = state.advance(self.progress.completed());
                    self.notifier.update(handle, state);
                }
            }
        };
        let snapshot_saved = outcomes
            .iter()
            .any(|&(is_snapshot, saved)| is_snapshot && saved);

        let report = SyncReport::from(self.progress.snapshot());
        state = state.finish(report.completed);
        self.notifier.update(handle, state);
        self.notifier.dismiss(handle);
        self.progress.reset(0);

        if !snapshot_saved {
            error!("Offline user data was not saved; offline mode stays off");
            self.notifier.show(Notification::info(
                "Failed to save offline data.",
                NOTIFICATION_ICON,
            ));
            return Err(OfflineError::SnapshotNotSaved(report));
        }

        let message = if report.is_complete() {
            "Offline data downloaded.".to_string()
        } else {
            format!(
                "Offline data downloaded with {} of {} items missing.",
                report.total - report.completed,
                report.total
            )
        };
        self.notifier
            .show(Notification::info(message, NOTIFICATION_ICON));

        self.offline.store(true, Ordering::SeqCst);

        info!(
            "Finished offline download: {}/{} ({} failed)",
            report.completed, report.total, report.failed
        );
        Ok(report)
    }

    /// Execute one unit and account for it; true when it was saved
    async fn run_unit(&self, unit: Unit) -> bool {
        let weight = unit.weight();
        let result = match &unit {
            Unit::Snapshot(snapshot) => {
                self.storage
                    .write_record(snapshot, &self.storage.user_data_path())
                    .await
            }
            Unit::Playlist(playlist) => match playlist.id.as_deref() {
                Some(id) => {
                    self.storage
                        .write_record(playlist, &self.storage.playlist_path(id))
                        .await
                }
                None => Err(anyhow::anyhow!("playlist has no ID")),
            },
            Unit::Track { track, .. } => self.downloader.download_track(track, false).await,
        };

        match result {
            Ok(()) => {
                debug!("Saved {}", unit.describe());
                for _ in 0..weight {
                    self.progress.record_success();
                }
                true
            }
            Err(e) => {
                error!("Failed to save {}: {:#}", unit.describe(), e);
                for _ in 0..weight {
                    self.progress.record_failure();
                }
                false
            }
        }
    }

    /// Delete the snapshot and every playlist file, leaving an empty
    /// playlist directory
    ///
    /// Both deletions are attempted even if one fails.
    pub async fn disable(&self) -> Result<()> {
        let _guard = self
            .operation
            .try_lock()
            .map_err(|_| OfflineError::AlreadyRunning)?;

        let mut failures = Vec::new();

        if let Err(e) = self.storage.delete_path(&self.storage.user_data_path()).await {
            failures.push(format!("{:#}", e));
        }

        let playlists_dir = self.storage.playlists_dir();
        if let Err(e) = self.storage.delete_path(&playlists_dir).await {
            failures.push(format!("{:#}", e));
        }
        if let Err(e) = self.storage.create_dir(&playlists_dir).await {
            failures.push(format!("{:#}", e));
        }

        self.offline.store(false, Ordering::SeqCst);

        if failures.is_empty() {
            info!("Offline data removed.");
            Ok(())
        } else {
            Err(OfflineError::Cleanup(failures))
        }
    }
}
