//! Per-track asset caching

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::storage::OfflineStorage;
use crate::backend::{LaudiolinClient, TrackData};

/// Fetches and stores the media behind a track
///
/// Each call stands alone: one track failing says nothing about the others.
#[async_trait]
pub trait TrackDownloader: Send + Sync {
    /// `background` marks downloads the user did not explicitly ask for
    async fn download_track(&self, track: &TrackData, background: bool) -> Result<()>;
}

/// Downloads audio and artwork into the offline track cache
pub struct CachingDownloader {
    client: Arc<LaudiolinClient>,
    storage: OfflineStorage,
}

impl CachingDownloader {
    pub fn new(client: LaudiolinClient, storage: OfflineStorage) -> Self {
        Self {
            client: Arc::new(client),
            storage,
        }
    }

    /// A track is cached once both its record and its audio are on disk
    pub async fn is_cached(&self, track_id: &str) -> bool {
        self.storage
            .exists(&self.storage.track_data_path(track_id))
            .await
            && self
                .storage
                .exists(&self.storage.track_audio_path(track_id))
                .await
    }
}

#[async_trait]
impl TrackDownloader for CachingDownloader {
    async fn download_track(&self, track: &TrackData, background: bool) -> Result<()> {
        if self.is_cached(&track.id).await {
            debug!("Track already cached: {}", track.id);
            return Ok(());
        }

        if background {
            debug!("Downloading: {} - {}", track.artist, track.title);
        } else {
            info!("Downloading: {} - {}", track.artist, track.title);
        }

        let audio = self.client.fetch_bytes(&track.url).await?;
        self.storage
            .write_bytes(&self.storage.track_audio_path(&track.id), &audio)
            .await?;

        if !track.icon.is_empty() {
            match self.client.fetch_bytes(&track.icon).await {
                Ok(icon) => {
                    self.storage
                        .write_bytes(&self.storage.track_icon_path(&track.id), &icon)
                        .await?;
                }
                Err(e) => warn!("Failed to download artwork for {}: {:#}", track.id, e),
            }
        }

        // The record goes last so its presence implies the audio is there
        self.storage
            .write_record(track, &self.storage.track_data_path(&track.id))
            .await?;

        Ok(())
    }
}
