//! On-disk record storage for the offline mirror
//!
//! Layout under the data root:
//!
//! ```text
//! userData.json            OfflineUserData snapshot
//! playlists/<id>.json      one file per playlist
//! tracks/<id>/track.json   cached TrackData
//! tracks/<id>/audio        cached audio bytes
//! tracks/<id>/icon         cached artwork bytes
//! ```

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::utils::id_to_filename;

const USER_DATA_FILE: &str = "userData.json";
const PLAYLISTS_DIR: &str = "playlists";
const TRACKS_DIR: &str = "tracks";

/// File-backed record store rooted at the app's data directory
#[derive(Debug, Clone)]
pub struct OfflineStorage {
    root: PathBuf,
}

impl OfflineStorage {
    /// Create a storage manager rooted at `root`
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the root snapshot
    pub fn user_data_path(&self) -> PathBuf {
        self.root.join(USER_DATA_FILE)
    }

    pub fn playlists_dir(&self) -> PathBuf {
        self.root.join(PLAYLISTS_DIR)
    }

    /// Per-playlist file, keyed by the playlist's ID
    pub fn playlist_path(&self, playlist_id: &str) -> PathBuf {
        self.playlists_dir()
            .join(format!("{}.json", id_to_filename(playlist_id)))
    }

    pub fn tracks_dir(&self) -> PathBuf {
        self.root.join(TRACKS_DIR)
    }

    pub fn track_dir(&self, track_id: &str) -> PathBuf {
        self.tracks_dir().join(id_to_filename(track_id))
    }

    pub fn track_data_path(&self, track_id: &str) -> PathBuf {
        self.track_dir(track_id).join("track.json")
    }

    pub fn track_audio_path(&self, track_id: &str) -> PathBuf {
        self.track_dir(track_id).join("audio")
    }

    pub fn track_icon_path(&self, track_id: &str) -> PathBuf {
        self.track_dir(track_id).join("icon")
    }

    /// Create the base directory structure
    pub async fn init(&self) -> Result<()> {
        self.create_dir(&self.playlists_dir()).await?;
        self.create_dir(&self.tracks_dir()).await?;

        debug!("Initialized offline storage at {}", self.root.display());
        Ok(())
    }

    /// Read and decode a JSON record; `None` when the file does not exist
    pub async fn read_record<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        let content = match fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No record at {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        let record = serde_json::from_slice(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(record))
    }

    /// Encode a record as JSON and write it, creating parent directories
    pub async fn write_record<T: Serialize + ?Sized>(&self, record: &T, path: &Path) -> Result<()> {
        let content = serde_json::to_vec(record)
            .with_context(|| format!("Failed to serialize record for {}", path.display()))?;
        self.write_bytes(path, &content).await
    }

    /// Write raw bytes, creating parent directories
    pub async fn write_bytes(&self, path: &Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.create_dir(parent).await?;
        }

        fs::write(path, data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!("Wrote {} ({} bytes)", path.display(), data.len());
        Ok(())
    }

    /// File names in a directory, sorted; a missing directory is empty
    pub async fn list_dir(&self, path: &Path) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to list {}", path.display()));
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("Failed to list {}", path.display()))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if is_file {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Delete a file or a whole directory tree; missing paths are fine
    pub async fn delete_path(&self, path: &Path) -> Result<()> {
        let metadata = match fs::symlink_metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to inspect {}", path.display()));
            }
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };

        match result {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }

    pub async fn create_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .with_context(|| format!("Failed to create directory {}", path.display()))
    }

    pub async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::models::OfflineUserData;

    fn storage() -> (tempfile::TempDir, OfflineStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = OfflineStorage::new(dir.path().to_path_buf());
        (dir, storage)
    }

    #[test]
    fn test_layout() {
        let storage = OfflineStorage::new(PathBuf::from("/data"));
        assert_eq!(storage.user_data_path(), PathBuf::from("/data/userData.json"));
        assert_eq!(storage.playlist_path("p1"), PathBuf::from("/data/playlists/p1.json"));
        assert_eq!(
            storage.track_data_path("a/b"),
            PathBuf::from("/data/tracks/a%2Fb/track.json")
        );
        assert_eq!(storage.playlist_path(".."), PathBuf::from("/data/playlists/%2E%2E.json"));
    }

    #[test]
    fn test_lookalike_ids_do_not_share_files() {
        let storage = OfflineStorage::new(PathBuf::from("/data"));
        assert_ne!(storage.playlist_path("p1"), storage.playlist_path(" p1"));
        assert_ne!(storage.track_dir("a/b"), storage.track_dir("a⧸b"));
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let (_dir, storage) = storage();
        let record: Option<OfflineUserData> =
            storage.read_record(&storage.user_data_path()).await.unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read_record() {
        let (_dir, storage) = storage();
        let data = OfflineUserData {
            playlists: vec!["p1".into()],
            ..Default::default()
        };
        let path = storage.playlists_dir().join("nested").join("x.json");
        storage.write_record(&data, &path).await.unwrap();

        let read: OfflineUserData = storage.read_record(&path).await.unwrap().unwrap();
        assert_eq!(read, data);
    }

    #[tokio::test]
    async fn test_malformed_record_is_error() {
        let (_dir, storage) = storage();
        let path = storage.user_data_path();
        storage.write_bytes(&path, b"{not json").await.unwrap();
        let result: Result<Option<OfflineUserData>> = storage.read_record(&path).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_dir_sorted_files_only() {
        let (_dir, storage) = storage();
        let dir = storage.playlists_dir();
        storage.write_bytes(&dir.join("b.json"), b"{}").await.unwrap();
        storage.write_bytes(&dir.join("a.json"), b"{}").await.unwrap();
        storage.create_dir(&dir.join("sub")).await.unwrap();

        assert_eq!(storage.list_dir(&dir).await.unwrap(), vec!["a.json", "b.json"]);
        assert!(storage.list_dir(&storage.root().join("missing")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, storage) = storage();
        let dir = storage.playlists_dir();
        storage.write_bytes(&dir.join("p.json"), b"{}").await.unwrap();

        storage.delete_path(&dir).await.unwrap();
        assert!(!storage.exists(&dir).await);
        storage.delete_path(&dir).await.unwrap();
        storage.delete_path(&storage.user_data_path()).await.unwrap();
    }
}
