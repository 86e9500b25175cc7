//! Laudiolin backend data models

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A playable track as returned by search and stored in playlists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackData {
    pub title: String,
    pub artist: String,
    /// Artwork URL
    pub icon: String,
    /// Streamable audio URL
    pub url: String,
    pub id: String,
    /// Length in seconds
    pub duration: f64,
}

/// A user playlist
///
/// `id` is absent until the playlist has been created on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub tracks: Vec<TrackData>,
}

impl Playlist {
    /// Number of tracks in the playlist
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

/// Identity fields shared by every user representation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl BasicUser {
    /// Display tag in `username#discriminator` form
    pub fn tag(&self) -> String {
        format!(
            "{}#{}",
            self.username.as_deref().unwrap_or("Unknown"),
            self.discriminator.as_deref().unwrap_or("0000")
        )
    }
}

/// The logged-in user's profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub basic: BasicUser,
    /// Playlist IDs owned by the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlists: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked_songs: Option<Vec<TrackData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recently_played: Option<Vec<TrackData>>,
}

impl User {
    pub fn user_id(&self) -> Option<&str> {
        self.basic.user_id.as_deref()
    }
}

/// A user currently connected to the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    #[serde(flatten)]
    pub basic: BasicUser,
    #[serde(default)]
    pub listening_to: Option<TrackData>,
    /// Playback position in seconds
    #[serde(default)]
    pub progress: Option<f64>,
}

/// A user who listened recently but is no longer connected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineUser {
    #[serde(flatten)]
    pub basic: BasicUser,
    /// Unix timestamp in milliseconds
    pub last_seen: i64,
    pub last_listening_to: TrackData,
}

impl OfflineUser {
    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.last_seen).single()
    }
}

/// Root record of the on-disk offline snapshot
///
/// Playlists and favorites are referenced by ID only; their payloads live
/// in the per-playlist files and the per-track cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfflineUserData {
    pub user: User,
    pub playlists: Vec<String>,
    pub favorites: Vec<String>,
}

// Social endpoint envelopes
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableUsers {
    #[serde(default)]
    pub online_users: Vec<OnlineUser>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentUsers {
    #[serde(default)]
    pub recent_users: Vec<OfflineUser>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_flattens_basic_fields() {
        let json = r#"{
            "username": "magix",
            "discriminator": "0001",
            "userId": "42",
            "playlists": ["p1"],
            "likedSongs": []
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.user_id(), Some("42"));
        assert_eq!(user.basic.tag(), "magix#0001");
        assert_eq!(user.playlists, Some(vec!["p1".to_string()]));
        assert!(user.recently_played.is_none());
    }

    #[test]
    fn test_playlist_without_id_omits_field() {
        let playlist = Playlist {
            owner: None,
            id: None,
            name: "Drafts".to_string(),
            description: String::new(),
            icon: String::new(),
            is_private: true,
            tracks: vec![],
        };
        let json = serde_json::to_value(&playlist).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["isPrivate"], true);
    }

    #[test]
    fn test_offline_user_last_seen() {
        let json = r#"{
            "username": "a",
            "lastSeen": 1700000000000,
            "lastListeningTo": {
                "title": "t", "artist": "a", "icon": "", "url": "", "id": "x", "duration": 1
            }
        }"#;
        let user: OfflineUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.last_seen_at().unwrap().timestamp(), 1_700_000_000);
    }
}
