//! Live in-memory user model

use anyhow::{Context, Result};
use std::collections::HashSet;
use tracing::{error, info};

use super::client::LaudiolinClient;
use super::models::{Playlist, TrackData, User};

/// The logged-in user's library as currently held in memory
#[derive(Debug, Clone, Default)]
pub struct UserSession {
    pub user: Option<User>,
    pub playlists: Vec<Playlist>,
    pub favorites: Vec<TrackData>,
    pub recents: Vec<TrackData>,
}

impl UserSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the user and their library from the backend
    ///
    /// A failed user lookup clears the session before returning the error.
    pub async fn login(&mut self, client: &LaudiolinClient) -> Result<()> {
        if !client.has_token() {
            anyhow::bail!("No authorization token available");
        }

        let user = match client.get_user().await {
            Ok(user) => user,
            Err(e) => {
                self.logout();
                return Err(e).context("Login failed");
            }
        };
        info!("User data has been loaded.");
        self.user = Some(user);

        self.load_recents();
        self.load_playlists(client).await?;
        self.load_favorites();

        Ok(())
    }

    /// Forget everything about the current user
    pub fn logout(&mut self) {
        *self = Self::default();
    }

    /// Current user's ID, or an empty string when logged out
    pub fn user_id(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|u| u.user_id())
            .unwrap_or("")
    }

    /// Fetch every playlist the user owns, dropping duplicate IDs
    ///
    /// Stops at the first playlist the backend refuses to serve.
    pub async fn load_playlists(&mut self, client: &LaudiolinClient) -> Result<()> {
        let Some(ids) = self.user.as_ref().and_then(|u| u.playlists.clone()) else {
            return Ok(());
        };

        self.playlists.clear();
        for id in &ids {
            match client.get_playlist(id).await {
                Ok(playlist) => self.playlists.push(playlist),
                Err(e) => {
                    error!("{:#}", e);
                    break;
                }
            }
        }

        dedup_playlists(&mut self.playlists);
        info!("Loaded {} playlists.", self.playlists.len());
        Ok(())
    }

    pub fn load_favorites(&mut self) {
        if let Some(liked) = self.user.as_ref().and_then(|u| u.liked_songs.clone()) {
            self.favorites = liked;
            info!("Loaded {} favorite tracks.", self.favorites.len());
        }
    }

    pub fn load_recents(&mut self) {
        if let Some(recent) = self.user.as_ref().and_then(|u| u.recently_played.clone()) {
            self.recents = recent;
            info!("Loaded {} recent tracks.", self.recents.len());
        }
    }

    /// Add or remove a favorite; the server's list replaces the local one
    pub async fn favorite_track(
        &mut self,
        client: &LaudiolinClient,
        track: &TrackData,
        add: bool,
    ) -> Result<()> {
        self.favorites = client.favorite_track(track, add).await?;
        Ok(())
    }

    /// Build a local playlist owned by the current user
    pub fn make_playlist(
        &self,
        id: &str,
        name: &str,
        icon: &str,
        description: &str,
        tracks: Vec<TrackData>,
    ) -> Playlist {
        Playlist {
            owner: Some(self.user_id().to_string()),
            id: Some(id.to_string()),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            is_private: false,
            tracks,
        }
    }

    /// Display name of a playlist's owner
    pub async fn playlist_author(&self, client: &LaudiolinClient, playlist: &Playlist) -> String {
        let owner = playlist.owner.as_deref().unwrap_or("");
        if owner.is_empty() {
            return "Unknown".to_string();
        }

        if let Some(user) = self.user.as_ref().filter(|u| u.user_id() == Some(owner)) {
            return user.basic.tag();
        }

        match client.get_user_by_id(owner).await {
            Ok(user) => user.basic.tag(),
            Err(e) => {
                error!("{:#}", e);
                "Unknown".to_string()
            }
        }
    }

    // Setters fed by the offline loader
    pub fn apply_offline_user(&mut self, user: User) {
        self.user = Some(user);
    }

    pub fn apply_offline_playlists(&mut self, playlists: Vec<Playlist>) {
        self.playlists = playlists;
    }

    pub fn apply_offline_favorites(&mut self, favorites: Vec<TrackData>) {
        self.favorites = favorites;
    }
}

/// Remove playlists whose ID was already seen, keeping the first occurrence
///
/// Playlists without an ID are never considered duplicates.
pub fn dedup_playlists(playlists: &mut Vec<Playlist>) {
    let mut seen = HashSet::new();
    playlists.retain(|p| match &p.id {
        Some(id) => seen.insert(id.clone()),
        None => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::models::BasicUser;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Nothing listens here, so every request fails
    fn unreachable_client() -> LaudiolinClient {
        LaudiolinClient::new("http://127.0.0.1:9", "token").unwrap()
    }

    fn user(id: &str, name: &str) -> User {
        User {
            basic: BasicUser {
                username: Some(name.to_string()),
                discriminator: Some("0001".to_string()),
                user_id: Some(id.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn owned_by(owner: Option<&str>) -> Playlist {
        let mut p = playlist(Some("p1"), "Mix");
        p.owner = owner.map(String::from);
        p
    }

    fn playlist(id: Option<&str>, name: &str) -> Playlist {
        Playlist {
            owner: None,
            id: id.map(String::from),
            name: name.to_string(),
            description: String::new(),
            icon: String::new(),
            is_private: false,
            tracks: vec![],
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let mut playlists = vec![
            playlist(Some("p1"), "first"),
            playlist(Some("p2"), "other"),
            playlist(Some("p1"), "second"),
            playlist(None, "draft"),
            playlist(None, "draft"),
        ];
        dedup_playlists(&mut playlists);
        let names: Vec<_> = playlists.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["first", "other", "draft", "draft"]);
    }

    #[test]
    fn test_make_playlist_owned_by_current_user() {
        let mut session = UserSession::new();
        session.apply_offline_user(User {
            basic: BasicUser {
                user_id: Some("u1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        });
        let p = session.make_playlist("p9", "Mix", "", "", vec![]);
        assert_eq!(p.owner.as_deref(), Some("u1"));
        assert_eq!(p.id.as_deref(), Some("p9"));
    }

    #[test]
    fn test_logout_clears_everything() {
        let mut session = UserSession::new();
        session.apply_offline_user(User::default());
        session.apply_offline_playlists(vec![playlist(Some("p1"), "a")]);
        session.logout();
        assert!(session.user.is_none());
        assert!(session.playlists.is_empty());
        assert_eq!(session.user_id(), "");
    }

    #[test]
    fn test_load_favorites_from_user() {
        let mut session = UserSession::new();
        let track = TrackData {
            title: "t".into(),
            artist: "a".into(),
            icon: String::new(),
            url: String::new(),
            id: "t1".into(),
            duration: 100.0,
        };
        session.apply_offline_user(User {
            liked_songs: Some(vec![track.clone()]),
            ..Default::default()
        });
        session.load_favorites();
        assert_eq!(session.favorites, vec![track]);
    }

    #[tokio::test]
    async fn test_author_without_owner_is_unknown() {
        let session = UserSession::new();
        let client = unreachable_client();
        assert_eq!(session.playlist_author(&client, &owned_by(None)).await, "Unknown");
        assert_eq!(session.playlist_author(&client, &owned_by(Some(""))).await, "Unknown");
    }

    #[tokio::test]
    async fn test_author_of_own_playlist_needs_no_lookup() {
        let mut session = UserSession::new();
        session.apply_offline_user(user("u1", "listener"));
        let author = session
            .playlist_author(&unreachable_client(), &owned_by(Some("u1")))
            .await;
        assert_eq!(author, "listener#0001");
    }

    #[tokio::test]
    async fn test_author_looked_up_for_other_owner() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/u2"))
            .respond_with(ResponseTemplate::new(301).set_body_json(user("u2", "friend")))
            .mount(&server)
            .await;
        let client = LaudiolinClient::new(&server.uri(), "token").unwrap();

        let mut session = UserSession::new();
        session.apply_offline_user(user("u1", "listener"));
        let author = session.playlist_author(&client, &owned_by(Some("u2"))).await;
        assert_eq!(author, "friend#0001");
    }

    #[tokio::test]
    async fn test_author_falls_back_when_lookup_fails() {
        let mut session = UserSession::new();
        session.apply_offline_user(user("u1", "listener"));
        let author = session
            .playlist_author(&unreachable_client(), &owned_by(Some("u2")))
            .await;
        assert_eq!(author, "Unknown");
    }

    #[tokio::test]
    async fn test_favorite_track_replaces_local_list() {
        let server = MockServer::start().await;
        let track = TrackData {
            title: "t".into(),
            artist: "a".into(),
            icon: String::new(),
            url: String::new(),
            id: "t2".into(),
            duration: 90.0,
        };
        Mock::given(method("POST"))
            .and(path("/user/favorite"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![track.clone()]))
            .mount(&server)
            .await;
        let client = LaudiolinClient::new(&server.uri(), "token").unwrap();

        let mut session = UserSession::new();
        session.favorite_track(&client, &track, true).await.unwrap();
        assert_eq!(session.favorites, vec![track]);
    }
}
