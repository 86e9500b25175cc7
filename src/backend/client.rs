//! Laudiolin backend HTTP client

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use super::models::*;

/// Status the backend answers successful user and playlist lookups with
const LOOKUP_OK: StatusCode = StatusCode::MOVED_PERMANENTLY;

/// HTTP client for the Laudiolin gateway
#[derive(Clone)]
pub struct LaudiolinClient {
    base_url: Url,
    token: String,
    http_client: Client,
}

impl LaudiolinClient {
    /// Create a new client for the given gateway and authorization token
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .with_context(|| format!("Invalid gateway URL: {}", base_url))?;

        let http_client = Client::builder()
            .user_agent(concat!("laudiolin/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url,
            token: token.to_string(),
            http_client,
        })
    }

    /// Build an absolute endpoint URL
    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid endpoint path: {}", path))
    }

    /// URL the user opens to log in with Discord
    pub fn login_url(&self) -> String {
        format!("{}discord", self.base_url)
    }

    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// Lookups succeed with 301 on this backend; plain 2xx is accepted too
    fn is_lookup_ok(status: StatusCode) -> bool {
        status == LOOKUP_OK || status.is_success()
    }

    async fn get_authorized(&self, url: Url) -> Result<Response> {
        debug!("GET {}", url);
        self.http_client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, &self.token)
            .send()
            .await
            .context("Failed to reach the Laudiolin backend")
    }

    /// Fetch the user the token belongs to
    pub async fn get_user(&self) -> Result<User> {
        let response = self.get_authorized(self.endpoint("user")?).await?;

        if !Self::is_lookup_ok(response.status()) {
            anyhow::bail!(
                "Failed to get user data from the backend. Status code: {}",
                response.status().as_u16()
            );
        }

        response.json().await.context("Failed to parse user response")
    }

    /// Fetch another user's public profile
    pub async fn get_user_by_id(&self, user_id: &str) -> Result<User> {
        let path = format!("user/{}", urlencoding::encode(user_id));
        let response = self.get_authorized(self.endpoint(&path)?).await?;

        if !Self::is_lookup_ok(response.status()) {
            anyhow::bail!(
                "Failed to get user {} from the backend. Status code: {}",
                user_id,
                response.status().as_u16()
            );
        }

        response.json().await.context("Failed to parse user response")
    }

    /// Fetch a playlist with its tracks
    pub async fn get_playlist(&self, playlist_id: &str) -> Result<Playlist> {
        let path = format!("playlist/{}", urlencoding::encode(playlist_id));
        let response = self.get_authorized(self.endpoint(&path)?).await?;

        if !Self::is_lookup_ok(response.status()) {
            anyhow::bail!(
                "Failed to get playlist data from the backend. Status code: {}",
                response.status().as_u16()
            );
        }

        response
            .json()
            .await
            .context("Failed to parse playlist response")
    }

    /// Add or remove a favorite track, returning the updated favorites
    pub async fn favorite_track(&self, track: &TrackData, add: bool) -> Result<Vec<TrackData>> {
        let url = self.endpoint("user/favorite")?;
        let operation = if add { "add" } else { "remove" };
        debug!("POST {} ({})", url, operation);

        let response = self
            .http_client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, &self.token)
            .header("Operation", operation)
            .json(track)
            .send()
            .await
            .context("Failed to reach the Laudiolin backend")?;

        if response.status() != StatusCode::OK {
            anyhow::bail!(
                "Failed to {} favorite track. Status code: {}",
                operation,
                response.status().as_u16()
            );
        }

        response
            .json()
            .await
            .context("Failed to parse favorites response")
    }

    /// Create a playlist on the backend; the returned copy carries its ID
    pub async fn create_playlist(&self, playlist: &Playlist) -> Result<Playlist> {
        let url = self.endpoint("playlist/create")?;
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, &self.token)
            .json(playlist)
            .send()
            .await
            .context("Failed to reach the Laudiolin backend")?;

        if response.status() != StatusCode::CREATED {
            anyhow::bail!(
                "Failed to create playlist. Status code: {}",
                response.status().as_u16()
            );
        }

        response
            .json()
            .await
            .context("Failed to parse created playlist")
    }

    /// Delete a playlist; returns whether the backend accepted it
    pub async fn delete_playlist(&self, playlist_id: &str) -> Result<bool> {
        let path = format!("playlist/{}", urlencoding::encode(playlist_id));
        let url = self.endpoint(&path)?;
        debug!("DELETE {}", url);

        let response = self
            .http_client
            .delete(url)
            .header(reqwest::header::AUTHORIZATION, &self.token)
            .send()
            .await
            .context("Failed to reach the Laudiolin backend")?;

        Ok(response.status() == StatusCode::OK)
    }

    /// Users currently listening on Laudiolin
    ///
    /// Errors are logged and yield an empty list.
    pub async fn get_available_users(&self, active: bool) -> Vec<OnlineUser> {
        let result: Result<AvailableUsers> = async {
            let mut url = self.endpoint("social/available")?;
            url.query_pairs_mut()
                .append_pair("active", if active { "true" } else { "false" });
            let response = self.get_authorized(url).await?;
            if !response.status().is_success() {
                anyhow::bail!("{}", response.status());
            }
            Ok(response.json().await?)
        }
        .await;

        match result {
            Ok(users) => users.online_users,
            Err(e) => {
                error!("Failed to get available users: {:#}", e);
                Vec::new()
            }
        }
    }

    /// Users who listened recently but are offline now
    ///
    /// Errors are logged and yield an empty list.
    pub async fn get_recent_users(&self) -> Vec<OfflineUser> {
        let result: Result<RecentUsers> = async {
            let response = self.get_authorized(self.endpoint("social/recent")?).await?;
            if !response.status().is_success() {
                anyhow::bail!("{}", response.status());
            }
            Ok(response.json().await?)
        }
        .await;

        match result {
            Ok(users) => users.recent_users,
            Err(e) => {
                error!("Failed to get recent users: {:#}", e);
                Vec::new()
            }
        }
    }

    /// Download a media asset (audio or artwork) as bytes
    pub async fn fetch_bytes(&self, url: &str) -> Result<bytes::Bytes> {
        debug!("Fetching asset: {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Asset not available (status {})", response.status());
        }

        response
            .bytes()
            .await
            .context("Failed to read asset response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn track(id: &str) -> TrackData {
        TrackData {
            title: format!("Track {}", id),
            artist: "Artist".to_string(),
            icon: String::new(),
            url: String::new(),
            id: id.to_string(),
            duration: 120.0,
        }
    }

    fn draft(name: &str) -> Playlist {
        Playlist {
            owner: Some("u1".to_string()),
            id: None,
            name: name.to_string(),
            description: String::new(),
            icon: String::new(),
            is_private: false,
            tracks: vec![],
        }
    }

    #[test]
    fn test_endpoint_joins_base_with_trailing_slash() {
        let client = LaudiolinClient::new("https://example.com/api/", "token").unwrap();
        assert_eq!(
            client.endpoint("user").unwrap().as_str(),
            "https://example.com/api/user"
        );
        assert_eq!(client.login_url(), "https://example.com/api/discord");
    }

    #[test]
    fn test_invalid_gateway_rejected() {
        assert!(LaudiolinClient::new("not a url", "").is_err());
    }

    #[test]
    fn test_lookup_status_codes() {
        assert!(LaudiolinClient::is_lookup_ok(StatusCode::MOVED_PERMANENTLY));
        assert!(LaudiolinClient::is_lookup_ok(StatusCode::OK));
        assert!(!LaudiolinClient::is_lookup_ok(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_get_user_accepts_moved_permanently() {
        let server = MockServer::start().await;
        let user = User {
            basic: BasicUser {
                username: Some("listener".to_string()),
                user_id: Some("u1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", "token"))
            .respond_with(ResponseTemplate::new(301).set_body_json(&user))
            .mount(&server)
            .await;

        let client = LaudiolinClient::new(&server.uri(), "token").unwrap();
        assert_eq!(client.get_user().await.unwrap(), user);
    }

    #[tokio::test]
    async fn test_create_playlist_requires_created() {
        let server = MockServer::start().await;
        let mut created = draft("Mix");
        created.id = Some("p7".to_string());
        Mock::given(method("POST"))
            .and(path("/playlist/create"))
            .respond_with(ResponseTemplate::new(201).set_body_json(&created))
            .mount(&server)
            .await;

        let client = LaudiolinClient::new(&server.uri(), "token").unwrap();
        let playlist = client.create_playlist(&draft("Mix")).await.unwrap();
        assert_eq!(playlist.id.as_deref(), Some("p7"));
    }

    #[tokio::test]
    async fn test_create_playlist_rejects_plain_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/playlist/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(draft("Mix")))
            .mount(&server)
            .await;

        let client = LaudiolinClient::new(&server.uri(), "token").unwrap();
        let err = client.create_playlist(&draft("Mix")).await.unwrap_err();
        assert!(err.to_string().contains("200"));
    }

    #[tokio::test]
    async fn test_delete_playlist_status() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/playlist/p1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/playlist/p2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = LaudiolinClient::new(&server.uri(), "token").unwrap();
        assert!(client.delete_playlist("p1").await.unwrap());
        assert!(!client.delete_playlist("p2").await.unwrap());
    }

    #[tokio::test]
    async fn test_favorite_track_sends_operation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/favorite"))
            .and(header("Operation", "add"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![track("t1")]))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/user/favorite"))
            .and(header("Operation", "remove"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = LaudiolinClient::new(&server.uri(), "token").unwrap();
        let favorites = client.favorite_track(&track("t1"), true).await.unwrap();
        assert_eq!(favorites, vec![track("t1")]);
        assert!(client.favorite_track(&track("t1"), false).await.is_err());
    }
}
