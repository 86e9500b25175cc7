//! CLI command handlers

use anyhow::Result;
use clap_complete::generate;
use colored::Colorize;
use dialoguer::Confirm;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use super::{AuthManager, OfflineMode, PlaylistAction};
use laudiolin::backend::{LaudiolinClient, UserSession};
use laudiolin::offline::{
    CachingDownloader, ConsoleNotifier, LoadOutcome, OfflineStorage, OfflineSynchronizer,
};
use laudiolin::settings::SettingsStore;

/// Settings and paths shared by every command
pub struct AppContext {
    pub settings: SettingsStore,
    pub gateway: String,
    pub data_dir: PathBuf,
}

impl AppContext {
    pub fn new(gateway: Option<String>, data_dir: Option<PathBuf>) -> Result<Self> {
        let settings = SettingsStore::load()?;
        let gateway = gateway.unwrap_or_else(|| settings.settings.gateway.clone());
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => SettingsStore::default_data_dir()?,
        };

        Ok(Self {
            settings,
            gateway,
            data_dir,
        })
    }

    /// Client using the stored token, or none when logged out
    fn client(&self) -> Result<LaudiolinClient> {
        let token = AuthManager::load().unwrap_or_default();
        LaudiolinClient::new(&self.gateway, &token)
    }

    fn synchronizer(&self, client: LaudiolinClient) -> OfflineSynchronizer {
        let storage = OfflineStorage::new(self.data_dir.clone());
        let downloader = CachingDownloader::new(client, storage.clone());

        OfflineSynchronizer::new(
            storage,
            Arc::new(downloader),
            Arc::new(ConsoleNotifier::new()),
            Arc::new(self.settings.clone()),
        )
    }

    /// Log in against the backend with the stored token
    async fn remote_session(&self, client: &LaudiolinClient) -> Result<UserSession> {
        if !client.has_token() {
            anyhow::bail!("Not logged in. Run 'laudiolin login' first.");
        }

        let mut session = UserSession::new();
        session.login(client).await?;
        Ok(session)
    }
}

/// Handle the `login` command
pub async fn login(ctx: &AppContext, token: Option<String>) -> Result<()> {
    println!("{}", "Logging in to Laudiolin...".cyan());

    let user = AuthManager::authenticate(&ctx.gateway, token).await?;

    println!();
    println!("{}", "Login successful!".green().bold());
    println!("  User: {}", user.basic.tag());
    println!("  Gateway: {}", ctx.gateway);

    Ok(())
}

/// Handle the `logout` command
pub fn logout() -> Result<()> {
    if !AuthManager::exists() {
        println!("{}", "Not logged in.".yellow());
        return Ok(());
    }

    AuthManager::clear()?;
    println!("{}", "Logged out.".green());
    Ok(())
}

/// Handle the `offline` command
pub async fn offline(ctx: &mut AppContext, mode: OfflineMode, yes: bool) -> Result<()> {
    let client = ctx.client()?;

    match mode {
        OfflineMode::Enable => {
            let session = ctx.remote_session(&client).await?;
            let synchronizer = ctx.synchronizer(client);

            let report = synchronizer.enable(&session).await?;

            ctx.settings.settings.system.offline = true;
            ctx.settings.save()?;

            println!();
            if report.is_complete() {
                println!("{}", "Offline mode enabled!".green().bold());
            } else {
                println!(
                    "{}",
                    "Offline mode enabled with missing items.".yellow().bold()
                );
            }
            println!("  Saved: {}/{}", report.completed, report.total);
            if report.failed > 0 {
                println!("  Failed: {}", report.failed.to_string().red());
            }
            println!("  Location: {}", ctx.data_dir.display());
        }
        OfflineMode::Disable => {
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Delete all offline playlists and user data?")
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("{}", "Aborted.".yellow());
                    return Ok(());
                }
            }

            let synchronizer = ctx.synchronizer(client);
            synchronizer.disable().await?;

            ctx.settings.settings.system.offline = false;
            ctx.settings.save()?;

            println!("{}", "Offline mode disabled.".green().bold());
        }
    }

    Ok(())
}

/// Handle the `library` command
pub async fn library(ctx: &AppContext) -> Result<()> {
    let client = ctx.client()?;

    let offline = ctx.settings.settings.system.offline;
    let session = if offline {
        println!("{}", "Loading offline library...".cyan());
        let synchronizer = ctx.synchronizer(client.clone());

        let mut user = None;
        let mut playlists = Vec::new();
        let mut favorites = Vec::new();
        let outcome = synchronizer
            .load_state(
                |u| user = Some(u),
                |p| playlists = p,
                |f| favorites = f,
            )
            .await;

        if outcome == LoadOutcome::MissingSnapshot {
            println!(
                "{}",
                "No offline data found. Run 'laudiolin offline enable' again.".yellow()
            );
            return Ok(());
        }

        UserSession {
            user,
            playlists,
            favorites,
            recents: Vec::new(),
        }
    } else {
        println!("{}", "Connecting to Laudiolin...".cyan());
        ctx.remote_session(&client).await?
    };

    if let Some(user) = &session.user {
        println!("{}", user.basic.tag().green().bold());
    }

    println!("  Playlists: {}", session.playlists.len());
    for playlist in &session.playlists {
        if offline {
            println!("    - {} ({} tracks)", playlist.name, playlist.track_count());
        } else {
            let author = session.playlist_author(&client, playlist).await;
            println!(
                "    - {} by {} ({} tracks)",
                playlist.name,
                author,
                playlist.track_count()
            );
        }
    }

    println!("  Favorites: {}", session.favorites.len());
    for track in &session.favorites {
        println!("    - {} - {}", track.artist, track.title);
    }

    if !session.recents.is_empty() {
        println!("  Recently played: {}", session.recents.len());
    }

    Ok(())
}

/// Handle the `favorite` command
pub async fn favorite(ctx: &AppContext, track_id: &str, remove: bool) -> Result<()> {
    let client = ctx.client()?;
    let mut session = ctx.remote_session(&client).await?;

    let Some(track) = session
        .favorites
        .iter()
        .chain(session.recents.iter())
        .chain(session.playlists.iter().flat_map(|p| p.tracks.iter()))
        .find(|t| t.id == track_id)
        .cloned()
    else {
        anyhow::bail!("Track {} is not in your library or recently played", track_id);
    };

    session.favorite_track(&client, &track, !remove).await?;

    let verb = if remove { "Removed" } else { "Added" };
    println!(
        "{} {} - {} ({} favorites)",
        verb.green(),
        track.artist,
        track.title,
        session.favorites.len()
    );
    Ok(())
}

/// Handle the `playlist` command
pub async fn playlist(ctx: &AppContext, action: PlaylistAction) -> Result<()> {
    let client = ctx.client()?;
    let session = ctx.remote_session(&client).await?;

    match action {
        PlaylistAction::Create { name, description } => {
            let mut draft = session.make_playlist("", &name, "", &description, Vec::new());
            // The backend assigns the ID
            draft.id = None;

            let created = client.create_playlist(&draft).await?;
            println!(
                "{} {} ({})",
                "Created playlist".green(),
                created.name,
                created.id.as_deref().unwrap_or("no ID")
            );
        }
        PlaylistAction::Delete { playlist_id, yes } => {
            let name = session
                .playlists
                .iter()
                .find(|p| p.id.as_deref() == Some(playlist_id.as_str()))
                .map(|p| p.name.clone())
                .unwrap_or_else(|| playlist_id.clone());

            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete playlist {}?", name))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("{}", "Aborted.".yellow());
                    return Ok(());
                }
            }

            if client.delete_playlist(&playlist_id).await? {
                println!("{} {}", "Deleted playlist".green(), name);
            } else {
                anyhow::bail!("The backend refused to delete playlist {}", name);
            }
        }
    }

    if ctx.settings.settings.system.offline {
        println!(
            "{}",
            "Offline mode is on; run 'laudiolin offline enable' to refresh the mirror.".yellow()
        );
    }

    Ok(())
}

/// Handle the `social` command
pub async fn social(ctx: &AppContext, recent: bool, all: bool) -> Result<()> {
    let client = ctx.client()?;

    if recent {
        let users = client.get_recent_users().await;
        if users.is_empty() {
            println!("{}", "No recent listeners.".yellow());
        }
        for user in users {
            let seen = user
                .last_seen_at()
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "  {} - {} by {} (last seen {})",
                user.basic.tag().green(),
                user.last_listening_to.title,
                user.last_listening_to.artist,
                seen
            );
        }
    } else {
        let users = client.get_available_users(!all).await;
        if users.is_empty() {
            println!("{}", "Nobody is listening right now.".yellow());
        }
        for user in users {
            match &user.listening_to {
                Some(track) => println!(
                    "  {} - {} by {}",
                    user.basic.tag().green(),
                    track.title,
                    track.artist
                ),
                None => println!("  {} - idle", user.basic.tag().green()),
            }
        }
    }

    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = super::Cli::command();
    generate(shell, &mut cmd, "laudiolin", &mut io::stdout());
}

// Extension trait for Cli to get clap Command
impl super::Cli {
    fn command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }
}
