//! CLI module for laudiolin

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod auth;
pub mod commands;

pub use auth::AuthManager;

#[derive(Parser, Debug)]
#[command(name = "laudiolin", about = "Laudiolin music client with offline library mirroring")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Backend gateway URL (defaults to the one in settings)
    #[arg(long, global = true, env = "LAUDIOLIN_GATEWAY")]
    pub gateway: Option<String>,

    /// Directory holding the offline mirror
    #[arg(long, global = true, env = "LAUDIOLIN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store an authorization token
    Login {
        /// Token from the Discord login page (prompted if omitted)
        #[arg(long, env = "LAUDIOLIN_TOKEN")]
        token: Option<String>,
    },

    /// Forget the stored token
    Logout,

    /// Turn offline mode on or off
    Offline {
        #[arg(value_enum)]
        mode: OfflineMode,

        /// Skip the confirmation before deleting offline data
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the user's library (from disk when offline mode is on)
    Library,

    /// Add or remove a favorite track
    Favorite {
        /// ID of a track from the user's library or recently played
        track_id: String,

        /// Remove the track from favorites instead of adding it
        #[arg(long)]
        remove: bool,
    },

    /// Create or delete playlists
    Playlist {
        #[command(subcommand)]
        action: PlaylistAction,
    },

    /// List users listening on Laudiolin
    Social {
        /// Show recently active users instead of online ones
        #[arg(long)]
        recent: bool,

        /// Include online users who are not playing anything
        #[arg(long, conflicts_with = "recent")]
        all: bool,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlaylistAction {
    /// Create an empty playlist
    Create {
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Delete a playlist by ID
    Delete {
        playlist_id: String,

        /// Skip the confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OfflineMode {
    Enable,
    Disable,
}
