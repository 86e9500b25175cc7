//! laudiolin - Laudiolin music client with offline library mirroring

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::commands::AppContext;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "laudiolin=debug,reqwest=debug"
    } else {
        "laudiolin=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Commands::Completion { shell } = cli.command {
        cli::commands::completion(shell);
        return Ok(());
    }

    let mut ctx = AppContext::new(cli.gateway, cli.data_dir)?;

    match cli.command {
        Commands::Login { token } => {
            cli::commands::login(&ctx, token).await?;
        }
        Commands::Logout => {
            cli::commands::logout()?;
        }
        Commands::Offline { mode, yes } => {
            cli::commands::offline(&mut ctx, mode, yes).await?;
        }
        Commands::Library => {
            cli::commands::library(&ctx).await?;
        }
        Commands::Favorite { track_id, remove } => {
            cli::commands::favorite(&ctx, &track_id, remove).await?;
        }
        Commands::Playlist { action } => {
            cli::commands::playlist(&ctx, action).await?;
        }
        Commands::Social { recent, all } => {
            cli::commands::social(&ctx, recent, all).await?;
        }
        Commands::Completion { .. } => {}
    }

    Ok(())
}
