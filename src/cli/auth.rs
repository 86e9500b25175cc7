//! Keyring-based storage for the Laudiolin authorization token

use anyhow::{Context, Result};
use dialoguer::Password;
use keyring::Entry;
use tracing::{debug, info};

use laudiolin::backend::{LaudiolinClient, User};

const KEYRING_SERVICE: &str = "laudiolin";
const TOKEN_KEY: &str = "user_token";

/// Manages the stored authorization token
pub struct AuthManager;

impl AuthManager {
    /// Verify a token against the backend and store it
    ///
    /// Prompts for the token when none is given.
    pub async fn authenticate(gateway: &str, token: Option<String>) -> Result<User> {
        let token = match token {
            Some(token) => token,
            None => {
                let client = LaudiolinClient::new(gateway, "")?;
                println!("Log in at {} and paste the token below.", client.login_url());
                Password::new()
                    .with_prompt("Token")
                    .interact()
                    .context("Failed to read token")?
            }
        };
        let token = token.trim().to_string();

        let user = Self::verify(gateway, &token).await?;
        Self::store(&token)?;
        info!("Token stored in keyring");

        Ok(user)
    }

    /// Load the token from the keyring
    pub fn load() -> Result<String> {
        Self::entry()?
            .get_password()
            .context("No Laudiolin token in keyring")
    }

    /// Store the token in the keyring
    pub fn store(token: &str) -> Result<()> {
        Self::entry()?
            .set_password(token)
            .context("Failed to store token in keyring")?;
        debug!("Token stored in keyring");
        Ok(())
    }

    /// Remove the stored token
    pub fn clear() -> Result<()> {
        let _ = Self::entry()?.delete_credential();
        info!("Token cleared from keyring");
        Ok(())
    }

    /// Check if a token is stored
    pub fn exists() -> bool {
        Self::load().is_ok()
    }

    async fn verify(gateway: &str, token: &str) -> Result<User> {
        debug!("Verifying token against {}", gateway);

        let client = LaudiolinClient::new(gateway, token)?;
        let user = client.get_user().await.context("Failed to verify token")?;

        info!("Token verified successfully");
        Ok(user)
    }

    fn entry() -> Result<Entry> {
        Entry::new(KEYRING_SERVICE, TOKEN_KEY).context("Failed to access keyring")
    }
}
