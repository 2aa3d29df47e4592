//! CLI command implementations.
//!
//! Each command authenticates its own client session, makes a handful of
//! remote calls, prints/logs results, and tears the session down
//! unconditionally. Dry runs never connect.

pub mod admin_log;
pub mod ads;
pub mod boost;
pub mod leaderboard;
pub mod moderation;
pub mod posts;
pub mod reminder;
pub mod stories;

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use tracing::info;

use crate::config::Settings;
use crate::telegram::{ChannelClient, TelegramError};

/// Connects the user session, running the interactive login flow when the
/// stored session is not yet authorized.
pub(crate) async fn connect_user(settings: &Settings) -> Result<ChannelClient> {
    let client = ChannelClient::connect(settings.api_id, &settings.session_path)
        .await
        .context("Failed to connect to Telegram")?;

    let authorized = match client.is_authorized().await {
        Ok(authorized) => authorized,
        Err(e) => {
            client.disconnect();
            return Err(e).context("Failed to check authorization");
        }
    };

    if !authorized
        && let Err(e) = authenticate(&client, settings).await
    {
        client.disconnect();
        return Err(e);
    }

    Ok(client)
}

/// Connects a separate bot-token session (used for bot-posting mode).
pub(crate) async fn connect_bot(settings: &Settings, token: &str) -> Result<ChannelClient> {
    let client = ChannelClient::connect(settings.api_id, &settings.bot_session_path())
        .await
        .context("Failed to connect to Telegram")?;

    let sign_in = async {
        if !client.is_authorized().await? {
            client
                .sign_in_bot(settings.api_id, &settings.api_hash, token)
                .await?;
        }
        Ok::<(), TelegramError>(())
    };

    if let Err(e) = sign_in.await {
        client.disconnect();
        return Err(e).context("Bot sign in failed");
    }

    Ok(client)
}

/// Handles the interactive phone-code (+ optional 2FA) login flow.
async fn authenticate(client: &ChannelClient, settings: &Settings) -> Result<()> {
    info!("Authentication required");

    let token = client
        .request_login_code(&settings.phone, &settings.api_hash)
        .await
        .context("Failed to request login code")?;

    info!("Login code sent to your Telegram app");

    let code: String = Input::new()
        .with_prompt("Enter the login code")
        .interact_text()?;

    match client.sign_in(&token, &code).await {
        Ok(()) => {
            info!("Successfully signed in!");
            Ok(())
        }
        Err(TelegramError::PasswordRequired(password_token)) => {
            info!("Two-factor authentication is enabled");

            let hint = password_token.hint().unwrap_or("no hint");
            info!("Password hint: {}", hint);

            let password: String = Password::new()
                .with_prompt("Enter your 2FA password")
                .interact()?;

            client
                .check_password(password_token, &password)
                .await
                .context("2FA authentication failed")?;

            info!("Successfully signed in with 2FA!");
            Ok(())
        }
        Err(e) => Err(e).context("Authentication failed"),
    }
}
