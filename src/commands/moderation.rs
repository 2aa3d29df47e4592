//! Moderation guard command.
//!
//! Three independent checks run in a fixed order, each toggled by data
//! availability and each non-fatal: external bot config drift, welcome
//! pin presence, and message rate. Every check yields a compliance flag
//! that is reported but never aborts the later checks.

use std::fs;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use chrono::TimeDelta;
use grammers_client::types::Chat;
use grammers_session::{PackedChat, PackedType};
use tracing::{info, warn};

use crate::config::Settings;
use crate::telegram::{ChannelClient, packed_user};

use super::admin_log::external_chat_id;

/// Messages per minute above which slow mode engages.
const MAX_MESSAGES_PER_MINUTE: usize = 30;

/// Slow-mode delay applied when the rate threshold is exceeded.
const SLOW_MODE_SECS: i32 = 10;

/// Marker that identifies the pinned welcome message.
const WELCOME_MARKER: &str = "👋 Welcome";

/// Live configuration of the external moderation bot. Abstract seam for
/// its command protocol.
#[async_trait]
pub trait ModerationBotProbe {
    /// Fetches the live configuration, `None` when unavailable.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe itself fails.
    async fn live_config(&self) -> Result<Option<serde_json::Value>>;
}

/// Placeholder probe, pending the moderation bot's command protocol.
pub struct PlaceholderProbe;

#[async_trait]
impl ModerationBotProbe for PlaceholderProbe {
    async fn live_config(&self) -> Result<Option<serde_json::Value>> {
        // TODO: send /viewConfig to the guard bot and parse its reply
        // once reply capture lands in the client wrapper.
        Ok(None)
    }
}

/// Runs the moderation guard command.
///
/// # Errors
///
/// Returns an error on connection failures; individual check failures
/// are logged and the run continues.
pub async fn run(settings: &Settings, config_path: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        println!(
            "🔍 Dry run: would run moderation checks for {}",
            settings.channel
        );
        return Ok(());
    }

    info!("Starting moderation guard (config={})", config_path.display());

    let expected = load_expected_config(config_path);
    if expected.is_none() {
        println!(
            "⚠️ No moderation bot configuration found at {}",
            config_path.display()
        );
    }

    let client = super::connect_user(settings).await?;
    let result = guard(&client, settings, expected).await;
    client.disconnect();
    result
}

async fn guard(
    client: &ChannelClient,
    settings: &Settings,
    expected: Option<serde_json::Value>,
) -> Result<()> {
    let chat = client.resolve_channel(settings.channel_username()).await?;
    let probe = PlaceholderProbe;

    // Check 1: external bot configuration drift.
    if let Some(expected) = &expected {
        match check_config_drift(
            client,
            &probe,
            expected,
            settings.admin_log_chat.as_deref(),
        )
        .await
        {
            Ok(true) => println!("✅ Moderation bot configuration matches expected settings"),
            Ok(false) => println!("⚠️ Moderation bot configuration mismatch detected"),
            Err(e) => warn!("Config drift check failed: {:#}", e),
        }
    }

    // Check 2: welcome pin presence.
    match check_welcome_pin(client, &chat, &settings.channel).await {
        Ok(true) => println!("✅ Welcome pin message is present"),
        Ok(false) => println!("📌 Welcome pin message was missing and recreated"),
        Err(e) => warn!("Welcome pin check failed: {:#}", e),
    }

    // Check 3: message rate / slow mode.
    match check_message_rate(client, &chat).await {
        Ok((true, observed)) => println!("✅ Message rate normal: {observed} msg/min"),
        Ok((false, observed)) => {
            println!("🐌 Enabled slow mode ({SLOW_MODE_SECS}s) - message rate: {observed} msg/min");
        }
        Err(e) => warn!("Message rate check failed: {:#}", e),
    }

    println!("🛡️ Moderation guard checks completed");
    Ok(())
}

/// Compares the expected config against the live one; on drift, sends an
/// alert to the configured admin chat.
async fn check_config_drift(
    client: &ChannelClient,
    probe: &impl ModerationBotProbe,
    expected: &serde_json::Value,
    admin_chat: Option<&str>,
) -> Result<bool> {
    let Some(live) = probe.live_config().await? else {
        info!("Live moderation bot config unavailable, skipping comparison");
        return Ok(true);
    };

    if live == *expected {
        return Ok(true);
    }

    warn!("Moderation bot configuration drift detected");

    if let Some(admin) = admin_chat {
        let alert = "🚨 Moderation bot configuration mismatch detected\n\n\
                     The live configuration doesn't match the expected settings. \
                     Please review and update the configuration.";
        match alert_peer(client, admin).await {
            Ok(Some(peer)) => {
                if let Err(e) = client.send_direct(peer, alert).await {
                    warn!("Failed to send admin alert: {}", e);
                } else {
                    info!("Sent config mismatch alert to admin");
                }
            }
            Ok(None) => warn!("Admin chat {} could not be resolved for the alert", admin),
            Err(e) => warn!("Failed to resolve admin chat: {:#}", e),
        }
    }

    Ok(false)
}

/// Resolves the alert target: a numeric chat/user id or a username.
async fn alert_peer(client: &ChannelClient, admin: &str) -> Result<Option<PackedChat>> {
    if let Ok(id) = admin.parse::<i64>() {
        let peer = if id < 0 {
            PackedChat {
                ty: PackedType::Megagroup,
                id: external_chat_id(id),
                access_hash: None,
            }
        } else {
            packed_user(id, 0)
        };
        return Ok(Some(peer));
    }

    Ok(client.resolve_user(admin).await?.map(|chat| chat.pack()))
}

/// Verifies a welcome message is pinned; recreates and pins it when
/// missing. Returns whether the pin was already present.
async fn check_welcome_pin(
    client: &ChannelClient,
    chat: &Chat,
    channel: &str,
) -> Result<bool> {
    let pinned = client.pinned_message_texts(chat, 20).await?;

    if pinned.iter().any(|text| text.contains(WELCOME_MARKER)) {
        return Ok(true);
    }

    let text = welcome_text(channel);
    let message_id = client.send_post(chat, &text, &[]).await?;
    client.pin_message(chat, message_id).await?;

    info!("Recreated welcome pin message");
    Ok(false)
}

fn welcome_text(channel: &str) -> String {
    format!(
        "{WELCOME_MARKER} to {channel}!\n\n\
         📈 Your gateway to trading automation\n\
         💎 Join our community of successful traders\n\n\
         👉 Get started: /start"
    )
}

/// Measures the trailing-minute message rate and engages slow mode when
/// it exceeds the threshold. Returns (compliant, observed rate).
async fn check_message_rate(
    client: &ChannelClient,
    chat: &Chat,
) -> Result<(bool, usize)> {
    let observed = client.messages_within(chat, TimeDelta::minutes(1)).await?;
    info!("Message rate: {} msg/min", observed);

    if rate_exceeded(observed) {
        client.toggle_slow_mode(chat, SLOW_MODE_SECS).await?;
        warn!(
            "Enabled slow mode due to high message rate: {} msg/min",
            observed
        );
        Ok((false, observed))
    } else {
        Ok((true, observed))
    }
}

fn rate_exceeded(observed: usize) -> bool {
    observed > MAX_MESSAGES_PER_MINUTE
}

/// Loads the expected moderation bot config; missing or malformed files
/// yield `None` with a warning.
fn load_expected_config(path: &Path) -> Option<serde_json::Value> {
    if !path.exists() {
        warn!("Moderation bot config {} not found", path.display());
        return None;
    }

    match fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to parse moderation bot config: {}", e);
                None
            }
        },
        Err(e) => {
            warn!("Failed to read moderation bot config: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_rate_threshold_boundary() {
        assert!(!rate_exceeded(15));
        assert!(!rate_exceeded(MAX_MESSAGES_PER_MINUTE));
        assert!(rate_exceeded(MAX_MESSAGES_PER_MINUTE + 1));
    }

    #[test]
    fn test_welcome_text_carries_marker() {
        let text = welcome_text("@channel");
        assert!(text.starts_with(WELCOME_MARKER));
        assert!(text.contains("@channel"));
    }

    #[test]
    fn test_load_expected_config_missing() {
        let tmp = TempDir::new().unwrap();
        assert!(load_expected_config(&tmp.path().join("missing.json")).is_none());
    }

    #[test]
    fn test_load_expected_config_malformed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();

        assert!(load_expected_config(&path).is_none());
    }

    #[test]
    fn test_load_expected_config_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("guard.json");
        fs::write(&path, r#"{"language": "en", "captcha": "button"}"#).unwrap();

        let value = load_expected_config(&path).unwrap();
        assert_eq!(value["captcha"], "button");
    }
}
