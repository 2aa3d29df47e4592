//! Boost application command.
//!
//! Applies N boosts to the configured channel with an all-or-nothing
//! capacity check up front: when fewer slots are available than
//! requested, nothing is applied and the shortfall is reported.

use anyhow::Result;
use grammers_client::types::Chat;
use tracing::{info, warn};

use crate::config::Settings;
use crate::telegram::{ChannelClient, FloodPolicy, TelegramError};

/// Runs the boost command.
///
/// # Errors
///
/// Returns an error on connection or unrecoverable remote failures; an
/// insufficient slot count is reported but is not an error.
pub async fn run(settings: &Settings, slots: usize, dry_run: bool) -> Result<()> {
    if dry_run {
        println!(
            "🔍 Dry run: would apply {} boost(s) to {}",
            slots, settings.channel
        );
        return Ok(());
    }

    info!("Starting boost application with {} slot(s)", slots);

    let client = super::connect_user(settings).await?;
    let result = apply_with_retry(&client, settings, slots).await;
    client.disconnect();
    result.map_err(Into::into)
}

/// Retries the whole application on flood waits, from the slot check
/// down, within the bounded policy.
async fn apply_with_retry(
    client: &ChannelClient,
    settings: &Settings,
    slots: usize,
) -> Result<(), TelegramError> {
    let mut policy = FloodPolicy::default();

    loop {
        match apply_once(client, settings, slots).await {
            Ok(()) => return Ok(()),
            Err(TelegramError::FloodWait(seconds)) if policy.admits(seconds) => {
                println!("⏳ Flood wait detected. Waiting {seconds} seconds...");
                policy.obey(seconds).await;
                // Restart from the top: slots may have changed meanwhile.
            }
            Err(TelegramError::FloodWait(seconds)) => {
                warn!(
                    "Flood wait of {}s exceeds the retry budget ({} retries used), giving up",
                    seconds,
                    policy.retries()
                );
                return Err(TelegramError::FloodWait(seconds));
            }
            Err(e) => return Err(e),
        }
    }
}

async fn apply_once(
    client: &ChannelClient,
    settings: &Settings,
    slots: usize,
) -> Result<(), TelegramError> {
    let chat = client.resolve_channel(settings.channel_username()).await?;

    let available = client.available_boost_slots().await?;
    println!("📊 Available boost slots: {available}");

    if !has_capacity(available, slots) {
        println!("⚠️ Not enough boost slots available! Requested: {slots}, Available: {available}");
        warn!("Not enough slots: requested {}, available {}", slots, available);
        return Ok(());
    }

    for i in 1..=slots {
        client.apply_boost(&chat).await?;
        report_application(client, &chat, i).await;
    }

    Ok(())
}

/// All-or-nothing capacity gate: either every requested slot fits or
/// nothing is applied.
fn has_capacity(available: usize, requested: usize) -> bool {
    available >= requested
}

/// Reports the channel state after one application; the status fields are
/// optional and a failed status read never fails the boost itself.
async fn report_application(client: &ChannelClient, chat: &Chat, index: usize) {
    match client.boost_status(chat).await {
        Ok(outcome) => match (outcome.level, outcome.boosts) {
            (Some(level), Some(boosts)) => {
                println!(
                    "✅ Boost #{index} applied successfully!\n📊 Channel Level: {level}\n🚀 Current Boosts: {boosts}"
                );
                info!(
                    "Boost #{} applied - level: {}, boosts: {}",
                    index, level, boosts
                );
            }
            _ => {
                println!("✅ Boost #{index} applied successfully!");
                info!("Boost #{} applied", index);
            }
        },
        Err(e) => {
            println!("✅ Boost #{index} applied successfully!");
            warn!("Could not read boost status after apply: {}", e);
        }
    }
}
