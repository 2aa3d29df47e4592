//! Expiring-boost reminder command.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::Settings;
use crate::telegram::packed_user;

const SECS_PER_DAY: i64 = 24 * 60 * 60;
const SECS_PER_HOUR: i64 = 60 * 60;

/// How many boost records one reminder run examines.
const ROSTER_LIMIT: i32 = 100;

/// Runs the reminder command.
///
/// # Errors
///
/// Returns an error on connection or listing failures; a failure to
/// message one user only skips that user.
pub async fn run(settings: &Settings, days: i64, dry_run: bool) -> Result<()> {
    if dry_run {
        println!(
            "🔍 Dry run: would check for boosts expiring within {} days for {}",
            days, settings.channel
        );
        return Ok(());
    }

    info!("Starting reminder check with {} days threshold", days);

    let client = super::connect_user(settings).await?;

    let result = async {
        let chat = client.resolve_channel(settings.channel_username()).await?;
        let roster = client.boost_list(&chat, ROSTER_LIMIT).await?;

        let threshold_seconds = days * SECS_PER_DAY;
        let now = Utc::now();
        let mut sent = 0;

        for record in &roster.records {
            let Some(seconds_left) = record.expires.map(|e| e.seconds_remaining(now)) else {
                continue;
            };
            if !due_for_reminder(seconds_left, threshold_seconds) {
                continue;
            }

            let Some(user_id) = record.user_id else {
                continue;
            };
            let Some(&access_hash) = roster.contacts.get(&user_id) else {
                warn!("No contact data for user {}, skipping reminder", user_id);
                continue;
            };

            let message = reminder_text(&settings.channel, seconds_left);
            match client
                .send_direct(packed_user(user_id, access_hash), &message)
                .await
            {
                Ok(()) => {
                    sent += 1;
                    println!("✅ Reminder sent to user {user_id}");
                    info!("Reminder sent to user {}", user_id);
                }
                Err(e) => {
                    println!("⚠️ Could not send reminder to user {user_id}: {e}");
                    warn!("Failed to send reminder to user {}: {}", user_id, e);
                }
            }
        }

        println!(
            "📨 Reminders sent: {sent}\n📊 Total boosts checked: {}",
            roster.records.len()
        );
        info!(
            "Reminder process completed: {} sent, {} checked",
            sent,
            roster.records.len()
        );
        Ok(())
    }
    .await;

    client.disconnect();
    result
}

/// A boost is due for a reminder when it still has time left but less
/// than the threshold.
fn due_for_reminder(seconds_left: i64, threshold_seconds: i64) -> bool {
    seconds_left > 0 && seconds_left < threshold_seconds
}

fn reminder_text(channel: &str, seconds_left: i64) -> String {
    let days_left = seconds_left / SECS_PER_DAY;
    let hours_left = (seconds_left % SECS_PER_DAY) / SECS_PER_HOUR;

    format!(
        "🚨 Your boost is about to expire!\n\n\
         ⏰ Time remaining: {days_left} days, {hours_left} hours\n\
         📢 Channel: {channel}\n\n\
         💎 Renew your boost to keep supporting the channel!"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_for_reminder_bounds() {
        let threshold = 3 * SECS_PER_DAY;

        assert!(due_for_reminder(1, threshold));
        assert!(due_for_reminder(threshold - 1, threshold));

        // Expired or exactly at the threshold: no reminder.
        assert!(!due_for_reminder(0, threshold));
        assert!(!due_for_reminder(-100, threshold));
        assert!(!due_for_reminder(threshold, threshold));
    }

    #[test]
    fn test_reminder_text_breakdown() {
        let text = reminder_text("@channel", 2 * SECS_PER_DAY + 5 * SECS_PER_HOUR);

        assert!(text.contains("2 days, 5 hours"));
        assert!(text.contains("@channel"));
    }
}
