//! Boosters leaderboard command.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::info;

use crate::config::Settings;
use crate::telegram::BoostRecord;

/// One rendered leaderboard line.
#[derive(Debug, Tabled)]
struct LeaderboardRow {
    #[tabled(rename = "Rank")]
    rank: usize,

    #[tabled(rename = "User ID")]
    user: String,

    #[tabled(rename = "Boosts")]
    boosts: i32,

    #[tabled(rename = "Expires (min)")]
    expires_min: String,
}

/// Runs the leaderboard command.
///
/// # Errors
///
/// Returns an error on connection or listing failures.
pub async fn run(settings: &Settings, limit: usize, dry_run: bool) -> Result<()> {
    if dry_run {
        println!(
            "🔍 Dry run: would show top {} boosters for {}",
            limit, settings.channel
        );
        return Ok(());
    }

    let client = super::connect_user(settings).await?;

    let result = async {
        let chat = client.resolve_channel(settings.channel_username()).await?;
        let roster = client
            .boost_list(&chat, i32::try_from(limit).unwrap_or(i32::MAX))
            .await?;

        let rows = build_rows(&roster.records, Utc::now(), limit);
        let shown = rows.len();

        println!("🏆 Top {} boosters for {}", limit, settings.channel);
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");

        if let Some(total) = roster.total {
            println!("📊 Total boosters: {total}");
            info!("Total boosters: {}", total);
        }

        info!("Displayed leaderboard with {} boosters", shown);
        Ok(())
    }
    .await;

    client.disconnect();
    result
}

/// Builds ranked rows; expiry decode failures render the placeholder
/// instead of failing the listing.
fn build_rows(records: &[BoostRecord], now: DateTime<Utc>, limit: usize) -> Vec<LeaderboardRow> {
    records
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, record)| LeaderboardRow {
            rank: i + 1,
            user: record
                .user_id
                .map_or_else(|| "unknown".to_owned(), |id| id.to_string()),
            boosts: record.multiplier,
            expires_min: record
                .minutes_remaining(now)
                .map_or_else(|| "n/a".to_owned(), |m| m.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::telegram::Expiry;

    use super::*;

    fn at(ts: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(ts, 0).unwrap()
    }

    #[test]
    fn test_build_rows_ranks_and_placeholder() {
        let records = vec![
            BoostRecord {
                user_id: Some(111),
                multiplier: 3,
                expires: Expiry::from_raw(3600),
            },
            BoostRecord {
                user_id: None,
                multiplier: 1,
                expires: None,
            },
        ];

        let rows = build_rows(&records, at(1_700_000_000), 10);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].user, "111");
        assert_eq!(rows[0].boosts, 3);
        assert_eq!(rows[0].expires_min, "60");

        assert_eq!(rows[1].rank, 2);
        assert_eq!(rows[1].user, "unknown");
        assert_eq!(rows[1].expires_min, "n/a");
    }

    #[test]
    fn test_build_rows_respects_limit() {
        let records: Vec<BoostRecord> = (0..5)
            .map(|i| BoostRecord {
                user_id: Some(i),
                multiplier: 1,
                expires: None,
            })
            .collect();

        let rows = build_rows(&records, at(1_700_000_000), 3);
        assert_eq!(rows.len(), 3);
    }
}
