//! Premium boost operations, decoded once at the service boundary.
//!
//! The remote API reports boost expiry inconsistently (absolute unix
//! timestamps vs already-relative seconds); everything past this module
//! only ever sees the normalized [`Expiry`] type.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use grammers_client::types::Chat;
use grammers_tl_types as tl;
use tracing::debug;

use super::client::{ChannelClient, TelegramError, input_peer};

/// Expiry values at or above this are absolute unix timestamps; smaller
/// values are relative seconds.
const ABSOLUTE_EXPIRY_CUTOFF: i64 = 1_000_000_000;

/// Normalized boost expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Absolute point in time.
    Absolute(DateTime<Utc>),

    /// Seconds from now, as reported.
    Relative(i64),
}

impl Expiry {
    /// Decodes a raw expiry value; non-positive or undecodable values
    /// yield `None`.
    #[must_use]
    pub fn from_raw(raw: i64) -> Option<Self> {
        if raw <= 0 {
            return None;
        }
        if raw >= ABSOLUTE_EXPIRY_CUTOFF {
            DateTime::from_timestamp(raw, 0).map(Self::Absolute)
        } else {
            Some(Self::Relative(raw))
        }
    }

    /// Seconds remaining relative to `now`; `None` when already elapsed
    /// information cannot be computed.
    #[must_use]
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        match self {
            Self::Absolute(when) => (*when - now).num_seconds(),
            Self::Relative(secs) => *secs,
        }
    }

    /// Minutes remaining relative to `now`.
    #[must_use]
    pub fn minutes_remaining(&self, now: DateTime<Utc>) -> i64 {
        self.seconds_remaining(now) / 60
    }
}

/// One boost applied to the channel, as reported by the remote service.
/// Read-only to this system.
#[derive(Debug, Clone)]
pub struct BoostRecord {
    /// Owning user, when the boost is attributed.
    pub user_id: Option<i64>,

    /// Boost multiplier; the API omits it for plain single boosts.
    pub multiplier: i32,

    /// Normalized expiry, when present.
    pub expires: Option<Expiry>,
}

impl BoostRecord {
    /// Minutes remaining until expiry, or `None` for the placeholder.
    #[must_use]
    pub fn minutes_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires.map(|e| e.minutes_remaining(now))
    }
}

/// A page of boost records plus the contact data needed to message the
/// owners.
#[derive(Debug, Clone, Default)]
pub struct BoostRoster {
    /// Records in remote-reported order.
    pub records: Vec<BoostRecord>,

    /// Total booster count when the response carries one.
    pub total: Option<i32>,

    /// User id to access hash, from the response's own user list.
    pub contacts: HashMap<i64, i64>,
}

/// Result of one boost application, fields present only when the remote
/// response provides them.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoostOutcome {
    /// Channel level after the boost.
    pub level: Option<i32>,

    /// Total boosts on the channel after the boost.
    pub boosts: Option<i32>,
}

impl ChannelClient {
    /// Queries how many of the account's boost slots are free.
    ///
    /// Slots with no assigned peer count as available; a response without
    /// a slot vector counts as zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn available_boost_slots(&self) -> Result<usize, TelegramError> {
        let tl::enums::premium::MyBoosts::Boosts(data) = self
            .inner()
            .invoke(&tl::functions::premium::GetMyBoosts {})
            .await?;

        let available = data
            .my_boosts
            .iter()
            .filter(|boost| {
                let tl::enums::MyBoost::Boost(slot) = boost;
                slot.peer.is_none()
            })
            .count();

        debug!("Available boost slots: {}", available);
        Ok(available)
    }

    /// Applies one boost to the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; flood waits surface as
    /// [`TelegramError::FloodWait`].
    pub async fn apply_boost(&self, chat: &Chat) -> Result<(), TelegramError> {
        let request = tl::functions::premium::ApplyBoost {
            slots: None,
            peer: input_peer(chat),
        };

        self.inner().invoke(&request).await?;
        Ok(())
    }

    /// Fetches the channel's boost status (level, total boosts).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn boost_status(&self, chat: &Chat) -> Result<BoostOutcome, TelegramError> {
        let request = tl::functions::premium::GetBoostsStatus {
            peer: input_peer(chat),
        };

        let tl::enums::premium::BoostsStatus::Status(status) =
            self.inner().invoke(&request).await?;

        Ok(BoostOutcome {
            level: Some(status.level),
            boosts: Some(status.boosts),
        })
    }

    /// Fetches up to `limit` boost records for the channel, with the
    /// contact map for their owners.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn boost_list(
        &self,
        chat: &Chat,
        limit: i32,
    ) -> Result<BoostRoster, TelegramError> {
        let request = tl::functions::premium::GetBoostsList {
            gifts: false,
            peer: input_peer(chat),
            offset: String::new(),
            limit,
        };

        let tl::enums::premium::BoostsList::List(data) = self.inner().invoke(&request).await?;

        let contacts = data
            .users
            .iter()
            .filter_map(|user| match user {
                tl::enums::User::User(u) => Some((u.id, u.access_hash.unwrap_or_default())),
                tl::enums::User::Empty(_) => None,
            })
            .collect();

        let records = data
            .boosts
            .into_iter()
            .map(|boost| {
                let tl::enums::Boost::Boost(b) = boost;
                BoostRecord {
                    user_id: b.user_id,
                    multiplier: b.multiplier.unwrap_or(1),
                    expires: Expiry::from_raw(i64::from(b.expires)),
                }
            })
            .collect();

        Ok(BoostRoster {
            records,
            total: Some(data.count),
            contacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ts: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(ts, 0).unwrap()
    }

    #[test]
    fn test_expiry_non_positive() {
        assert_eq!(Expiry::from_raw(0), None);
        assert_eq!(Expiry::from_raw(-5), None);
    }

    #[test]
    fn test_expiry_relative() {
        let expiry = Expiry::from_raw(7200).unwrap();
        assert_eq!(expiry, Expiry::Relative(7200));
        assert_eq!(expiry.minutes_remaining(at(1_700_000_000)), 120);
    }

    #[test]
    fn test_expiry_absolute() {
        let now = at(1_700_000_000);
        let expiry = Expiry::from_raw(1_700_003_600).unwrap();
        assert!(matches!(expiry, Expiry::Absolute(_)));
        assert_eq!(expiry.minutes_remaining(now), 60);
    }

    #[test]
    fn test_expiry_absolute_in_past() {
        let now = at(1_700_000_000);
        let expiry = Expiry::from_raw(1_699_999_940).unwrap();
        assert_eq!(expiry.seconds_remaining(now), -60);
    }

    #[test]
    fn test_record_placeholder() {
        let record = BoostRecord {
            user_id: Some(1),
            multiplier: 1,
            expires: None,
        };
        assert_eq!(record.minutes_remaining(at(1_700_000_000)), None);
    }
}
