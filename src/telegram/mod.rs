//! Telegram client wrapper module.
//!
//! Provides high-level abstractions for interacting with Telegram:
//! authentication, channel messaging, premium boosts, group
//! administration, and flood-wait handling.

mod boosts;
mod client;
mod retry;

pub use boosts::{BoostOutcome, BoostRecord, BoostRoster, Expiry};
pub use client::{
    ChannelClient, CreatedGroup, PwdToken as PasswordToken, TelegramError, Token as LoginToken,
    UrlButton, packed_user,
};
pub use retry::FloodPolicy;
