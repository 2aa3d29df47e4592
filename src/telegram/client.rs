//! Telegram client wrapper for channel automation.
//!
//! One [`ChannelClient`] is constructed per command invocation and torn
//! down unconditionally when the command finishes, success or failure.

use std::path::Path;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use grammers_client::client::{LoginToken, PasswordToken};
use grammers_client::types::Chat;
use grammers_client::{
    Client, InputMessage, InvocationError, SenderPool, SignInError, button, reply_markup, sender,
};
use grammers_session::storages::SqliteSession;
use grammers_session::{PackedChat, PackedType};
use grammers_tl_types as tl;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Re-export types for external use.
pub use grammers_client::client::{LoginToken as Token, PasswordToken as PwdToken};

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Not authorized. Please sign in first.")]
    NotAuthorized,

    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Password required for 2FA")]
    PasswordRequired(PasswordToken),

    #[error("Invalid password")]
    InvalidPassword(PasswordToken),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedResponse(&'static str),

    #[error("API invocation error: {0}")]
    Invocation(String),
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        let err_str = err.to_string();

        // Check for flood wait errors
        if (err_str.contains("FLOOD_WAIT") || err_str.contains("flood"))
            && let Some(seconds) = extract_flood_wait_seconds(&err_str)
        {
            return Self::FloodWait(seconds);
        }

        Self::Invocation(err_str)
    }
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["FLOOD_WAIT_", "flood wait "];

    for pattern in patterns {
        if let Some(idx) = err_msg.to_lowercase().find(&pattern.to_lowercase()) {
            let start = idx + pattern.len();
            let num_str: String = err_msg[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

/// An inline URL button attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlButton {
    /// Display text.
    pub text: String,

    /// Target URL.
    pub url: String,
}

/// A freshly created megagroup, identified by its internal id.
#[derive(Debug, Clone, Copy)]
pub struct CreatedGroup {
    /// Internal channel id as the API reports it.
    pub internal_id: i64,

    /// Access hash for follow-up calls.
    pub access_hash: i64,
}

impl CreatedGroup {
    fn input_channel(self) -> tl::enums::InputChannel {
        tl::enums::InputChannel::Channel(tl::types::InputChannel {
            channel_id: self.internal_id,
            access_hash: self.access_hash,
        })
    }
}

/// High-level Telegram client wrapper.
pub struct ChannelClient {
    /// The underlying grammers client.
    client: Client,

    /// Handle to the sender pool for disconnection.
    handle: sender::SenderPoolHandle,

    /// Background task running the sender pool.
    _pool_task: JoinHandle<()>,
}

impl ChannelClient {
    /// Connects to Telegram with the given API id and session file.
    ///
    /// # Errors
    ///
    /// Returns an error if connection fails.
    pub async fn connect(api_id: i32, session_path: &Path) -> Result<Self, TelegramError> {
        info!("Connecting to Telegram...");

        let session = Arc::new(
            SqliteSession::open(session_path)
                .await
                .map_err(|e| TelegramError::Session(e.to_string()))?,
        );

        let SenderPool {
            runner,
            updates: _updates,
            handle,
        } = SenderPool::new(Arc::clone(&session), api_id);

        let client = Client::new(handle.clone());

        // Spawn the sender pool runner
        let pool_task = tokio::spawn(async move {
            runner.run().await;
        });

        let is_authorized = client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))?;

        info!("Connected to Telegram. Authorized: {}", is_authorized);

        Ok(Self {
            client,
            handle: handle.thin,
            _pool_task: pool_task,
        })
    }

    /// Checks if the client is authorized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check fails.
    pub async fn is_authorized(&self) -> Result<bool, TelegramError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| TelegramError::Connection(e.to_string()))
    }

    /// Requests a login code to be sent to the phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn request_login_code(
        &self,
        phone: &str,
        api_hash: &str,
    ) -> Result<LoginToken, TelegramError> {
        info!("Requesting login code for phone: {}...", mask_phone(phone));

        self.client
            .request_login_code(phone, api_hash)
            .await
            .map_err(|e| TelegramError::SignInFailed(e.to_string()))
    }

    /// Signs in with the login code.
    ///
    /// # Errors
    ///
    /// Returns an error if sign in fails.
    pub async fn sign_in(&self, token: &LoginToken, code: &str) -> Result<(), TelegramError> {
        info!("Signing in with login code...");

        match self.client.sign_in(token, code).await {
            Ok(_user) => {
                info!("Successfully signed in!");
                Ok(())
            }
            Err(SignInError::PasswordRequired(password_token)) => {
                debug!("2FA password required, hint: {:?}", password_token.hint());
                Err(TelegramError::PasswordRequired(password_token))
            }
            Err(SignInError::InvalidCode) => {
                Err(TelegramError::SignInFailed("Invalid code".to_owned()))
            }
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Checks the 2FA password.
    ///
    /// # Errors
    ///
    /// Returns an error if the password is invalid.
    pub async fn check_password(
        &self,
        password_token: PasswordToken,
        password: &str,
    ) -> Result<(), TelegramError> {
        info!("Checking 2FA password...");

        match self.client.check_password(password_token, password).await {
            Ok(_user) => {
                info!("Successfully authenticated with 2FA!");
                Ok(())
            }
            Err(SignInError::InvalidPassword(token)) => Err(TelegramError::InvalidPassword(token)),
            Err(e) => Err(TelegramError::SignInFailed(e.to_string())),
        }
    }

    /// Signs in with a bot token instead of a user account.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected.
    pub async fn sign_in_bot(
        &self,
        api_id: i32,
        api_hash: &str,
        token: &str,
    ) -> Result<(), TelegramError> {
        info!("Signing in with bot token...");

        let request = tl::functions::auth::ImportBotAuthorization {
            flags: 0,
            api_id,
            api_hash: api_hash.to_owned(),
            bot_auth_token: token.to_owned(),
        };

        self.client
            .invoke(&request)
            .await
            .map(|_| ())
            .map_err(|e| TelegramError::SignInFailed(e.to_string()))
    }

    /// Resolves the target channel by username.
    ///
    /// # Errors
    ///
    /// Returns [`TelegramError::ChannelNotFound`] if the username does not
    /// resolve, or an error if the request fails.
    pub async fn resolve_channel(&self, username: &str) -> Result<Chat, TelegramError> {
        let name = username.trim_start_matches('@');
        debug!("Resolving channel @{}...", name);

        self.client
            .resolve_username(name)
            .await
            .map_err(TelegramError::from)?
            .ok_or_else(|| TelegramError::ChannelNotFound(username.to_owned()))
    }

    /// Resolves an arbitrary username, returning `None` when unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the request itself fails.
    pub async fn resolve_user(&self, username: &str) -> Result<Option<Chat>, TelegramError> {
        let name = username.trim_start_matches('@');
        debug!("Resolving user @{}...", name);

        self.client
            .resolve_username(name)
            .await
            .map_err(TelegramError::from)
    }

    /// Sends a text message to a chat, with optional inline URL buttons.
    ///
    /// Returns the id of the sent message.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails.
    pub async fn send_post(
        &self,
        chat: &Chat,
        text: &str,
        buttons: &[UrlButton],
    ) -> Result<i32, TelegramError> {
        let mut message = InputMessage::text(text);

        if !buttons.is_empty() {
            let row = buttons
                .iter()
                .map(|b| button::url(&b.text, &b.url))
                .collect();
            message = message.reply_markup(&reply_markup::inline(vec![row]));
        }

        let sent = self
            .client
            .send_message(chat, message)
            .await
            .map_err(TelegramError::from)?;

        Ok(sent.id())
    }

    /// Sends a plain direct message to a packed peer.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails.
    pub async fn send_direct(&self, peer: PackedChat, text: &str) -> Result<(), TelegramError> {
        self.client
            .send_message(peer, InputMessage::text(text))
            .await
            .map(|_| ())
            .map_err(TelegramError::from)
    }

    /// Pins a message in a chat.
    ///
    /// # Errors
    ///
    /// Returns an error if pinning fails.
    pub async fn pin_message(&self, chat: &Chat, message_id: i32) -> Result<(), TelegramError> {
        debug!("Pinning message {}...", message_id);

        self.client
            .pin_message(chat, message_id)
            .await
            .map_err(TelegramError::from)
    }

    /// Returns the texts of up to `limit` pinned messages in a chat.
    ///
    /// # Errors
    ///
    /// Returns an error if the search fails.
    pub async fn pinned_message_texts(
        &self,
        chat: &Chat,
        limit: usize,
    ) -> Result<Vec<String>, TelegramError> {
        let mut iter = self
            .client
            .search_messages(chat)
            .filter(tl::enums::MessagesFilter::InputMessagesFilterPinned)
            .limit(limit);

        let mut texts = Vec::new();
        while let Some(message) = iter.next().await.map_err(TelegramError::from)? {
            texts.push(message.text().to_owned());
        }

        Ok(texts)
    }

    /// Counts messages posted to a chat within the trailing window.
    ///
    /// Scans at most 100 recent messages; history older than the window
    /// stops the scan early.
    ///
    /// # Errors
    ///
    /// Returns an error if history cannot be read.
    pub async fn messages_within(
        &self,
        chat: &Chat,
        window: TimeDelta,
    ) -> Result<usize, TelegramError> {
        let cutoff = Utc::now() - window;
        let mut iter = self.client.iter_messages(chat).limit(100);

        let mut count = 0;
        while let Some(message) = iter.next().await.map_err(TelegramError::from)? {
            if message.date() < cutoff {
                break;
            }
            count += 1;
        }

        Ok(count)
    }

    /// Creates a private megagroup and returns its identifiers.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails or the response carries no
    /// channel.
    pub async fn create_megagroup(
        &self,
        title: &str,
        about: &str,
    ) -> Result<CreatedGroup, TelegramError> {
        info!("Creating private megagroup \"{}\"...", title);

        let request = tl::functions::channels::CreateChannel {
            broadcast: false,
            megagroup: true,
            for_import: false,
            forum: false,
            title: title.to_owned(),
            about: about.to_owned(),
            geo_point: None,
            address: None,
            ttl_period: None,
        };

        let updates = self.client.invoke(&request).await?;
        created_group_from_updates(&updates)
            .ok_or(TelegramError::UnexpectedResponse("createChannel updates"))
    }

    /// Invites a bot into a freshly created group and promotes it.
    ///
    /// The granted rights deliberately exclude the ability to add further
    /// admins.
    ///
    /// # Errors
    ///
    /// Returns an error if the invite or the promotion fails.
    pub async fn grant_bot_admin(
        &self,
        group: CreatedGroup,
        bot: &Chat,
        rank: &str,
    ) -> Result<(), TelegramError> {
        let packed = bot.pack();
        let input_user = tl::enums::InputUser::User(tl::types::InputUser {
            user_id: packed.id,
            access_hash: packed.access_hash.unwrap_or_default(),
        });

        let invite = tl::functions::channels::InviteToChannel {
            channel: group.input_channel(),
            users: vec![input_user.clone()],
        };
        self.client.invoke(&invite).await?;
        debug!("Invited bot {} into group {}", packed.id, group.internal_id);

        let admin_rights = tl::enums::ChatAdminRights::Rights(tl::types::ChatAdminRights {
            change_info: true,
            post_messages: true,
            edit_messages: true,
            delete_messages: true,
            ban_users: true,
            invite_users: true,
            pin_messages: true,
            add_admins: false,
            anonymous: false,
            manage_call: false,
            other: false,
            manage_topics: false,
            post_stories: false,
            edit_stories: false,
            delete_stories: false,
        });

        let promote = tl::functions::channels::EditAdmin {
            channel: group.input_channel(),
            user_id: input_user,
            admin_rights,
            rank: rank.to_owned(),
        };
        self.client.invoke(&promote).await?;

        info!("Granted admin rights to bot {} in group {}", packed.id, group.internal_id);
        Ok(())
    }

    /// Enables slow mode on a channel with the given delay in seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the restriction cannot be applied.
    pub async fn toggle_slow_mode(&self, chat: &Chat, seconds: i32) -> Result<(), TelegramError> {
        let packed = chat.pack();
        let request = tl::functions::channels::ToggleSlowMode {
            channel: tl::enums::InputChannel::Channel(tl::types::InputChannel {
                channel_id: packed.id,
                access_hash: packed.access_hash.unwrap_or_default(),
            }),
            seconds,
        };

        self.client.invoke(&request).await?;
        Ok(())
    }

    /// Returns a reference to the underlying client for advanced operations.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Disconnects from Telegram.
    pub fn disconnect(&self) {
        info!("Disconnecting from Telegram...");
        self.handle.quit();
    }
}

impl std::fmt::Debug for ChannelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelClient").finish_non_exhaustive()
    }
}

/// Builds a packed user peer from an id and access hash.
#[must_use]
pub fn packed_user(user_id: i64, access_hash: i64) -> PackedChat {
    PackedChat {
        ty: PackedType::User,
        id: user_id,
        access_hash: Some(access_hash),
    }
}

/// Builds the raw input peer for a resolved chat.
pub(crate) fn input_peer(chat: &Chat) -> tl::enums::InputPeer {
    let packed = chat.pack();
    match packed.ty {
        PackedType::User | PackedType::Bot => tl::enums::InputPeer::User(tl::types::InputPeerUser {
            user_id: packed.id,
            access_hash: packed.access_hash.unwrap_or_default(),
        }),
        PackedType::Chat => tl::enums::InputPeer::Chat(tl::types::InputPeerChat {
            chat_id: packed.id,
        }),
        _ => tl::enums::InputPeer::Channel(tl::types::InputPeerChannel {
            channel_id: packed.id,
            access_hash: packed.access_hash.unwrap_or_default(),
        }),
    }
}

fn created_group_from_updates(updates: &tl::enums::Updates) -> Option<CreatedGroup> {
    let chats = match updates {
        tl::enums::Updates::Updates(u) => &u.chats,
        tl::enums::Updates::Combined(u) => &u.chats,
        _ => return None,
    };

    chats.iter().find_map(|chat| match chat {
        tl::enums::Chat::Channel(channel) => Some(CreatedGroup {
            internal_id: channel.id,
            access_hash: channel.access_hash.unwrap_or_default(),
        }),
        _ => None,
    })
}

/// Masks a phone number for logging (shows last 4 digits).
fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 4 {
        format!("***{}", &digits[digits.len() - 4..])
    } else {
        "****".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+1234567890"), "***7890");
        assert_eq!(mask_phone("123"), "****");
        assert_eq!(mask_phone("+7 (999) 123-45-67"), "***4567");
    }

    #[test]
    fn test_extract_flood_wait() {
        assert_eq!(extract_flood_wait_seconds("FLOOD_WAIT_120"), Some(120));
        assert_eq!(extract_flood_wait_seconds("flood wait 60 seconds"), Some(60));
        assert_eq!(extract_flood_wait_seconds("some other error"), None);
    }

    #[test]
    fn test_packed_user() {
        let packed = packed_user(42, 1234);
        assert_eq!(packed.id, 42);
        assert_eq!(packed.access_hash, Some(1234));
    }
}
