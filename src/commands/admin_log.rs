//! Admin-log group creation command.
//!
//! Creates a private megagroup, grants a configured bot explicit admin
//! rights in it, and persists the resulting external chat id to a local
//! artifact file, the clipboard, and optionally the `.env` file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::config::Settings;
use crate::telegram::ChannelClient;

/// Offset of the external chat id form relative to the internal group id.
const ADMIN_GROUP_OFFSET: i64 = -1_001_000_000_000_000;

/// Key patched into the `.env` file.
const ENV_KEY: &str = "ADMIN_LOG_CHAT";

/// Where the created chat id is persisted.
const ARTIFACT_PATH: &str = "data/admin_chat_id.txt";

/// Rank label shown for the promoted bot.
const BOT_RANK: &str = "Admin Bot";

/// Converts an internal group id to its external chat id form.
///
/// The transform is its own inverse, so it also maps an external id back
/// to the internal one.
#[must_use]
pub fn external_chat_id(internal_id: i64) -> i64 {
    ADMIN_GROUP_OFFSET - internal_id
}

/// Runs the admin-log command.
///
/// # Errors
///
/// Returns an error when the bot token precondition is unmet or a
/// creation step fails; a missing bot username only skips the grant.
pub async fn run(settings: &Settings, name: &str, write_env: bool, dry_run: bool) -> Result<()> {
    if dry_run {
        println!("🔍 Dry run: would create private admin log group '{name}' (write_env={write_env})");
        return Ok(());
    }

    if settings.bot_token.is_none() {
        println!("❌ TG_BOT_TOKEN is required in .env file to add bot as admin");
        bail!("TG_BOT_TOKEN is not configured");
    }

    info!("Creating admin log group '{}' (write_env={})", name, write_env);

    let client = super::connect_user(settings).await?;
    let result = create(&client, settings, name, write_env).await;
    client.disconnect();
    result
}

async fn create(
    client: &ChannelClient,
    settings: &Settings,
    name: &str,
    write_env: bool,
) -> Result<()> {
    // Step 1: create the megagroup.
    let group = client
        .create_megagroup(name, &format!("Private admin log group for {name}"))
        .await
        .context("Failed to create admin log group")?;
    println!("[1/4] ✅ Created mega-group: {name}");
    info!("Created mega-group '{}' with internal id {}", name, group.internal_id);

    // Step 2: locate the bot. Not finding it is a recoverable warning.
    let bot = match &settings.bot_username {
        Some(username) => match client.resolve_user(username).await {
            Ok(Some(chat)) => {
                println!("[2/4] ✅ Found bot @{}", username.trim_start_matches('@'));
                Some(chat)
            }
            Ok(None) => {
                println!(
                    "[2/4] ⚠️ Could not find bot '@{}'. Please add the bot manually to the group.",
                    username.trim_start_matches('@')
                );
                warn!("Could not find bot {}", username);
                None
            }
            Err(e) => {
                println!("[2/4] ⚠️ Bot lookup failed: {e}. Please add the bot manually.");
                warn!("Bot lookup failed: {}", e);
                None
            }
        },
        None => {
            println!("[2/4] ⚠️ BOT_USERNAME is not configured. Please add the bot manually.");
            None
        }
    };

    // Step 3: grant admin rights when the bot resolved.
    if let Some(bot) = &bot {
        client
            .grant_bot_admin(group, bot, BOT_RANK)
            .await
            .context("Failed to promote bot to administrator")?;
        println!("[3/4] ✅ Added bot as administrator");
    } else {
        println!("[3/4] ⚠️ Skipped adding bot as administrator");
    }

    // Step 4: persist the external chat id.
    let chat_id = external_chat_id(group.internal_id);
    println!("[4/4] 🆔 Chat ID: {chat_id}");

    let artifact = persist_artifact(Path::new(ARTIFACT_PATH), chat_id)?;
    println!("💾 Chat ID saved to {}", artifact.display());
    info!("Chat ID saved to {}", artifact.display());

    copy_to_clipboard(&chat_id.to_string());

    if write_env && patch_env_file(Path::new(".env"), chat_id)? {
        println!("✅ Updated .env with {ENV_KEY}");
        info!("Updated .env with {}={}", ENV_KEY, chat_id);
    }

    println!(
        "🎉 Admin log group '{name}' created successfully!\n🆔 Chat ID: {chat_id}\n🔒 Group is private and ready for admin logging"
    );
    Ok(())
}

/// Writes the chat id artifact, creating its parent directory.
fn persist_artifact(path: &Path, chat_id: i64) -> Result<PathBuf> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    fs::write(path, chat_id.to_string())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path.to_path_buf())
}

/// Best-effort clipboard copy; failure is a warning, never an error.
fn copy_to_clipboard(text: &str) {
    match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text.to_owned())) {
        Ok(()) => {
            println!("📋 Chat ID copied to clipboard!");
            info!("Chat ID {} copied to clipboard", text);
        }
        Err(e) => {
            println!("⚠️ Could not copy to clipboard");
            warn!("Failed to copy to clipboard: {}", e);
        }
    }
}

/// Patches `ADMIN_LOG_CHAT` into an existing env file; a missing file is
/// a warning and returns `false`.
fn patch_env_file(path: &Path, chat_id: i64) -> Result<bool> {
    if !path.exists() {
        println!("⚠️ .env file not found, skipped updating");
        warn!("{} not found for updating", path.display());
        return Ok(false);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let patched = patch_env_line(&content, ENV_KEY, &chat_id.to_string());
    fs::write(path, patched).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Replaces the line starting with `key=` or appends one; every other
/// line is left untouched.
fn patch_env_line(content: &str, key: &str, value: &str) -> String {
    let prefix = format!("{key}=");
    let mut lines: Vec<String> = content.lines().map(ToOwned::to_owned).collect();

    let mut replaced = false;
    for line in &mut lines {
        if line.starts_with(&prefix) {
            *line = format!("{prefix}{value}");
            replaced = true;
            break;
        }
    }
    if !replaced {
        lines.push(format!("{prefix}{value}"));
    }

    let mut patched = lines.join("\n");
    patched.push('\n');
    patched
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_external_chat_id_transform() {
        assert_eq!(external_chat_id(1_234_567_890), -1_001_001_234_567_890);
    }

    #[test]
    fn test_external_chat_id_is_involution() {
        let internal = 1_234_567_890;
        assert_eq!(external_chat_id(external_chat_id(internal)), internal);
    }

    #[test]
    fn test_patch_env_line_replaces_existing() {
        let content = "API_ID=1\nADMIN_LOG_CHAT=old\nPHONE=+1\n";
        let patched = patch_env_line(content, ENV_KEY, "-100123");

        assert_eq!(patched, "API_ID=1\nADMIN_LOG_CHAT=-100123\nPHONE=+1\n");
    }

    #[test]
    fn test_patch_env_line_appends_missing() {
        let content = "API_ID=1\n";
        let patched = patch_env_line(content, ENV_KEY, "-100123");

        assert_eq!(patched, "API_ID=1\nADMIN_LOG_CHAT=-100123\n");
    }

    #[test]
    fn test_patch_env_file_missing_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join(".env");

        assert!(!patch_env_file(&missing, -1).unwrap());
        assert!(!missing.exists());
    }

    #[test]
    fn test_patch_env_file_writes_back() {
        let tmp = TempDir::new().unwrap();
        let env = tmp.path().join(".env");
        fs::write(&env, "ADMIN_LOG_CHAT=stale\n").unwrap();

        assert!(patch_env_file(&env, -1_001_001_234_567_890).unwrap());
        assert_eq!(
            fs::read_to_string(&env).unwrap(),
            "ADMIN_LOG_CHAT=-1001001234567890\n"
        );
    }

    #[test]
    fn test_persist_artifact_creates_parent() {
        let tmp = TempDir::new().unwrap();
        let artifact = tmp.path().join("data/admin_chat_id.txt");

        persist_artifact(&artifact, -42).unwrap();
        assert_eq!(fs::read_to_string(&artifact).unwrap(), "-42");
    }
}
