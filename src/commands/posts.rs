//! Scheduled post publishing command.
//!
//! Drains a queue of markdown files with optional front-matter (pin
//! flag, story flag, inline buttons), publishing each to the channel and
//! moving it to the done directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use grammers_client::types::Chat;
use serde::Serialize;
use tracing::info;

use crate::config::Settings;
use crate::queue::{
    ActionOutcome, Document, PostMeta, Preview, QueueAction, QueueProcessor, WorkItem,
};
use crate::telegram::{ChannelClient, UrlButton};

/// Where posts flagged `story: true` queue their follow-up payload.
const STORY_QUEUE_DIR: &str = "story/queue";

/// Options for the posts command.
#[derive(Debug, Clone)]
pub struct PostsOpts {
    /// Directory scanned for `*.md` files.
    pub queue_dir: PathBuf,

    /// Directory processed files move into.
    pub done_dir: PathBuf,

    /// Post through the bot-token session instead of the user session.
    pub use_bot: bool,

    /// Preview only.
    pub dry_run: bool,
}

/// Runs the posts command.
///
/// # Errors
///
/// Returns an error on connection or run-level queue failures; per-file
/// failures are logged and the batch continues.
pub async fn run(settings: &Settings, opts: &PostsOpts) -> Result<()> {
    let processor = QueueProcessor::new(&opts.queue_dir, &opts.done_dir, &["md"]);

    if opts.dry_run {
        processor.run(&mut Preview(preview), true).await?;
        return Ok(());
    }

    let client = if opts.use_bot {
        match &settings.bot_token {
            Some(token) => {
                println!("🤖 Using bot token for posting...");
                super::connect_bot(settings, token).await?
            }
            None => {
                println!("⚠️ --use-bot requested but TG_BOT_TOKEN is not set, using user session");
                super::connect_user(settings).await?
            }
        }
    } else {
        println!("👤 Using user session for posting...");
        super::connect_user(settings).await?
    };

    let result = async {
        let chat = client.resolve_channel(settings.channel_username()).await?;

        let mut action = PostAction {
            client: &client,
            chat,
            story_queue: PathBuf::from(STORY_QUEUE_DIR),
        };

        let report = processor.run(&mut action, false).await?;
        println!("📨 Processed {} post(s)", report.processed);
        Ok(())
    }
    .await;

    client.disconnect();
    result
}

/// Publishes one markdown file per queue item.
struct PostAction<'a> {
    client: &'a ChannelClient,
    chat: Chat,
    story_queue: PathBuf,
}

#[async_trait]
impl QueueAction for PostAction<'_> {
    fn describe(&self, item: &WorkItem) -> String {
        preview(item)
    }

    async fn process(&mut self, item: &WorkItem) -> Result<ActionOutcome> {
        let text = fs::read_to_string(&item.path)
            .with_context(|| format!("Failed to read {}", item.path.display()))?;

        let doc = Document::parse(&text);
        let meta: PostMeta = doc.decode_header();

        let message_id = self
            .client
            .send_post(&self.chat, &doc.body, &meta.buttons)
            .await?;
        println!("✔ Published {}", item.file_name());
        println!("  Message ID: {message_id}");
        info!("Sent message {} from {}", message_id, item.file_name());

        if meta.pin {
            self.client.pin_message(&self.chat, message_id).await?;
            println!("✔ Pinned");
            info!("Pinned message {} from {}", message_id, item.file_name());
        }

        if meta.story {
            queue_story(&self.story_queue, item, &doc.body, &meta.buttons)?;
        }

        Ok(ActionOutcome::succeeded())
    }
}

fn preview(item: &WorkItem) -> String {
    match fs::read_to_string(&item.path) {
        Ok(text) => {
            let doc = Document::parse(&text);
            let meta: PostMeta = doc.decode_header();
            format!(
                "📄 {}: pin={}, story={}, buttons={}",
                item.file_name(),
                meta.pin,
                meta.story,
                meta.buttons.len()
            )
        }
        Err(e) => format!("📄 {}: unreadable ({e})", item.file_name()),
    }
}

/// Story payload handed over to the story queue.
#[derive(Debug, Serialize)]
struct StoryPayload<'a> {
    caption: &'a str,
    buttons: &'a [UrlButton],
    source_post: String,
}

/// Writes the story payload for a post into the story queue directory.
fn queue_story(dir: &Path, item: &WorkItem, caption: &str, buttons: &[UrlButton]) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create story queue {}", dir.display()))?;

    let stem = item
        .path
        .file_stem()
        .map_or_else(|| "post".to_owned(), |s| s.to_string_lossy().into_owned());

    let payload = StoryPayload {
        caption,
        buttons,
        source_post: item.file_name(),
    };

    let path = dir.join(format!("{stem}_story.json"));
    fs::write(&path, serde_json::to_string_pretty(&payload)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Queued story content from {}", item.file_name());
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_queue_story_writes_payload() {
        let tmp = TempDir::new().unwrap();
        let story_dir = tmp.path().join("story/queue");
        let post = tmp.path().join("launch.md");
        fs::write(&post, "unused").unwrap();

        let item = WorkItem { path: post };
        let buttons = vec![UrlButton {
            text: "Open".to_owned(),
            url: "https://example.com".to_owned(),
        }];

        queue_story(&story_dir, &item, "Hello", &buttons).unwrap();

        let written = fs::read_to_string(story_dir.join("launch_story.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["caption"], "Hello");
        assert_eq!(value["source_post"], "launch.md");
        assert_eq!(value["buttons"][0]["url"], "https://example.com");
    }

    #[test]
    fn test_preview_reads_front_matter() {
        let tmp = TempDir::new().unwrap();
        let post = tmp.path().join("a.md");
        fs::write(&post, "---\npin: true\n---\nHello").unwrap();

        let line = preview(&WorkItem { path: post });
        assert!(line.contains("a.md"));
        assert!(line.contains("pin=true"));
        assert!(line.contains("story=false"));
    }
}
