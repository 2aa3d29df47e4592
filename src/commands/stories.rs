//! Story upload command.
//!
//! Drains a queue of media files and uploads each as a channel story.
//! JSON trade-event files first render to a video; the rendered file is
//! uploaded and travels to the done directory alongside its source.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::config::Settings;
use crate::queue::{ActionOutcome, Preview, QueueAction, QueueProcessor, WorkItem};

/// File types accepted in the story queue.
const STORY_EXTENSIONS: &[&str] = &["mp4", "png", "jpg", "jpeg", "json"];

/// Options for the stories command.
#[derive(Debug, Clone)]
pub struct StoriesOpts {
    /// Directory scanned for media files.
    pub queue_dir: PathBuf,

    /// Directory processed files move into.
    pub done_dir: PathBuf,

    /// Preview only.
    pub dry_run: bool,
}

/// Uploads one media file as a story. Abstract seam for the stories API.
#[async_trait]
pub trait StoryUpload {
    /// Uploads the media, returning whether the upload succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload attempt itself fails.
    async fn upload(&self, media: &Path) -> Result<bool>;
}

/// Renders a trade event into a short video. Abstract seam for the
/// renderer.
pub trait VideoRenderer {
    /// Renders `event` to `output`, returning whether rendering
    /// succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails outright.
    fn render(&self, event: &serde_json::Value, output: &Path) -> Result<bool>;
}

/// Placeholder uploader, pending the real stories API integration.
///
/// Reports success so the queue lifecycle stays exercisable end to end.
pub struct PlaceholderUploader;

#[async_trait]
impl StoryUpload for PlaceholderUploader {
    async fn upload(&self, media: &Path) -> Result<bool> {
        // TODO: upload via stories.sendStory once chunked media upload
        // is wired into the client wrapper.
        info!("Uploading story: {}", media.display());
        Ok(true)
    }
}

/// Placeholder renderer that stamps out a marker file.
pub struct PlaceholderRenderer;

impl VideoRenderer for PlaceholderRenderer {
    fn render(&self, event: &serde_json::Value, output: &Path) -> Result<bool> {
        let event_type = event
            .get("event_type")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        info!("Rendering trade event video: {}", event_type);

        // TODO: render the 15s clip via ffmpeg once the event template
        // is finalized.
        fs::write(output, b"placeholder video content")
            .with_context(|| format!("Failed to write {}", output.display()))?;

        println!("🎬 Rendered video: {}", output.display());
        Ok(true)
    }
}

/// Runs the stories command.
///
/// # Errors
///
/// Returns an error on run-level queue failures; per-file failures are
/// logged and the batch continues.
pub async fn run(settings: &Settings, opts: &StoriesOpts) -> Result<()> {
    let processor = QueueProcessor::new(&opts.queue_dir, &opts.done_dir, STORY_EXTENSIONS);

    if opts.dry_run {
        processor.run(&mut Preview(preview), true).await?;
        return Ok(());
    }

    // The session is established up front even while the upload seam is
    // a placeholder, so authorization problems surface here and not
    // after the queue has been half-drained.
    let client = super::connect_user(settings).await?;

    let result = async {
        let mut action = StoryAction {
            uploader: PlaceholderUploader,
            renderer: PlaceholderRenderer,
        };

        let report = processor.run(&mut action, false).await?;
        println!("📱 Processed {} story file(s)", report.processed);
        Ok(())
    }
    .await;

    client.disconnect();
    result
}

/// Uploads one queue item per call.
struct StoryAction<U, R> {
    uploader: U,
    renderer: R,
}

#[async_trait]
impl<U, R> QueueAction for StoryAction<U, R>
where
    U: StoryUpload + Send + Sync,
    R: VideoRenderer + Send + Sync,
{
    fn describe(&self, item: &WorkItem) -> String {
        preview(item)
    }

    async fn process(&mut self, item: &WorkItem) -> Result<ActionOutcome> {
        let mut upload_path = item.path.clone();
        let mut outcome = ActionOutcome::succeeded();

        if is_trade_event(&item.path) {
            let text = fs::read_to_string(&item.path)
                .with_context(|| format!("Failed to read {}", item.path.display()))?;
            let event: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("Invalid JSON in {}", item.file_name()))?;

            let video = item.path.with_extension("mp4");
            if !self.renderer.render(&event, &video)? {
                println!("❌ Failed to render {}", item.file_name());
                return Ok(ActionOutcome::failed());
            }

            upload_path = video.clone();
            outcome = outcome.with_companion(video);
        }

        if self.uploader.upload(&upload_path).await? {
            println!("📱 Uploaded story: {}", item.file_name());
            Ok(outcome)
        } else {
            println!("❌ Failed to upload {}", item.file_name());
            Ok(ActionOutcome::failed())
        }
    }
}

fn is_trade_event(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn preview(item: &WorkItem) -> String {
    if is_trade_event(&item.path) {
        format!("🎬 {}: would render trade event video", item.file_name())
    } else {
        format!("📱 {}: would upload as story", item.file_name())
    }
}
