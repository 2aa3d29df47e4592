//! Queue-to-done work item processing.
//!
//! The filesystem is the whole state machine: a file in the queue
//! directory is pending, a file in the done directory is completed.
//! Files move only after their remote action fully succeeded, so a file
//! still sitting in the queue after a run always means "retry me".

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors that abort a whole queue run (not per-item failures).
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Failed to access queue directory {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create done directory {path}: {source}")]
    DoneDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A queued work item, identified by its file path.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Location in the queue directory.
    pub path: PathBuf,
}

impl WorkItem {
    /// File name for logs and reports.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}

/// Outcome of a per-item action.
#[derive(Debug, Default)]
pub struct ActionOutcome {
    /// Whether the remote action fully succeeded.
    pub success: bool,

    /// Extra files the action produced that belong in the done directory
    /// alongside the item (e.g. a rendered video).
    pub companions: Vec<PathBuf>,
}

impl ActionOutcome {
    /// Successful outcome without companions.
    #[must_use]
    pub fn succeeded() -> Self {
        Self {
            success: true,
            companions: Vec::new(),
        }
    }

    /// Failed outcome; the item stays queued.
    #[must_use]
    pub fn failed() -> Self {
        Self::default()
    }

    /// Attaches a companion file to move along with the item.
    #[must_use]
    pub fn with_companion(mut self, path: PathBuf) -> Self {
        self.companions.push(path);
        self
    }
}

/// Per-item behavior plugged into a [`QueueProcessor`].
#[async_trait]
pub trait QueueAction {
    /// One-line preview of the item for dry runs.
    fn describe(&self, item: &WorkItem) -> String;

    /// Performs the remote action for one item.
    ///
    /// # Errors
    ///
    /// An error counts as a per-item failure; the batch continues.
    async fn process(&mut self, item: &WorkItem) -> anyhow::Result<ActionOutcome>;
}

/// Dry-run adapter: wraps a pure describe function into a
/// [`QueueAction`] whose `process` is never reached by a dry run.
pub struct Preview<F>(pub F);

#[async_trait]
impl<F> QueueAction for Preview<F>
where
    F: Fn(&WorkItem) -> String + Send + Sync,
{
    fn describe(&self, item: &WorkItem) -> String {
        (self.0)(item)
    }

    async fn process(&mut self, _item: &WorkItem) -> anyhow::Result<ActionOutcome> {
        Ok(ActionOutcome::failed())
    }
}

/// Summary of one queue run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueReport {
    /// Files that matched the extension filter.
    pub matched: usize,

    /// Files successfully processed and moved to done.
    pub processed: usize,
}

/// Scans a queue directory and drives items through an action, one at a
/// time, relocating each to the done directory on success.
#[derive(Debug)]
pub struct QueueProcessor {
    queue_dir: PathBuf,
    done_dir: PathBuf,
    extensions: Vec<String>,
}

impl QueueProcessor {
    /// Creates a processor over the given directory pair and extension
    /// filter (extensions without the leading dot).
    #[must_use]
    pub fn new(
        queue_dir: impl Into<PathBuf>,
        done_dir: impl Into<PathBuf>,
        extensions: &[&str],
    ) -> Self {
        Self {
            queue_dir: queue_dir.into(),
            done_dir: done_dir.into(),
            extensions: extensions.iter().map(|e| (*e).to_lowercase()).collect(),
        }
    }

    /// Enumerates matching queue files, sorted by file name.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue directory cannot be read.
    pub fn collect(&self) -> Result<Vec<PathBuf>, QueueError> {
        let entries = fs::read_dir(&self.queue_dir).map_err(|source| QueueError::Scan {
            path: self.queue_dir.clone(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.matches(path))
            .collect();

        // Directory enumeration order is not guaranteed; sort for
        // deterministic processing.
        files.sort();
        Ok(files)
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }

    /// Runs the action over every matching file.
    ///
    /// A missing queue directory is "nothing to do", not an error. In dry
    /// run mode items are described but nothing is contacted, created or
    /// moved. Per-item failures are logged and the batch continues.
    ///
    /// # Errors
    ///
    /// Returns an error only for run-level failures: an unreadable queue
    /// directory or a done directory that cannot be created.
    pub async fn run<A>(&self, action: &mut A, dry_run: bool) -> Result<QueueReport, QueueError>
    where
        A: QueueAction + Send,
    {
        if !self.queue_dir.exists() {
            info!(
                "Queue directory {} does not exist, nothing to do",
                self.queue_dir.display()
            );
            return Ok(QueueReport::default());
        }

        let files = self.collect()?;
        let matched = files.len();

        if matched == 0 {
            info!("No matching files in {}", self.queue_dir.display());
            return Ok(QueueReport::default());
        }

        if dry_run {
            println!("🔍 Dry run: {} file(s) in {}", matched, self.queue_dir.display());
            for path in files {
                let item = WorkItem { path };
                println!("  {}", action.describe(&item));
            }
            return Ok(QueueReport {
                matched,
                processed: 0,
            });
        }

        fs::create_dir_all(&self.done_dir).map_err(|source| QueueError::DoneDir {
            path: self.done_dir.clone(),
            source,
        })?;

        let mut processed = 0;
        for path in files {
            let item = WorkItem { path };
            let name = item.file_name();

            match action.process(&item).await {
                Ok(outcome) if outcome.success => {
                    match self.finish_item(&item, &outcome.companions) {
                        Ok(()) => {
                            processed += 1;
                            info!("Processed {}", name);
                        }
                        Err(e) => {
                            // The remote action succeeded but the file did
                            // not move; it will be retried on the next run.
                            error!("Failed to move {} to done: {}", name, e);
                        }
                    }
                }
                Ok(_) => {
                    warn!("Action reported failure for {}, leaving it queued", name);
                }
                Err(e) => {
                    println!("❌ Failed to process {name}: {e:#}");
                    error!("Failed to process {}: {:#}", name, e);
                }
            }
        }

        info!(
            "Queue run complete: {}/{} file(s) processed",
            processed, matched
        );
        Ok(QueueReport { matched, processed })
    }

    fn finish_item(&self, item: &WorkItem, companions: &[PathBuf]) -> io::Result<()> {
        move_into(&item.path, &self.done_dir)?;

        for companion in companions {
            if companion.exists()
                && let Err(e) = move_into(companion, &self.done_dir)
            {
                warn!("Failed to move companion {}: {}", companion.display(), e);
            }
        }
        Ok(())
    }
}

/// Moves a file into a directory, falling back to copy + remove across
/// filesystem boundaries.
fn move_into(src: &Path, dest_dir: &Path) -> io::Result<PathBuf> {
    let file_name = src
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let dest = dest_dir.join(file_name);

    if fs::rename(src, &dest).is_err() {
        fs::copy(src, &dest)?;
        fs::remove_file(src)?;
    }
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    /// Test action that records processed names and can fail on demand.
    struct RecordingAction {
        fail_on: Option<String>,
        error_on: Option<String>,
        seen: Vec<String>,
        companion: Option<PathBuf>,
    }

    impl RecordingAction {
        fn new() -> Self {
            Self {
                fail_on: None,
                error_on: None,
                seen: Vec::new(),
                companion: None,
            }
        }
    }

    #[async_trait]
    impl QueueAction for RecordingAction {
        fn describe(&self, item: &WorkItem) -> String {
            format!("would process {}", item.file_name())
        }

        async fn process(&mut self, item: &WorkItem) -> anyhow::Result<ActionOutcome> {
            let name = item.file_name();
            self.seen.push(name.clone());

            if self.error_on.as_deref() == Some(name.as_str()) {
                anyhow::bail!("simulated error");
            }
            if self.fail_on.as_deref() == Some(name.as_str()) {
                return Ok(ActionOutcome::failed());
            }

            let mut outcome = ActionOutcome::succeeded();
            if let Some(companion) = &self.companion {
                outcome = outcome.with_companion(companion.clone());
            }
            Ok(outcome)
        }
    }

    fn setup(names: &[&str]) -> (TempDir, PathBuf, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let queue = tmp.path().join("queue");
        let done = tmp.path().join("done");
        fs::create_dir_all(&queue).unwrap();

        for name in names {
            fs::write(queue.join(name), format!("content of {name}")).unwrap();
        }
        (tmp, queue, done)
    }

    #[tokio::test]
    async fn test_all_files_move_to_done() {
        let (_tmp, queue, done) = setup(&["b.md", "a.md", "c.md"]);
        let processor = QueueProcessor::new(&queue, &done, &["md"]);
        let mut action = RecordingAction::new();

        let report = processor.run(&mut action, false).await.unwrap();

        assert_eq!(report, QueueReport { matched: 3, processed: 3 });
        assert_eq!(fs::read_dir(&queue).unwrap().count(), 0);
        assert_eq!(fs::read_dir(&done).unwrap().count(), 3);
        // Sorted by name, not enumeration order.
        assert_eq!(action.seen, vec!["a.md", "b.md", "c.md"]);
    }

    #[tokio::test]
    async fn test_one_failure_leaves_file_queued() {
        let (_tmp, queue, done) = setup(&["a.md", "b.md", "c.md"]);
        let processor = QueueProcessor::new(&queue, &done, &["md"]);
        let mut action = RecordingAction::new();
        action.error_on = Some("b.md".to_owned());

        let report = processor.run(&mut action, false).await.unwrap();

        assert_eq!(report, QueueReport { matched: 3, processed: 2 });
        assert!(queue.join("b.md").exists());
        assert!(done.join("a.md").exists());
        assert!(done.join("c.md").exists());
    }

    #[tokio::test]
    async fn test_reported_failure_leaves_file_queued() {
        let (_tmp, queue, done) = setup(&["a.md"]);
        let processor = QueueProcessor::new(&queue, &done, &["md"]);
        let mut action = RecordingAction::new();
        action.fail_on = Some("a.md".to_owned());

        let report = processor.run(&mut action, false).await.unwrap();

        assert_eq!(report.processed, 0);
        assert!(queue.join("a.md").exists());
    }

    #[tokio::test]
    async fn test_dry_run_moves_nothing() {
        let (_tmp, queue, done) = setup(&["a.md", "b.md"]);
        let processor = QueueProcessor::new(&queue, &done, &["md"]);
        let mut action = RecordingAction::new();

        let report = processor.run(&mut action, true).await.unwrap();

        assert_eq!(report, QueueReport { matched: 2, processed: 0 });
        assert!(queue.join("a.md").exists());
        assert!(queue.join("b.md").exists());
        assert!(!done.exists());
        // Dry run never invokes the action.
        assert!(action.seen.is_empty());
    }

    #[tokio::test]
    async fn test_missing_queue_dir_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let processor = QueueProcessor::new(
            tmp.path().join("missing"),
            tmp.path().join("done"),
            &["md"],
        );
        let mut action = RecordingAction::new();

        let report = processor.run(&mut action, false).await.unwrap();
        assert_eq!(report, QueueReport::default());
    }

    #[tokio::test]
    async fn test_extension_filter() {
        let (_tmp, queue, done) = setup(&["a.md", "b.txt", "c.MD"]);
        let processor = QueueProcessor::new(&queue, &done, &["md"]);
        let mut action = RecordingAction::new();

        let report = processor.run(&mut action, false).await.unwrap();

        assert_eq!(report.matched, 2);
        assert!(queue.join("b.txt").exists());
    }

    #[tokio::test]
    async fn test_companion_moves_with_item() {
        let (_tmp, queue, done) = setup(&["event.json"]);
        let rendered = queue.join("event.mp4");
        fs::write(&rendered, b"video").unwrap();

        let processor = QueueProcessor::new(&queue, &done, &["json"]);
        let mut action = RecordingAction::new();
        action.companion = Some(rendered.clone());

        processor.run(&mut action, false).await.unwrap();

        assert!(done.join("event.json").exists());
        assert!(done.join("event.mp4").exists());
        assert!(!rendered.exists());
    }
}
