//! Filesystem work queue module.
//!
//! Declarative work-item files (posts, stories, ad campaigns) live in a
//! queue directory and move to a done directory once their remote action
//! succeeded.

mod front_matter;
mod processor;

pub use front_matter::{Document, PostMeta};
pub use processor::{
    ActionOutcome, Preview, QueueAction, QueueError, QueueProcessor, QueueReport, WorkItem,
};
