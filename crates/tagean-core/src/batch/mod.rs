//! Resumable batch processing of images.
//!
//! The driver walks an ordered image sequence, asks the extraction
//! collaborator for a description of each image, appends the result to the
//! log and checkpoints the item before moving on. Items are processed one
//! at a time; a crash loses at most the in-flight item.

mod checkpoint;
mod work_item;

pub use checkpoint::Checkpoint;
pub use work_item::{enumerate_work_items, WorkItem, DEFAULT_IMAGE_EXTENSIONS};

use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::BatchError;
use crate::record::{ResultBlock, ResultLog};

/// Result type for batch operations.
pub type Result<T> = std::result::Result<T, BatchError>;

/// Default pause between items.
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_secs(2);

/// The extraction collaborator.
///
/// Implementations never fail: a failed call returns text describing the
/// failure, which is logged like any other result.
pub trait Extractor {
    /// Describe the image in free text.
    fn extract(&self, image: &[u8]) -> String;
}

impl<F> Extractor for F
where
    F: Fn(&[u8]) -> String,
{
    fn extract(&self, image: &[u8]) -> String {
        self(image)
    }
}

/// Where a run starts in the item sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResumeFrom {
    /// Process every item.
    #[default]
    Start,
    /// Start at this item, inclusive.
    At(String),
    /// Start right after this item, which is already complete.
    After(String),
}

impl ResumeFrom {
    /// Resume after the checkpointed item, or from the start if none.
    pub fn from_checkpoint(checkpoint: &Checkpoint) -> Result<Self> {
        Ok(match checkpoint.load()? {
            Some(id) => ResumeFrom::After(id),
            None => ResumeFrom::Start,
        })
    }

    /// Index of the first item to process.
    ///
    /// A resume id missing from `items` is an error rather than a silent
    /// skip of the whole sequence.
    pub fn start_index(&self, items: &[WorkItem]) -> Result<usize> {
        let position = |id: &str| {
            items
                .iter()
                .position(|item| item.id == id)
                .ok_or_else(|| BatchError::ResumePointNotFound(id.to_string()))
        };

        match self {
            ResumeFrom::Start => Ok(0),
            ResumeFrom::At(id) => position(id),
            ResumeFrom::After(id) => position(id).map(|i| i + 1),
        }
    }
}

/// Progress callbacks for a batch run.
pub trait BatchObserver {
    /// Item skipped because it precedes the resume point.
    fn skipped(&mut self, _item: &WorkItem) {}

    /// Extraction for the item is about to start.
    fn started(&mut self, _item: &WorkItem) {}

    /// Item appended to the log and checkpointed.
    fn completed(&mut self, _item: &WorkItem, _raw_text: &str) {}
}

impl BatchObserver for () {}

/// Summary of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Ids of processed items, in order.
    pub processed: Vec<String>,
    /// Number of items skipped before the resume point.
    pub skipped: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Sequential batch driver.
pub struct BatchDriver {
    log: ResultLog,
    checkpoint: Checkpoint,
    resume: ResumeFrom,
    item_delay: Duration,
}

impl BatchDriver {
    /// Create a driver appending to `log` and checkpointing to `checkpoint`.
    pub fn new(log: ResultLog, checkpoint: Checkpoint) -> Self {
        Self {
            log,
            checkpoint,
            resume: ResumeFrom::Start,
            item_delay: DEFAULT_ITEM_DELAY,
        }
    }

    /// Set the resume point.
    pub fn with_resume(mut self, resume: ResumeFrom) -> Self {
        self.resume = resume;
        self
    }

    /// Set the pause between items.
    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    pub fn log(&self) -> &ResultLog {
        &self.log
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// Process `items` in order, starting at the configured resume point.
    pub fn run<E, O>(&self, items: &[WorkItem], extractor: &E, observer: &mut O) -> Result<BatchReport>
    where
        E: Extractor + ?Sized,
        O: BatchObserver + ?Sized,
    {
        let started_at = Utc::now();
        let start = self.resume.start_index(items)?;

        for item in &items[..start] {
            debug!("Skipping {}", item.id);
            observer.skipped(item);
        }

        if start > 0 {
            info!("Resuming at item {} of {}", start + 1, items.len());
        }

        let mut processed = Vec::with_capacity(items.len() - start);
        for (n, item) in items[start..].iter().enumerate() {
            if n > 0 && !self.item_delay.is_zero() {
                thread::sleep(self.item_delay);
            }

            observer.started(item);
            info!("Processing {}", item.id);

            let raw_text = match item.read() {
                Ok(bytes) => extractor.extract(&bytes),
                Err(e) => {
                    warn!("Failed to read {}: {}", item.path.display(), e);
                    format!("Failed to read image {}: {}", item.path.display(), e)
                }
            };

            self.log.append(&ResultBlock::new(item.id.clone(), raw_text.clone()))?;
            self.checkpoint.save(&item.id)?;

            observer.completed(item, &raw_text);
            processed.push(item.id.clone());
        }

        Ok(BatchReport {
            processed,
            skipped: start,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
