//! Result log records.
//!
//! The result log is an append-only text file holding one block per
//! processed image:
//!
//! ```text
//! Imagem: <item id>
//! <raw text, one or more lines>
//! ========================================
//! ```
//!
//! The last block may lack its terminator when a run stopped mid-append.

mod fields;
mod patterns;
mod price;

pub use fields::{
    extract_fields, normalize_key, ExtractedFields, BARCODE_KEY, BRAND_KEY, PRICE_KEYS,
    PRODUCT_KEY,
};
pub use price::parse_brl_amount;

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::LogError;

/// Result type for result log operations.
pub type Result<T> = std::result::Result<T, LogError>;

/// Prefix of the line that opens a block.
pub const ITEM_PREFIX: &str = "Imagem: ";

/// Line that terminates a block.
pub const BLOCK_TERMINATOR: &str = "========================================";

/// Preamble lines the model tends to emit before the actual fields.
pub const NOISE_PREFIXES: [&str; 1] = ["Aqui estão as informações"];

/// One delimited record of the result log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultBlock {
    /// Identifier of the processed image.
    pub item_id: String,
    /// Raw text returned for the image.
    pub raw_text: String,
}

impl ResultBlock {
    pub fn new(item_id: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            raw_text: raw_text.into(),
        }
    }

    /// Render this block in log format, terminator included.
    pub fn to_log_entry(&self) -> String {
        format!(
            "{}{}\n{}\n{}\n",
            ITEM_PREFIX, self.item_id, self.raw_text, BLOCK_TERMINATOR
        )
    }

    /// Parse this block's raw text into fields.
    pub fn fields(&self) -> ExtractedFields {
        extract_fields(&self.raw_text)
    }
}

/// Incremental block splitter.
///
/// Feed lines in order with [`BlockSplitter::push_line`] and call
/// [`BlockSplitter::finish`] at end of input.
#[derive(Debug, Default)]
pub struct BlockSplitter {
    current: Option<(String, Vec<String>)>,
    blocks: Vec<ResultBlock>,
}

impl BlockSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one line of the log.
    pub fn push_line(&mut self, line: &str) {
        let line = line.trim();

        if let Some(item_id) = line.strip_prefix(ITEM_PREFIX) {
            self.close();
            self.current = Some((item_id.trim().to_string(), Vec::new()));
        } else if line == BLOCK_TERMINATOR {
            self.close();
        } else if let Some((_, body)) = self.current.as_mut() {
            if !line.is_empty() && !is_noise(line) {
                body.push(line.to_string());
            }
        }
    }

    /// Flush the trailing block, terminated or not, and return all blocks.
    pub fn finish(mut self) -> Vec<ResultBlock> {
        self.close();
        self.blocks
    }

    fn close(&mut self) {
        if let Some((item_id, body)) = self.current.take() {
            if body.is_empty() {
                debug!("Dropping empty block for '{}'", item_id);
            } else {
                self.blocks.push(ResultBlock::new(item_id, body.join("\n")));
            }
        }
    }
}

fn is_noise(line: &str) -> bool {
    NOISE_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

/// Split a whole result log into blocks.
///
/// Lines outside any block are discarded, as are empty and noise lines
/// inside a block. Blocks without body lines are dropped. Item ids are not
/// assumed to be unique.
pub fn split_log(text: &str) -> Vec<ResultBlock> {
    let mut splitter = BlockSplitter::new();
    for line in text.lines() {
        splitter.push_line(line);
    }
    splitter.finish()
}

/// Append-only result log file.
#[derive(Debug, Clone)]
pub struct ResultLog {
    path: PathBuf,
}

impl ResultLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one block, creating the file if needed.
    pub fn append(&self, block: &ResultBlock) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.write_all(block.to_log_entry().as_bytes())?;
        file.flush()?;

        debug!("Appended block for '{}' to {}", block.item_id, self.path.display());
        Ok(())
    }

    /// Read and split the whole log.
    pub fn read(&self) -> Result<Vec<ResultBlock>> {
        let file = File::open(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LogError::NotFound(self.path.clone()),
            _ => LogError::Io(e),
        })?;

        let mut splitter = BlockSplitter::new();
        for line in BufReader::new(file).lines() {
            splitter.push_line(&line?);
        }

        Ok(splitter.finish())
    }
}
