//! Inference over a whole result log.
//!
//! Every block of the log becomes exactly one [`InferenceRecord`], whatever
//! the resolution outcome. The table is written once, at the end of a run.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::record::ResultBlock;
use crate::resolve::{MatchStatus, Resolver};

/// Value written in the EAN column when nothing was inferred.
pub const NOT_FOUND: &str = "NOT FOUND";

/// Column header of the inference table.
pub const TABLE_HEADER: [&str; 5] = [
    "image",
    "extracted_product",
    "extracted_brand",
    "inferred_ean",
    "status",
];

/// How repeated blocks for the same item are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// One record per block, duplicates included.
    #[default]
    KeepAll,
    /// Only the last block per item is kept, at the position it appears.
    LastWins,
}

/// The inference result for one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceRecord {
    pub item_id: String,
    pub extracted_product: String,
    pub extracted_brand: String,
    pub inferred_ean: Option<String>,
    pub status: MatchStatus,
}

/// Apply `policy` to a block sequence, preserving log order.
pub fn dedupe_blocks(blocks: Vec<ResultBlock>, policy: DuplicatePolicy) -> Vec<ResultBlock> {
    match policy {
        DuplicatePolicy::KeepAll => blocks,
        DuplicatePolicy::LastWins => {
            let mut last: HashMap<&str, usize> = HashMap::new();
            for (i, block) in blocks.iter().enumerate() {
                last.insert(&block.item_id, i);
            }
            let keep: Vec<bool> = blocks
                .iter()
                .enumerate()
                .map(|(i, block)| last.get(block.item_id.as_str()) == Some(&i))
                .collect();

            blocks
                .into_iter()
                .zip(keep)
                .filter_map(|(block, keep)| keep.then_some(block))
                .collect()
        }
    }
}

/// Resolve every block against the catalog.
pub fn infer_blocks(
    blocks: Vec<ResultBlock>,
    catalog: &Catalog,
    resolver: &Resolver,
    policy: DuplicatePolicy,
) -> Vec<InferenceRecord> {
    let total = blocks.len();
    let blocks = dedupe_blocks(blocks, policy);
    if blocks.len() < total {
        info!("Dropped {} duplicate blocks", total - blocks.len());
    }

    blocks
        .into_iter()
        .map(|block| {
            let fields = block.fields();
            let resolution = resolver.resolve(&fields, catalog);

            InferenceRecord {
                extracted_product: fields.product().to_string(),
                extracted_brand: fields.brand().to_string(),
                item_id: block.item_id,
                inferred_ean: resolution.ean,
                status: resolution.status,
            }
        })
        .collect()
}

/// Write the inference table as CSV.
///
/// Returns `false` without touching the filesystem when `records` is empty.
pub fn write_inference_table(path: &Path, records: &[InferenceRecord]) -> Result<bool> {
    if records.is_empty() {
        warn!("No inference records, {} not written", path.display());
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(TABLE_HEADER)?;

    for record in records {
        let status = record.status.to_string();
        writer.write_record([
            record.item_id.as_str(),
            &record.extracted_product,
            &record.extracted_brand,
            record.inferred_ean.as_deref().unwrap_or(NOT_FOUND),
            &status,
        ])?;
    }

    writer.flush()?;
    info!("Wrote {} inference records to {}", records.len(), path.display());

    Ok(true)
}
