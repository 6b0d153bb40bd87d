//! Core library for price-tag EAN inference.
//!
//! This crate provides:
//! - Result log reading and writing, and field extraction from model output
//! - Reference catalog loading
//! - Tiered EAN resolution (exact barcode, then fuzzy brand + product)
//! - A resumable, checkpointed batch driver over image directories

pub mod batch;
pub mod catalog;
pub mod config;
pub mod error;
pub mod infer;
pub mod record;
pub mod resolve;

pub use batch::{BatchDriver, BatchObserver, BatchReport, Checkpoint, Extractor, ResumeFrom, WorkItem};
pub use catalog::{Catalog, CatalogEntry};
pub use config::TagConfig;
pub use error::{BatchError, CatalogError, LogError, Result, TagError};
pub use infer::{infer_blocks, write_inference_table, DuplicatePolicy, InferenceRecord};
pub use record::{extract_fields, split_log, ExtractedFields, ResultBlock, ResultLog};
pub use resolve::{MatchStatus, Resolution, Resolver};
