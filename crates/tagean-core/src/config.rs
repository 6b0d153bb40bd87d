//! Configuration for extraction and inference runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::batch::DEFAULT_IMAGE_EXTENSIONS;
use crate::error::{Result, TagError};
use crate::infer::DuplicatePolicy;
use crate::resolve::{SimilarityMetric, DEFAULT_THRESHOLD};

/// Environment variables that override file values.
pub const ENV_RESULTS_FILE: &str = "RESULTS_FILE";
pub const ENV_CATALOG_FILE: &str = "CSV_DATABASE_FILE";
pub const ENV_INFERENCE_OUTPUT: &str = "INFERENCE_OUTPUT_FILE";
pub const ENV_FUZZY_THRESHOLD: &str = "FUZZY_THRESHOLD";
pub const ENV_CHECKPOINT_FILE: &str = "CHECKPOINT_FILE";
pub const ENV_IMAGES_DIR: &str = "IMAGES_DIR";
pub const ENV_OLLAMA_URL: &str = "OLLAMA_URL";
pub const ENV_OLLAMA_MODEL: &str = "OLLAMA_MODEL";

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    /// File and directory locations.
    pub paths: PathsConfig,

    /// EAN resolution settings.
    pub matching: MatchingConfig,

    /// Batch driver settings.
    pub batch: BatchConfig,

    /// Extraction model endpoint.
    pub extractor: ExtractorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Append-only result log.
    pub results_log: PathBuf,

    /// Reference catalog CSV.
    pub catalog: PathBuf,

    /// Inference table written by `infer`.
    pub inference_output: PathBuf,

    /// Last completed item of the batch driver.
    pub checkpoint: PathBuf,

    /// Directory scanned for images.
    pub images_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            results_log: PathBuf::from("data/resultados.txt"),
            catalog: PathBuf::from("data/produtos.csv"),
            inference_output: PathBuf::from("data/inferencia_ean.csv"),
            checkpoint: PathBuf::from("data/progresso.txt"),
            images_dir: PathBuf::from("data/imagens"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum fuzzy score (0-100) to accept a match.
    pub fuzzy_threshold: u8,

    /// Treatment of repeated blocks for the same image.
    pub duplicate_policy: DuplicatePolicy,

    /// Similarity metric for the fuzzy tier.
    pub metric: SimilarityMetric,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_THRESHOLD,
            duplicate_policy: DuplicatePolicy::default(),
            metric: SimilarityMetric::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Pause between images, in milliseconds.
    pub item_delay_ms: u64,

    /// Recognized image extensions, case-insensitive.
    pub image_extensions: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            item_delay_ms: 2000,
            image_extensions: DEFAULT_IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Ollama generate endpoint.
    pub url: String,

    /// Vision model name.
    pub model: String,

    /// Prompt sent with every image.
    pub prompt: String,

    /// Request timeout in seconds (0 = none).
    pub timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434/api/generate".to_string(),
            model: "gemma3:4b".to_string(),
            prompt: "Extraia a produto, marca preço e unidade a partir desse cartaz de promoção da imagem."
                .to_string(),
            timeout_secs: 120,
        }
    }
}

impl TagConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| TagError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| TagError::Config(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = |key: &str| lookup(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);

        if let Some(p) = path(ENV_RESULTS_FILE) {
            self.paths.results_log = p;
        }
        if let Some(p) = path(ENV_CATALOG_FILE) {
            self.paths.catalog = p;
        }
        if let Some(p) = path(ENV_INFERENCE_OUTPUT) {
            self.paths.inference_output = p;
        }
        if let Some(p) = path(ENV_CHECKPOINT_FILE) {
            self.paths.checkpoint = p;
        }
        if let Some(p) = path(ENV_IMAGES_DIR) {
            self.paths.images_dir = p;
        }
        if let Some(url) = lookup(ENV_OLLAMA_URL) {
            self.extractor.url = url;
        }
        if let Some(model) = lookup(ENV_OLLAMA_MODEL) {
            self.extractor.model = model;
        }
        if let Some(value) = lookup(ENV_FUZZY_THRESHOLD) {
            self.matching.fuzzy_threshold = parse_threshold(&value)?;
        }

        self.validate()
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.matching.fuzzy_threshold > 100 {
            return Err(TagError::Config(format!(
                "fuzzy_threshold must be between 0 and 100, got {}",
                self.matching.fuzzy_threshold
            )));
        }
        Ok(())
    }

    /// Look up a value by dotted key, e.g. `matching.fuzzy_threshold`.
    pub fn get(&self, key: &str) -> Result<serde_json::Value> {
        let value = serde_json::to_value(self).map_err(|e| TagError::Config(e.to_string()))?;
        key.split('.')
            .try_fold(&value, |node, part| node.get(part))
            .cloned()
            .ok_or_else(|| TagError::Config(format!("unknown key: {}", key)))
    }

    /// Set a value by dotted key. `raw` is parsed as JSON, falling back to
    /// a plain string.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let mut value = serde_json::to_value(&*self).map_err(|e| TagError::Config(e.to_string()))?;

        let slot = key
            .split('.')
            .try_fold(&mut value, |node, part| node.get_mut(part))
            .ok_or_else(|| TagError::Config(format!("unknown key: {}", key)))?;
        *slot = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));

        let updated: Self = serde_json::from_value(value)
            .map_err(|e| TagError::Config(format!("invalid value for {}: {}", key, e)))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

/// Parse a fuzzy threshold, accepting only integers in 0..=100.
pub fn parse_threshold(value: &str) -> Result<u8> {
    value
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|t| *t <= 100)
        .ok_or_else(|| TagError::Config(format!("invalid fuzzy threshold '{}', expected 0-100", value)))
}
