//! Extract command - run the vision model over an image directory.

use std::path::PathBuf;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Local;
use clap::Args;
use console::style;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use tagean_core::batch::{enumerate_work_items, BatchDriver, BatchObserver, Checkpoint, Extractor, ResumeFrom, WorkItem};
use tagean_core::config::ExtractorConfig;
use tagean_core::ResultLog;

use super::load_config;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Directory containing the images
    #[arg(short, long)]
    images_dir: Option<PathBuf>,

    /// Result log to append to
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Start at this image (inclusive)
    #[arg(long, conflicts_with = "resume")]
    start_at: Option<String>,

    /// Continue after the last checkpointed image
    #[arg(long)]
    resume: bool,

    /// Discard the checkpoint and start over
    #[arg(long, conflicts_with_all = ["resume", "start_at"])]
    restart: bool,

    /// Pause between images, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let images_dir = args.images_dir.unwrap_or(config.paths.images_dir);
    let log = ResultLog::new(args.log.unwrap_or(config.paths.results_log));
    let checkpoint = Checkpoint::new(config.paths.checkpoint);
    let delay = Duration::from_millis(args.delay_ms.unwrap_or(config.batch.item_delay_ms));

    if args.restart {
        checkpoint.clear()?;
        info!("Cleared checkpoint {}", checkpoint.path().display());
    }

    let items = enumerate_work_items(&images_dir, &config.batch.image_extensions)?;
    println!(
        "{} Found {} images in {}",
        style("ℹ").blue(),
        items.len(),
        images_dir.display()
    );

    let resume = match (args.start_at, args.resume) {
        (Some(id), _) => ResumeFrom::At(id),
        (None, true) => ResumeFrom::from_checkpoint(&checkpoint)?,
        (None, false) => ResumeFrom::Start,
    };
    // Fail on an unknown resume point before the model is contacted.
    let start = resume.start_index(&items)?;

    let extractor = OllamaExtractor::new(&config.extractor, Handle::current())?;
    let driver = BatchDriver::new(log, checkpoint)
        .with_resume(resume)
        .with_item_delay(delay);

    let pb = ProgressBar::new(items.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );
    pb.set_position(start as u64);

    let mut observer = ProgressObserver { pb: pb.clone() };
    let report = tokio::task::spawn_blocking(move || {
        driver.run(&items, &extractor, &mut observer)
    })
    .await??;

    pb.finish_with_message("Complete");

    println!();
    println!(
        "{} Processed {} images in {}s (started {})",
        style("✓").green(),
        report.processed.len(),
        (report.finished_at - report.started_at).num_seconds(),
        report.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    if report.skipped > 0 {
        println!("   {} skipped before the resume point", style(report.skipped).yellow());
    }

    Ok(())
}

struct ProgressObserver {
    pb: ProgressBar,
}

impl BatchObserver for ProgressObserver {
    fn started(&mut self, item: &WorkItem) {
        self.pb.set_message(item.id.clone());
    }

    fn completed(&mut self, _item: &WorkItem, _raw_text: &str) {
        self.pb.inc(1);
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: [String; 1],
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

/// Extraction through an Ollama `/api/generate` endpoint.
///
/// Called from a blocking thread; requests run on the captured runtime.
pub struct OllamaExtractor {
    client: reqwest::Client,
    url: String,
    model: String,
    prompt: String,
    runtime: Handle,
}

impl OllamaExtractor {
    pub fn new(config: &ExtractorConfig, runtime: Handle) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(concat!("tagean/", env!("CARGO_PKG_VERSION")));
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }

        Ok(Self {
            client: builder.build()?,
            url: config.url.clone(),
            model: config.model.clone(),
            prompt: config.prompt.clone(),
            runtime,
        })
    }

    async fn generate(&self, image: &[u8]) -> anyhow::Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: &self.prompt,
            images: [BASE64.encode(image)],
            stream: true,
        };

        let response = self.client.post(&self.url).json(&request).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {}", response.status());
        }

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();
        let mut text = String::new();

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if collect_chunk(&line, &mut text)? {
                    return Ok(text);
                }
            }
        }
        collect_chunk(&buffer, &mut text)?;

        Ok(text)
    }
}

/// Append one NDJSON line's token to `text`. Returns whether it was the last.
fn collect_chunk(line: &[u8], text: &mut String) -> anyhow::Result<bool> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(false);
    }
    let chunk: GenerateChunk = serde_json::from_slice(line)?;
    text.push_str(&chunk.response);
    Ok(chunk.done)
}

impl Extractor for OllamaExtractor {
    fn extract(&self, image: &[u8]) -> String {
        debug!("Sending {} bytes to {}", image.len(), self.url);
        match self.runtime.block_on(self.generate(image)) {
            Ok(text) => {
                info!("Received {} characters from {}", text.len(), self.model);
                text
            }
            Err(e) => {
                warn!("Extraction failed: {}", e);
                format!("Error communicating with the model: {}", e)
            }
        }
    }
}
