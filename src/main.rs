//! Medscan CLI
//!
//! Reads prescription images, extracts their text with OCR and corrects
//! it with a medical-aware spell checker.
//!
//! # Usage
//!
//! ```bash
//! medscan extract scans/rx-001.jpg --json
//! medscan correct "Amoxicillin 500 mq coma"
//! medscan label scans/rx-001.jpg "Amoxicillin 500 mg"
//! medscan train --images dataset/images --labels dataset/labels --epochs 1
//! ```
//!
//! Correction reads the SymSpell English frequency dictionary from
//! `MEDSCAN_DICTIONARY_PATH` (default `data/frequency_dictionary_en_82_765.txt`).

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medscan::correction::CorrectionPipeline;
use medscan::labels::{train_from_dataset, LabelCache};
use medscan::{build_lexicon, build_pipeline, Config, ExtractionService};

#[derive(Parser)]
#[command(name = "medscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Prescription OCR with medical-aware spelling correction", long_about = None)]
struct Cli {
    /// Label store path (overrides MEDSCAN_LABELS_PATH)
    #[arg(long, global = true)]
    labels_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and correct the text of an image
    Extract {
        /// Image file (jpg, png, ...)
        image: PathBuf,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Print per-token correction decisions
        #[arg(long)]
        explain: bool,
    },
    /// Correct text without OCR (reads stdin when no text is given)
    Correct {
        text: Vec<String>,

        /// Print per-token correction decisions
        #[arg(long)]
        explain: bool,
    },
    /// Record a confirmed transcription for an image path
    Label { key: String, text: String },
    /// Print the cached transcription for an image path
    Lookup { key: String },
    /// Import confirmed transcriptions from a labeled dataset
    Train {
        /// Folder of .jpg/.png images
        #[arg(long)]
        images: PathBuf,

        /// Folder of .txt labels named after the images
        #[arg(long)]
        labels: PathBuf,

        #[arg(long, default_value_t = 1)]
        epochs: u32,
    },
    /// Print the active lexicon
    Lexicon,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for results
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medscan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let mut config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    let cli = Cli::parse();
    if let Some(path) = cli.labels_path {
        config.labels.path = path;
    }

    match cli.command {
        Commands::Extract {
            image,
            json,
            explain,
        } => {
            let service = ExtractionService::from_config(&config)
                .context("Failed to initialize extraction service")?;

            if !service.engine_available().await {
                tracing::warn!(
                    binary = %config.ocr.tesseract_bin,
                    "OCR engine not available; only cached labels can be served"
                );
            }

            let extraction = service
                .extract_and_correct(&image)
                .await
                .with_context(|| format!("Failed to extract text from {}", image.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&extraction)?);
            } else {
                println!("{}", extraction.text);
            }

            if explain {
                if let Some(raw) = &extraction.raw_text {
                    print_decisions(service.pipeline(), raw);
                }
            }
        }
        Commands::Correct { text, explain } => {
            let pipeline = build_pipeline(&config.correction)
                .context("Failed to initialize correction pipeline")?;

            let input = if text.is_empty() {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Failed to read stdin")?;
                buffer
            } else {
                text.join(" ")
            };

            println!("{}", pipeline.correct(&input));
            if explain {
                print_decisions(&pipeline, &input);
            }
        }
        Commands::Label { key, text } => {
            let cache = LabelCache::open(&config.labels.path);
            cache
                .record(key.as_str(), text.trim())
                .context("Failed to record label")?;
            tracing::info!(key = %key, entries = cache.len(), "Label recorded");
        }
        Commands::Lookup { key } => {
            let cache = LabelCache::open(&config.labels.path);
            match cache.lookup(&key) {
                Some(text) => println!("{}", text),
                None => anyhow::bail!("No label recorded for {}", key),
            }
        }
        Commands::Train {
            images,
            labels,
            epochs,
        } => {
            let cache = LabelCache::open(&config.labels.path);
            let summary = train_from_dataset(&cache, &images, &labels, epochs)
                .context("Dataset labeling failed")?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Lexicon => {
            let lexicon =
                build_lexicon(&config.correction).context("Failed to load lexicon")?;

            println!("Valid terms:");
            for term in lexicon.valid_terms() {
                println!("  {}", term);
            }
            println!("OCR misreadings:");
            for (from, to) in lexicon.misreadings() {
                println!("  {} -> {}", from, to);
            }
            println!("Medicine names:");
            for name in lexicon.medicine_names() {
                println!("  {}", name);
            }
        }
    }

    Ok(())
}

/// Print one line per token: change marker, output word and the decision as JSON
fn print_decisions(pipeline: &CorrectionPipeline, text: &str) {
    for decision in pipeline.explain(text) {
        let json = serde_json::to_string(&decision).unwrap_or_default();
        let marker = if decision.is_changed() { "*" } else { " " };
        println!("{} {:<16} {}", marker, decision.word(), json);
    }
}
