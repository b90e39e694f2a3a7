//! nerpipe CLI - Batch entity extraction pipelines
//!
//! Usage:
//!   nerpipe llm --input ner.csv
//!   nerpipe transformer --input ner.csv
//!   nerpipe statistical --input ner.csv
//!   nerpipe report --db ner_entities.db

mod pipeline;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nerpipe_core::{AppConfig, Pipeline};
use nerpipe_extractor::{
    EntityBackend, LlmExtractor, StatisticalExtractor, TransformerExtractor,
};
use nerpipe_llm::create_chat_client;
use nerpipe_store::EntityStore;

#[derive(Parser)]
#[command(name = "nerpipe")]
#[command(about = "Batch named-entity extraction over a sentence dataset")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract entities with a chat-completion model prompted for JSON
    Llm(RunArgs),
    /// Extract entities with a hosted token-classification model
    Transformer(RunArgs),
    /// Extract entities with the in-process statistical recognizer
    Statistical(RunArgs),
    /// Print frequency analytics for an existing database
    Report {
        /// Database file to report on
        #[arg(long)]
        db: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Input CSV path (identifier, sentence, pos, gold tag; no header)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output database file
    #[arg(long)]
    db: Option<PathBuf>,

    /// Process at most this many sentences
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    if config.logging.json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Commands::Llm(args) => {
            let client = create_chat_client(&config.llm)?;
            let backend = LlmExtractor::new(client);
            run_pipeline(Pipeline::Llm, &backend, &config, &args).await?;
        }
        Commands::Transformer(args) => {
            let backend = TransformerExtractor::from_config(&config.transformer);
            run_pipeline(Pipeline::Transformer, &backend, &config, &args).await?;
        }
        Commands::Statistical(args) => {
            let backend = StatisticalExtractor::new();
            run_pipeline(Pipeline::Statistical, &backend, &config, &args).await?;
        }
        Commands::Report { db } => {
            let store = EntityStore::open_existing(&db).await?;
            pipeline::print_report(&store).await?;
        }
    }

    Ok(())
}

/// Run one pipeline end to end: load, extract, persist, report
async fn run_pipeline(
    kind: Pipeline,
    backend: &dyn EntityBackend,
    config: &AppConfig,
    args: &RunArgs,
) -> anyhow::Result<()> {
    let input = args
        .input
        .clone()
        .unwrap_or_else(|| config.dataset.path.clone());

    let mut sentences = nerpipe_dataset::load_sentences(&input)?;
    if let Some(limit) = args.limit {
        sentences.truncate(limit);
    }
    println!("Loaded {} unique sentences", sentences.len());

    let (records, summary) = pipeline::run_extraction(backend, &sentences).await?;
    println!("Extracted {} entities", records.len());
    if summary.malformed > 0 || summary.empty > 0 {
        println!(
            "({} sentences empty, {} skipped on malformed model output)",
            summary.empty, summary.malformed
        );
    }

    pipeline::print_sample(&records, 5);

    let db_path = args
        .db
        .clone()
        .or_else(|| config.store.db_path.clone())
        .unwrap_or_else(|| PathBuf::from(kind.default_db_path()));

    let store = EntityStore::open(&db_path, kind.has_confidence_column()).await?;
    store.append(&records).await?;
    println!("\nEntities saved to {}", db_path.display());

    // Only the transformer and statistical pipelines report analytics
    if kind != Pipeline::Llm {
        pipeline::print_report(&store).await?;
    }

    Ok(())
}
