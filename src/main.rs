use anyhow::{Context, Result};
use clap::Parser;
use rhetorica_lib::services::config_store::load_config;
use rhetorica_lib::services::scoring::Analyzer;
use rhetorica_lib::services::text_processor::normalize_punctuation;
use rhetorica_lib::{init_logging, LoggingOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Rhetorica - Ethos / Logos / Pathos scoring of a text
#[derive(Parser, Debug)]
#[command(name = "rhetorica", version)]
#[command(after_help = "\
Examples:
  rhetorica                                   Score default.txt against itself
  rhetorica essay.txt -o scores.json          Write scores to scores.json
  rhetorica claim.txt --source article.txt    Check a claim against an article
  rhetorica essay.txt --sentencewise          Per-sentence breakdown")]
struct Cli {
    /// Candidate text file
    #[arg(default_value = "default.txt")]
    input: PathBuf,

    /// Where to write the result document
    #[arg(short, long, default_value = "output.txt")]
    output: PathBuf,

    /// Source text file (defaults to the input itself)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Score every candidate sentence and average them
    #[arg(long)]
    sentencewise: bool,

    /// Config file (default: <config dir>/rhetorica/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pairing mode for Logos (adjacent, full); overrides the config file
    #[arg(long)]
    mode: Option<String>,

    /// Skip knowledge enrichment
    #[arg(long)]
    no_enrich: bool,
}

fn read_text(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(normalize_punctuation(&raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LoggingOptions {
        stderr: true,
        ..LoggingOptions::default()
    });

    let mut config = load_config(cli.config.as_deref()).context("failed to load config")?;
    if let Some(mode) = cli.mode.as_deref() {
        config.analysis.pairing_mode = mode.parse()?;
    }
    if cli.no_enrich {
        config.enrichment.enabled = false;
    }

    let candidate = read_text(&cli.input)?;
    let source = match cli.source.as_ref() {
        Some(path) => read_text(path)?,
        None => candidate.clone(),
    };

    let analyzer = Analyzer::from_config(&config)?;
    info!(
        input = %cli.input.display(),
        sentencewise = cli.sentencewise,
        "cli.analyze"
    );

    let document = if cli.sentencewise {
        serde_json::to_string_pretty(&analyzer.analyze_text_sentencewise(&source, &candidate).await?)?
    } else {
        serde_json::to_string_pretty(&analyzer.analyze_text(&source, &candidate).await?)?
    };

    fs::write(&cli.output, &document)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    println!("{}", document);
    Ok(())
}
