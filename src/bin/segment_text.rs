use anyhow::{Context, Result};
use clap::Parser;
use rhetorica_lib::models::{PairingMode, SentencePair};
use rhetorica_lib::services::config_store::load_config;
use rhetorica_lib::services::enrichment::{enrich_text, ConceptNetClient};
use rhetorica_lib::services::premise_pairs::{adaptive_merge_units, generate_sentence_pairs};
use rhetorica_lib::services::sentence_segmenter::{
    SentenceSegmenter, TextSegmenterClient, DEFAULT_SEGMENTER_URL,
};
use rhetorica_lib::services::text_processor::{normalize_punctuation, split_logic_units};
use rhetorica_lib::{init_logging, LoggingOptions};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Show how a text is segmented, merged and paired before scoring
#[derive(Parser, Debug)]
#[command(name = "segment_text")]
struct Args {
    /// Text file to inspect
    path: PathBuf,

    /// Pairing mode (adjacent, full)
    #[arg(long, default_value = "full")]
    mode: String,

    /// Append knowledge-lookup facts before merging
    #[arg(long)]
    enrich: bool,

    /// Max sentences to print
    #[arg(long, default_value_t = 50)]
    sentences: usize,

    /// Max pairs to print
    #[arg(long, default_value_t = 20)]
    pairs: usize,

    /// Use a sentence boundary service (bare flag: local default URL)
    #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_SEGMENTER_URL)]
    segmenter: Option<String>,

    /// Config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the result as JSON
    #[arg(long)]
    out: Option<PathBuf>,
}

fn preview(s: &str, max_chars: usize) -> String {
    let mut out: String = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        out.push_str("...");
    }
    out.replace('\n', " ")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    file: String,
    mode: PairingMode,
    enriched: bool,
    sentences: Vec<String>,
    logic_units: Vec<UnitOut>,
    pairs: Vec<SentencePair>,
}

#[derive(Serialize)]
struct UnitOut {
    text: String,
    kind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&LoggingOptions {
        console_only: true,
        stderr: true,
        ..LoggingOptions::default()
    });

    let mode: PairingMode = args.mode.parse()?;
    let config = load_config(args.config.as_deref()).context("failed to load config")?;

    let raw = std::fs::read_to_string(&args.path)
        .with_context(|| format!("read file failed: {}", args.path.display()))?;
    let text = normalize_punctuation(&raw);

    let (segmenter, service_status) = match args.segmenter.as_deref() {
        Some(url) => {
            let client = TextSegmenterClient::new(url, Duration::from_secs(config.segmenter.timeout_secs));
            let status = if client.is_available().await { "available" } else { "unreachable" };
            let status = format!("{} ({})", client.base_url(), status);
            (SentenceSegmenter::with_service(client), status)
        }
        None => {
            let segmenter = SentenceSegmenter::from_config(&config.segmenter);
            let status = if segmenter.has_service() { "configured" } else { "off" };
            (segmenter, status.to_string())
        }
    };
    let sentences = segmenter.segment(&text).await;

    let logic_text = if args.enrich {
        let client = ConceptNetClient::from_config(&config.enrichment);
        enrich_text(&text, &client, config.enrichment.limit_per_noun).await
    } else {
        text.clone()
    };
    let units = adaptive_merge_units(&split_logic_units(&logic_text));
    let unit_texts: Vec<&str> = units.iter().map(|u| u.text.as_str()).collect();
    let pairs = generate_sentence_pairs(&unit_texts, mode);

    println!("File: {}", args.path.display());
    println!("Chars: {}", text.chars().count());
    println!("Segmenter service: {}", service_status);
    println!("Enrichment: {}", if args.enrich { "on" } else { "off" });
    println!("Mode: {}", mode);
    println!();

    println!("Sentences: {}", sentences.len());
    for (i, s) in sentences.iter().take(args.sentences).enumerate() {
        println!("[S{:04}] chars={}  {}", i, s.chars().count(), preview(s, 120));
    }
    if sentences.len() > args.sentences {
        println!("... ({} more sentences)", sentences.len() - args.sentences);
    }
    println!();

    println!("Logic units: {}", units.len());
    for (i, u) in units.iter().enumerate() {
        println!("[U{:04}] {:<11}  {}", i, format!("{:?}", u.kind), preview(&u.text, 140));
    }
    println!();

    println!("Pairs: {}", pairs.len());
    for (i, p) in pairs.iter().take(args.pairs).enumerate() {
        println!("[P{:04}] {}  =>  {}", i, preview(&p.premise, 60), preview(&p.hypothesis, 60));
    }
    if pairs.len() > args.pairs {
        println!("... ({} more pairs)", pairs.len() - args.pairs);
    }

    if let Some(out_path) = args.out {
        let out = Output {
            file: args.path.display().to_string(),
            mode,
            enriched: args.enrich,
            sentences,
            logic_units: units
                .iter()
                .map(|u| UnitOut {
                    text: u.text.clone(),
                    kind: format!("{:?}", u.kind).to_lowercase(),
                })
                .collect(),
            pairs,
        };
        let json = serde_json::to_string_pretty(&out)?;
        std::fs::write(&out_path, json)
            .with_context(|| format!("write out failed: {}", out_path.display()))?;
        println!();
        println!("Wrote JSON: {}", out_path.display());
    }

    Ok(())
}
