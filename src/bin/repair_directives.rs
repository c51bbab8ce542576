use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use deckguard::{
    CanonStats, DeckContext, Format, GuardConfig, InMemoryCardCache, Pipeline, RepairResult,
    enforce_brackets,
};
use serde::Serialize;
use tracing::Level;

#[derive(Debug, Default)]
struct Args {
    deck_path: Option<PathBuf>,
    cards_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    data_dirs: Vec<PathBuf>,
    format: Option<Format>,
    report_path: Option<PathBuf>,
    enforce_brackets: bool,
    json_logs: bool,
    verbose: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    result: &'a RepairResult,
    needs_regeneration: bool,
    canonical: CanonStats,
}

fn usage() {
    eprintln!(
        "Usage: cargo run --features tooling --bin repair_directives -- \\
  [--deck <deck.json>] [--cards <cards.jsonl>] [--config <config.json>] [--data-dir <dir>]... \\
  [--format <commander|constructed>] [--enforce-brackets] [--report <path>] [--json-logs] [--verbose]

Reads model output on stdin and writes the repaired text to stdout."
    );
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--deck" => {
                args.deck_path = Some(PathBuf::from(
                    iter.next()
                        .ok_or_else(|| "--deck requires a value".to_string())?,
                ));
            }
            "--cards" => {
                args.cards_path = Some(PathBuf::from(
                    iter.next()
                        .ok_or_else(|| "--cards requires a value".to_string())?,
                ));
            }
            "--config" => {
                args.config_path = Some(PathBuf::from(
                    iter.next()
                        .ok_or_else(|| "--config requires a value".to_string())?,
                ));
            }
            "--data-dir" => {
                args.data_dirs.push(PathBuf::from(
                    iter.next()
                        .ok_or_else(|| "--data-dir requires a value".to_string())?,
                ));
            }
            "--format" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| "--format requires a value".to_string())?;
                args.format = Some(Format::from_key(&raw));
            }
            "--report" => {
                args.report_path = Some(PathBuf::from(
                    iter.next()
                        .ok_or_else(|| "--report requires a value".to_string())?,
                ));
            }
            "--enforce-brackets" => args.enforce_brackets = true,
            "--json-logs" => args.json_logs = true,
            "--verbose" | "-v" => args.verbose = true,
            "-h" | "--help" => {
                usage();
                std::process::exit(0);
            }
            _ => {
                return Err(format!("unknown argument '{arg}'"));
            }
        }
    }

    Ok(args)
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_deck(args: &Args) -> Result<DeckContext, Box<dyn std::error::Error>> {
    let mut deck = match &args.deck_path {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => DeckContext::default(),
    };
    if let Some(format) = args.format {
        deck.format = format;
    }
    Ok(deck)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args().map_err(io::Error::other)?;
    init_logging(&args);

    let mut config = match &args.config_path {
        Some(path) => GuardConfig::from_path(path)?,
        None => GuardConfig::default(),
    };
    if !args.data_dirs.is_empty() {
        config.canon.data_dirs = args.data_dirs.clone();
    }

    let cache = match &args.cards_path {
        Some(path) => InMemoryCardCache::from_jsonl_path(path)?,
        None => InMemoryCardCache::new(),
    };
    tracing::debug!(cards = cache.len(), "card cache ready");

    let deck = load_deck(&args)?;

    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    if args.enforce_brackets {
        input = enforce_brackets(&input);
    }

    let pipeline = Pipeline::new(&config, Arc::new(cache));
    let result = pipeline.apply_all(&input, &deck);
    if result.needs_regeneration() {
        tracing::warn!(
            remaining = result.blocks_remaining,
            parsed = result.directives_parsed,
            "too few recommendations survived; regeneration advised"
        );
    }

    let report = Report {
        result: &result,
        needs_regeneration: result.needs_regeneration(),
        canonical: pipeline.validator().canonicalizer().stats(),
    };
    let report_json = serde_json::to_string_pretty(&report)?;
    match &args.report_path {
        Some(path) => fs::write(path, report_json)?,
        None => eprintln!("{report_json}"),
    }

    let mut stdout = io::stdout().lock();
    stdout.write_all(result.repaired_text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
