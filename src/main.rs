use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use es_notebook::config::{self, Settings};
use es_notebook::db::SqliteStorage;
use es_notebook::domain::{Attempt, Candidate, ItemType};
use es_notebook::error::{Error, Result};
use es_notebook::srs::shuffle_for_variety;
use es_notebook::store::snapshot::bucket_key;
use es_notebook::KnowledgeStore;

/// Adaptive review scheduling for Spanish vocabulary, grammar and sentences
#[derive(Debug, Parser)]
#[command(name = "es_notebook", version, about)]
struct Cli {
  /// Database file (overrides config.toml and ES_NOTEBOOK_DB)
  #[arg(long, global = true)]
  db: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Record one answer and print the updated item state
  Record(RecordArgs),
  /// Rank candidates and print the next practice session
  Plan(PlanArgs),
  /// Print per-type progress and learning insights
  Summary,
  /// Forget every tracked item
  Reset {
    /// Required to actually delete data
    #[arg(long)]
    yes: bool,
  },
  /// Import items saved by the first-generation tracker
  Migrate,
}

#[derive(Debug, Args)]
struct RecordArgs {
  #[arg(long = "type", value_parser = parse_item_type)]
  item_type: ItemType,
  #[arg(long)]
  id: String,
  /// The answer was wrong (default: correct)
  #[arg(long)]
  incorrect: bool,
  #[arg(long)]
  latency_ms: Option<f64>,
  #[arg(long)]
  error_type: Option<String>,
  #[arg(long = "tag")]
  tags: Vec<String>,
}

#[derive(Debug, Args)]
struct PlanArgs {
  #[arg(long = "type", value_parser = parse_item_type)]
  item_type: ItemType,
  /// JSON array of candidates (`{"id": .., "category": ..}`), `-` for stdin
  #[arg(long)]
  candidates: PathBuf,
  /// Session size (default from config)
  #[arg(long)]
  count: Option<usize>,
  /// Only consider new or due items
  #[arg(long)]
  due_only: bool,
  /// Shuffle the selected session; a seed makes the order reproducible
  #[arg(long)]
  shuffle: bool,
  #[arg(long, requires = "shuffle")]
  seed: Option<u64>,
}

fn parse_item_type(s: &str) -> std::result::Result<ItemType, String> {
  ItemType::from_str(s).ok_or_else(|| format!("unknown item type '{}' (vocabulary, grammar, sentence)", s))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  let mut out = io::stdout().lock();
  serde_json::to_writer_pretty(&mut out, value)?;
  writeln!(out)?;
  Ok(())
}

fn read_candidates(path: &Path) -> Result<Vec<Candidate>> {
  let mut raw = String::new();
  if path.as_os_str() == "-" {
    io::stdin().read_to_string(&mut raw)?;
  } else {
    BufReader::new(File::open(path)?).read_to_string(&mut raw)?;
  }
  let candidates: Vec<Candidate> = serde_json::from_str(&raw)?;
  let missing = candidates.iter().filter(|c| c.id.trim().is_empty()).count();
  if missing > 0 {
    tracing::warn!(missing, "Ignoring candidates without an id");
  }
  Ok(candidates.into_iter().filter(|c| !c.id.trim().is_empty()).collect())
}

fn open_store(settings: &Settings) -> Result<(SqliteStorage, KnowledgeStore)> {
  let storage = SqliteStorage::open(&settings.database_path)?;
  let mut store = KnowledgeStore::new(settings.tracker);
  let report = store.load_from(&storage)?;
  if !report.is_clean() {
    tracing::warn!(
      skipped = report.skipped,
      malformed = report.malformed_buckets.len(),
      "Some saved knowledge could not be read"
    );
  }
  Ok((storage, store))
}

fn run(cli: Cli) -> Result<()> {
  let mut settings = config::load_settings();
  if let Some(db) = cli.db {
    settings.database_path = db;
  }
  let (storage, mut store) = open_store(&settings)?;
  let now = Utc::now();

  match cli.command {
    Command::Record(args) => {
      let mut attempt = Attempt::new(!args.incorrect, args.latency_ms);
      if let Some(error_type) = args.error_type {
        attempt = attempt.with_error_type(error_type);
      }
      for tag in args.tags {
        attempt = attempt.with_tag(tag);
      }
      let state = store.record_attempt(args.item_type, &args.id, &attempt, now).clone();
      store.save_to(&storage)?;
      print_json(&state)?;
    }
    Command::Plan(args) => {
      let candidates = read_candidates(&args.candidates)?;
      let pool: Vec<Candidate> = if args.due_only {
        store
          .items_due_for_review(args.item_type, &candidates, now)
          .into_iter()
          .cloned()
          .collect()
      } else {
        candidates
      };
      let count = args.count.unwrap_or(store.config().session.default_session_size);
      let mut session = store.plan_session(args.item_type, &pool, count, now);
      if args.shuffle {
        match args.seed {
          Some(seed) => shuffle_for_variety(&mut session, &mut ChaCha8Rng::seed_from_u64(seed)),
          None => shuffle_for_variety(&mut session, &mut rand::rng()),
        }
      }
      print_json(&session)?;
    }
    Command::Summary => {
      let mut saved_at = serde_json::Map::new();
      for item_type in ItemType::ALL {
        let at = storage.last_saved_at(bucket_key(item_type))?;
        saved_at.insert(item_type.as_str().to_string(), serde_json::to_value(at)?);
      }
      print_json(&serde_json::json!({
        "summary": store.summary(),
        "saved_at": saved_at,
      }))?;
    }
    Command::Reset { yes } => {
      if !yes {
        return Err(Error::Config("refusing to reset without --yes".to_string()));
      }
      store.reset();
      store.save_to(&storage)?;
      print_json(&serde_json::json!({ "items": store.len() }))?;
    }
    Command::Migrate => {
      let imported = store.migrate_legacy(&storage, now)?;
      if imported > 0 {
        store.save_to(&storage)?;
      }
      print_json(&serde_json::json!({ "imported": imported, "items": store.len() }))?;
    }
  }

  Ok(())
}

fn main() -> ExitCode {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "es_notebook=info".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
    .init();

  let cli = Cli::parse();
  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      tracing::error!("{}", e);
      ExitCode::FAILURE
    }
  }
}
