//! Fill the `ID` field of stored dictation sentences from a CSV lookup sheet
//! (`ID` and `text` columns), matching on normalized text.

use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pte_practice::config::Settings;
use pte_practice::db;
use pte_practice::paths;
use pte_practice::services::sentence_import;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Lookup CSV with `ID` and `text` columns
  lookup: PathBuf,

  /// Database file (default: DATA_DIR/pte.db)
  #[arg(long)]
  db: Option<PathBuf>,

  /// Replace IDs that are already set
  #[arg(long)]
  overwrite: bool,
}

fn main() -> ExitCode {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pte_practice=info".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let args = Args::parse();
  let db_path = args
    .db
    .unwrap_or_else(|| paths::db_path(&Settings::load().data_dir));

  let lookup = match File::open(&args.lookup)
    .map_err(|e| e.to_string())
    .and_then(|f| sentence_import::load_id_lookup(f).map_err(|e| e.to_string()))
  {
    Ok(lookup) => lookup,
    Err(e) => {
      tracing::error!("Cannot read lookup {}: {}", args.lookup.display(), e);
      return ExitCode::FAILURE;
    }
  };
  tracing::info!("Loaded {} lookup entries", lookup.len());

  let pool = match db::init_db(&db_path) {
    Ok(pool) => pool,
    Err(e) => {
      tracing::error!("Cannot open database {}: {}", db_path.display(), e);
      return ExitCode::FAILURE;
    }
  };
  let Ok(conn) = db::try_lock(&pool) else {
    return ExitCode::FAILURE;
  };

  match sentence_import::backfill_sentence_ids(&conn, &lookup, args.overwrite) {
    Ok(summary) => {
      println!(
        "{} matched, {} already set, {} unmatched",
        summary.matched,
        summary.already_set,
        summary.unmatched.len()
      );
      for id in &summary.unmatched {
        println!("  unmatched: {}", id);
      }
      ExitCode::SUCCESS
    }
    Err(e) => {
      tracing::error!("Back-fill failed: {}", e);
      ExitCode::FAILURE
    }
  }
}
