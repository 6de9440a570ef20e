//! Bulk import of Write From Dictation sentences from a CSV file.
//!
//! Sentences are keyed by a hash of their normalized text, so the import
//! can be re-run safely.

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
  /// CSV file with a `text` column and optional `ID` / `audio_{voice}` columns
  csv: PathBuf,

  /// Database file (default: DATA_DIR/pte.db)
  #[arg(long)]
  db: Option<PathBuf>,
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

  let input = match File::open(&args.csv) {
    Ok(f) => f,
    Err(e) => {
      tracing::error!("Cannot open {}: {}", args.csv.display(), e);
      return ExitCode::FAILURE;
    }
  };

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

  match sentence_import::import_sentences(&conn, input, chrono::Utc::now()) {
    Ok(summary) => {
      println!(
        "{} rows read: {} inserted, {} duplicates, {} skipped",
        summary.rows_read, summary.inserted, summary.duplicates, summary.skipped
      );
      ExitCode::SUCCESS
    }
    Err(e) => {
      tracing::error!("Import failed: {}", e);
      ExitCode::FAILURE
    }
  }
}
