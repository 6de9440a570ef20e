//! Bulk import of dictation sentences from CSV and identifier back-fill.
//!
//! ## Import
//! Rows are keyed by a content hash of the normalized sentence text, so
//! re-running an import (or importing the same sentence with different
//! punctuation or spacing) never creates duplicates.
//!
//! ## Back-fill
//! A lookup sheet maps external `ID`s to sentence text. Stored sentences
//! whose normalized text matches a lookup row get that `ID`.
//!
//! ## CSV columns
//! - `text` (or `sentence`): the sentence, required
//! - `ID`: optional external identifier
//! - `audio_{voice}`: optional audio URL for a voice, e.g. `audio_brian`

use chrono::{DateTime, Utc};
use csv::StringRecord;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use unicode_normalization::UnicodeNormalization;

use crate::db;
use crate::domain::DictationSentence;
use crate::scoring::normalize_words;

const TEXT_COLUMNS: [&str; 2] = ["text", "sentence"];
const ID_COLUMN: &str = "id";
const AUDIO_PREFIX: &str = "audio_";

#[derive(Debug)]
pub enum ImportError {
    Csv(String),
    MissingColumn(&'static str),
    Database(rusqlite::Error),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Csv(e) => write!(f, "CSV error: {}", e),
            ImportError::MissingColumn(c) => write!(f, "CSV is missing the '{}' column", c),
            ImportError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<csv::Error> for ImportError {
    fn from(e: csv::Error) -> Self {
        ImportError::Csv(e.to_string())
    }
}

impl From<rusqlite::Error> for ImportError {
    fn from(e: rusqlite::Error) -> Self {
        ImportError::Database(e)
    }
}

/// Outcome of a CSV import run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows_read: usize,
    pub inserted: usize,
    pub duplicates: usize,
    /// Rows with empty text
    pub skipped: usize,
}

/// Outcome of an identifier back-fill run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackfillSummary {
    pub matched: usize,
    pub already_set: usize,
    /// Hashes of sentences with no lookup match
    pub unmatched: Vec<String>,
}

/// Normalize sentence text for matching: NFKC, lower-case, punctuation
/// removed, whitespace collapsed.
pub fn normalize_sentence(text: &str) -> String {
    let composed: String = text.nfkc().collect();
    normalize_words(&composed).join(" ")
}

/// Stable id for a sentence: SHA-256 of its normalized text.
///
/// Returns the first 32 hex chars (128 bits).
pub fn sentence_hash(text: &str) -> String {
    let hash = Sha256::digest(normalize_sentence(text).as_bytes());
    hex::encode(&hash[..16])
}

/// Column positions resolved from the header row
struct Columns {
    text: usize,
    id: Option<usize>,
    audio: Vec<(String, usize)>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, ImportError> {
        let lower: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

        let text = lower
            .iter()
            .position(|h| TEXT_COLUMNS.contains(&h.as_str()))
            .ok_or(ImportError::MissingColumn("text"))?;
        let id = lower.iter().position(|h| h == ID_COLUMN);
        let audio = lower
            .iter()
            .enumerate()
            .filter_map(|(i, h)| {
                h.strip_prefix(AUDIO_PREFIX)
                    .filter(|voice| !voice.is_empty())
                    .map(|voice| (voice.to_string(), i))
            })
            .collect();

        Ok(Self { text, id, audio })
    }

    fn field<'r>(record: &'r StringRecord, idx: usize) -> Option<&'r str> {
        record.get(idx).map(str::trim).filter(|v| !v.is_empty())
    }
}

fn csv_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

/// Import sentences from CSV, skipping any whose content hash already exists.
pub fn import_sentences<R: Read>(
    conn: &Connection,
    input: R,
    now: DateTime<Utc>,
) -> Result<ImportSummary, ImportError> {
    let mut reader = csv_reader(input);
    let columns = Columns::from_headers(reader.headers()?)?;
    let mut summary = ImportSummary::default();

    let tx = conn.unchecked_transaction()?;
    for record in reader.records() {
        let record = record?;
        summary.rows_read += 1;

        let Some(text) = Columns::field(&record, columns.text) else {
            summary.skipped += 1;
            continue;
        };
        if normalize_sentence(text).is_empty() {
            summary.skipped += 1;
            continue;
        }

        let audio_urls: BTreeMap<String, String> = columns
            .audio
            .iter()
            .filter_map(|(voice, idx)| {
                Columns::field(&record, *idx).map(|url| (voice.clone(), url.to_string()))
            })
            .collect();

        let sentence = DictationSentence {
            id: sentence_hash(text),
            text: text.to_string(),
            sentence_id: columns
                .id
                .and_then(|idx| Columns::field(&record, idx))
                .map(String::from),
            audio_urls,
            created_at: now,
        };

        if db::insert_sentence_if_absent(&tx, &sentence)? {
            summary.inserted += 1;
        } else {
            summary.duplicates += 1;
        }
    }
    tx.commit()?;

    tracing::info!(
        "Imported {} sentences ({} duplicates, {} skipped) from {} rows",
        summary.inserted,
        summary.duplicates,
        summary.skipped,
        summary.rows_read
    );
    Ok(summary)
}

/// Read a lookup sheet into normalized text -> external ID.
///
/// When two rows normalize to the same text the first one wins.
pub fn load_id_lookup<R: Read>(input: R) -> Result<HashMap<String, String>, ImportError> {
    let mut reader = csv_reader(input);
    let columns = Columns::from_headers(reader.headers()?)?;
    let id_idx = columns.id.ok_or(ImportError::MissingColumn("ID"))?;

    let mut lookup = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let (Some(text), Some(id)) = (
            Columns::field(&record, columns.text),
            Columns::field(&record, id_idx),
        ) else {
            continue;
        };
        let key = normalize_sentence(text);
        if key.is_empty() {
            continue;
        }
        lookup.entry(key).or_insert_with(|| id.to_string());
    }
    Ok(lookup)
}

/// Fill the `ID` field of stored sentences from a lookup table.
///
/// Sentences that already carry an ID are left alone unless `overwrite`.
pub fn backfill_sentence_ids(
    conn: &Connection,
    lookup: &HashMap<String, String>,
    overwrite: bool,
) -> Result<BackfillSummary, ImportError> {
    let mut summary = BackfillSummary::default();
    let sentences = db::list_sentences(conn)?;

    let tx = conn.unchecked_transaction()?;
    for sentence in sentences {
        if sentence.sentence_id.is_some() && !overwrite {
            summary.already_set += 1;
            continue;
        }
        match lookup.get(&normalize_sentence(&sentence.text)) {
            Some(id) => {
                db::set_sentence_id(&tx, &sentence.id, id)?;
                summary.matched += 1;
            }
            None => {
                tracing::debug!("No ID match for sentence {}: {}", sentence.id, sentence.text);
                summary.unmatched.push(sentence.id);
            }
        }
    }
    tx.commit()?;

    tracing::info!(
        "Back-filled {} sentence IDs ({} already set, {} unmatched)",
        summary.matched,
        summary.already_set,
        summary.unmatched.len()
    );
    Ok(summary)
}
