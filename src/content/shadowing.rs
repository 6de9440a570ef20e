//! Shadowing sentence sets built from static audio directories.
//!
//! Each set is a directory of synthesized clips named
//! `{number}_{voice}_{text}.mp3`, e.g. `1_Brian_Hello_world.mp3`.
//! Clips sharing a number are the same sentence in different voices.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A parsed `{number}_{voice}_{text}.mp3` file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFileName {
    pub number: u32,
    pub voice: String,
    pub text: String,
}

/// One sentence with its audio per voice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sentence {
    pub number: u32,
    pub text: String,
    /// Lower-cased voice name -> audio URL
    pub voices: BTreeMap<String, String>,
}

/// All sentences in a set, ascending by number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceListing {
    pub set: String,
    pub sentences: Vec<Sentence>,
    pub full_text: String,
}

#[derive(Debug)]
pub enum ListingError {
    /// The set directory does not exist
    NotFound(String),
    InvalidSetName(String),
    IoError(String),
}

impl std::fmt::Display for ListingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingError::NotFound(set) => write!(f, "Audio set not found: {}", set),
            ListingError::InvalidSetName(set) => write!(f, "Invalid audio set name: {}", set),
            ListingError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ListingError {}

/// Set names map to a single directory level under the audio root.
pub fn is_valid_set_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Parse `{number}_{voice}_{text}.mp3`; underscores in the text become spaces.
pub fn parse_audio_file_name(file_name: &str) -> Option<AudioFileName> {
    let stem = file_name
        .strip_suffix(".mp3")
        .or_else(|| file_name.strip_suffix(".MP3"))?;

    let (number, rest) = stem.split_once('_')?;
    let (voice, text) = rest.split_once('_')?;

    let number: u32 = number.parse().ok()?;
    if voice.is_empty() {
        return None;
    }

    let text = text.replace('_', " ").trim().to_string();
    if text.is_empty() {
        return None;
    }

    Some(AudioFileName {
        number,
        voice: voice.to_string(),
        text,
    })
}

/// Group parsed file names into sentences.
///
/// `url_for` maps a raw file name to the URL clients fetch it from.
pub fn group_sentences(
    file_names: &[String],
    url_for: impl Fn(&str) -> String,
) -> Vec<Sentence> {
    let mut sorted: Vec<&String> = file_names.iter().collect();
    sorted.sort();

    let mut by_number: BTreeMap<u32, Sentence> = BTreeMap::new();
    for file_name in sorted {
        let Some(parsed) = parse_audio_file_name(file_name) else {
            tracing::debug!("Skipping audio file with unexpected name: {}", file_name);
            continue;
        };

        let sentence = by_number.entry(parsed.number).or_insert_with(|| Sentence {
            number: parsed.number,
            text: parsed.text.clone(),
            voices: BTreeMap::new(),
        });
        if sentence.text != parsed.text {
            tracing::warn!(
                "Sentence {} has differing text across voices: '{}' vs '{}'",
                parsed.number,
                sentence.text,
                parsed.text
            );
        }
        sentence
            .voices
            .insert(parsed.voice.to_lowercase(), url_for(file_name));
    }

    by_number.into_values().collect()
}

/// Concatenate sentence texts in ascending numeric order.
pub fn full_text(sentences: &[Sentence]) -> String {
    sentences
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// List the sentences of `set` under `audio_root`.
///
/// Audio URLs are `{url_prefix}/{set}/{file name}` with the file name
/// percent-encoded.
pub fn list_sentences(
    audio_root: &Path,
    set: &str,
    url_prefix: &str,
) -> Result<SentenceListing, ListingError> {
    if !is_valid_set_name(set) {
        return Err(ListingError::InvalidSetName(set.to_string()));
    }

    let dir = audio_root.join(set);
    if !dir.is_dir() {
        return Err(ListingError::NotFound(set.to_string()));
    }

    let file_names: Vec<String> = fs::read_dir(&dir)
        .map_err(|e| ListingError::IoError(e.to_string()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().to_str().map(String::from))
        .collect();

    let prefix = url_prefix.trim_end_matches('/');
    let sentences = group_sentences(&file_names, |name| {
        format!("{}/{}/{}", prefix, set, urlencoding::encode(name))
    });

    Ok(SentenceListing {
        set: set.to_string(),
        full_text: full_text(&sentences),
        sentences,
    })
}

/// List available sets (sub-directories of the audio root), sorted.
pub fn list_sets(audio_root: &Path) -> Vec<String> {
    let mut sets: Vec<String> = fs::read_dir(audio_root)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_dir())
                .filter_map(|e| e.file_name().to_str().map(String::from))
                .filter(|name| is_valid_set_name(name))
                .collect()
        })
        .unwrap_or_default();
    sets.sort();
    sets
}
