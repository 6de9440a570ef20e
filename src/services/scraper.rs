//! Read Aloud page scraper.
//!
//! Fetches a practice page and pulls out the prompt audio URL and the Read
//! Aloud passage text. Pages are fetched as static HTML; nothing is executed.

use regex::Regex;
use reqwest::Url;
use serde::Serialize;
use std::sync::OnceLock;

/// Class names that mark the Read Aloud passage, in priority order
const RA_BODY_CLASSES: [&str; 2] = ["ra-body", "question-content"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub audio_src: Option<String>,
    pub ra_body_content: Option<String>,
}

#[derive(Debug)]
pub enum ScrapeError {
    InvalidUrl(String),
    /// Network failure or timeout
    Fetch(String),
    UpstreamStatus(u16),
    /// The page has neither audio nor passage
    NothingFound(String),
}

impl std::fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeError::InvalidUrl(u) => write!(f, "Invalid URL: {}", u),
            ScrapeError::Fetch(e) => write!(f, "Failed to fetch page: {}", e),
            ScrapeError::UpstreamStatus(s) => write!(f, "Page returned HTTP {}", s),
            ScrapeError::NothingFound(u) => write!(f, "No audio or passage found at {}", u),
        }
    }
}

impl std::error::Error for ScrapeError {}

/// Prepend `https://` when the URL has no protocol, then validate it.
pub fn normalize_url(raw: &str) -> Result<Url, ScrapeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScrapeError::InvalidUrl(raw.to_string()));
    }

    let lower = trimmed.to_ascii_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&with_scheme).map_err(|_| ScrapeError::InvalidUrl(raw.to_string()))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ScrapeError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

fn audio_src_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<audio\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("valid regex")
    })
}

fn audio_source_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<audio\b.*?<source\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#)
            .expect("valid regex")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"))
}

/// First audio URL on the page: `<audio src>` or its first `<source src>`.
pub fn extract_audio_src(html: &str) -> Option<String> {
    audio_src_regex()
        .captures(html)
        .or_else(|| audio_source_regex().captures(html))
        .map(|c| html_escape::decode_html_entities(&c[1]).trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Inner HTML of the first element carrying `class_name`, matching nested
/// tags of the same name.
fn element_inner_html<'a>(html: &'a str, class_name: &str) -> Option<&'a str> {
    let open = Regex::new(&format!(
        r#"(?is)<([a-z][a-z0-9]*)\b[^>]*?\bclass\s*=\s*["'](?:[^"']*\s)?{}(?:\s[^"']*)?["'][^>]*>"#,
        regex::escape(class_name)
    ))
    .ok()?;

    let caps = open.captures(html)?;
    let tag = caps.get(1)?.as_str().to_ascii_lowercase();
    let start = caps.get(0)?.end();

    let boundary = Regex::new(&format!(r"(?i)<(/?){}\b[^>]*>", regex::escape(&tag))).ok()?;
    let mut depth = 1usize;
    for m in boundary.captures_iter(&html[start..]) {
        let whole = m.get(0)?;
        if m.get(1).is_some_and(|slash| !slash.as_str().is_empty()) {
            depth -= 1;
            if depth == 0 {
                return Some(&html[start..start + whole.start()]);
            }
        } else if !whole.as_str().ends_with("/>") {
            depth += 1;
        }
    }
    None
}

/// Strip tags, decode entities and collapse whitespace.
pub fn html_to_text(fragment: &str) -> String {
    let without_tags = tag_regex().replace_all(fragment, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the Read Aloud passage.
pub fn extract_ra_body(html: &str) -> Option<String> {
    RA_BODY_CLASSES
        .iter()
        .filter_map(|class| element_inner_html(html, class))
        .map(html_to_text)
        .find(|text| !text.is_empty())
}

/// Extract both fields from a fetched page; relative audio URLs are resolved
/// against the page URL.
pub fn extract_page(base: &Url, html: &str) -> ScrapeResult {
    let audio_src = extract_audio_src(html).map(|src| {
        base.join(&src)
            .map(|u| u.to_string())
            .unwrap_or(src)
    });

    ScrapeResult {
        audio_src,
        ra_body_content: extract_ra_body(html),
    }
}

/// Fetch `url` and scrape it.
pub async fn scrape_page(client: &reqwest::Client, url: &Url) -> Result<ScrapeResult, ScrapeError> {
    tracing::debug!("Scraping {}", url);

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| ScrapeError::Fetch(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::UpstreamStatus(status.as_u16()));
    }

    let final_url = response.url().clone();
    let html = response
        .text()
        .await
        .map_err(|e| ScrapeError::Fetch(e.to_string()))?;

    let result = extract_page(&final_url, &html);
    if result.audio_src.is_none() && result.ra_body_content.is_none() {
        return Err(ScrapeError::NothingFound(url.to_string()));
    }
    Ok(result)
}
