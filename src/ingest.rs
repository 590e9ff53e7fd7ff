//! Transcription ingestion and normalization.
//!
//! Raw transcription lines carry HTML-ish tags, uncertainty markers,
//! punctuation and page numbers. Normalization strips them down to plain
//! lowercase words separated by single spaces.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::records::{TokenRecord, TranscriptionRecord};
use crate::tokenize::tokenize_str;

/// Switches for [`normalize_text`]. All on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    pub strip_html: bool,
    pub remove_numbers: bool,
    pub remove_uncertainty: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            strip_html: true,
            remove_numbers: true,
            remove_uncertainty: true,
        }
    }
}

struct Patterns {
    html: Regex,
    uncertainty: Regex,
    punct: Regex,
    digits: Regex,
    escapes: Regex,
    angles: Regex,
    slash_letter: Regex,
    whitespace: Regex,
    takahashi: Regex,
    braces: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        html: Regex::new(r"<[^>]+>").expect("valid regex"),
        uncertainty: Regex::new(r"[?*†()¶\[\]]").expect("valid regex"),
        punct: Regex::new(r#"[.,:;!"'`/<>]"#).expect("valid regex"),
        digits: Regex::new(r"\d+").expect("valid regex"),
        escapes: Regex::new(r"\\[ntbrf]").expect("valid regex"),
        angles: Regex::new(r"[<>]").expect("valid regex"),
        slash_letter: Regex::new(r"/([A-Za-z])").expect("valid regex"),
        whitespace: Regex::new(r"\s+").expect("valid regex"),
        takahashi: Regex::new(r"^<[^>]*;H>\s*(.*)").expect("valid regex"),
        braces: Regex::new(r"\{[^}]*\}").expect("valid regex"),
    })
}

/// Normalize one transcription line.
///
/// Order matters: tags go first so their contents never leak into the text,
/// and whitespace is collapsed last.
pub fn normalize_text(text: Option<&str>, opts: &NormalizeOptions) -> String {
    let Some(text) = text else {
        return String::new();
    };
    let p = patterns();
    let mut s = text.to_string();

    if opts.strip_html {
        s = p.html.replace_all(&s, " ").into_owned();
    }
    if opts.remove_uncertainty {
        s = p.uncertainty.replace_all(&s, "").into_owned();
    }
    s = s.replace('-', " ");
    s = p.punct.replace_all(&s, "").into_owned();
    if opts.remove_numbers {
        s = p.digits.replace_all(&s, " ").into_owned();
    }
    s = p.escapes.replace_all(&s, " ").into_owned();
    s = p.angles.replace_all(&s, " ").into_owned();
    s = p.slash_letter.replace_all(&s, " $1").into_owned();
    p.whitespace.replace_all(&s, " ").trim().to_lowercase()
}

/// One record per non-empty normalized line, numbered from 1.
pub fn ingest_text(raw: &str, opts: &NormalizeOptions) -> Vec<TranscriptionRecord> {
    raw.lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let norm = normalize_text(Some(line), opts);
            if norm.is_empty() {
                return None;
            }
            Some(TranscriptionRecord {
                line: Some(i as u64 + 1),
                raw: Some(line.to_string()),
                text: Some(norm),
                ..Default::default()
            })
        })
        .collect()
}

/// Pull the Takahashi (`;H`) transcription out of an interlinear file.
///
/// Inline `{...}` comments are dropped and whitespace collapsed; EVA markers
/// are kept for [`normalize_text`] to deal with.
pub fn extract_takahashi(raw: &str) -> Vec<String> {
    let p = patterns();
    raw.lines()
        .filter_map(|line| {
            let caps = p.takahashi.captures(line)?;
            let body = caps.get(1).map_or("", |m| m.as_str());
            let body = p.braces.replace_all(body, "");
            let body = p.whitespace.replace_all(&body, " ").trim().to_string();
            (!body.is_empty()).then_some(body)
        })
        .collect()
}

/// Explode transcription records into one record per token.
pub fn token_records(records: &[TranscriptionRecord]) -> Vec<TokenRecord> {
    let mut out = Vec::new();
    for rec in records {
        let raw = rec.raw.clone().unwrap_or_default();
        let text = rec.text.as_deref().unwrap_or("");
        for (i, token) in tokenize_str(text).into_iter().enumerate() {
            out.push(TokenRecord {
                line: rec.line,
                token_index: i + 1,
                token,
                raw: raw.clone(),
            });
        }
    }
    out
}
