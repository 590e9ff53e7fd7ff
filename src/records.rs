//! Input record model and JSONL reading.
//!
//! Records come from hand-curated transcription files, so parsing is
//! best-effort: blank lines and malformed JSON are skipped, never fatal.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::error::{Result, StatsError};

/// One normalized transcription line.
///
/// Every field is optional; a missing field is absent, not an empty value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionRecord {
    /// 1-based line number in the raw source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    /// Raw line before normalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    /// Normalized text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Pre-split tokens, used when `text` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<String>>,
    /// Unit identifier (folio) this line belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folio: Option<String>,
}

/// How the text of a record is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRule {
    /// The `text` field, when non-empty
    TextField,
    /// `tokens` joined with single spaces
    JoinedTokens,
}

/// Text extraction policy: rules are tried in order, first non-empty wins.
pub const TEXT_RULES: &[TextRule] = &[TextRule::TextField, TextRule::JoinedTokens];

impl TextRule {
    fn apply(&self, record: &TranscriptionRecord) -> Option<String> {
        match self {
            TextRule::TextField => record.text.clone().filter(|t| !t.is_empty()),
            TextRule::JoinedTokens => record
                .tokens
                .as_ref()
                .map(|t| t.join(" "))
                .filter(|t| !t.is_empty()),
        }
    }
}

impl TranscriptionRecord {
    /// Text of this record under [`TEXT_RULES`]; `None` means skip it.
    pub fn extract_text(&self) -> Option<String> {
        TEXT_RULES.iter().find_map(|rule| rule.apply(self))
    }
}

/// One token with its position, as written by the `tokenize` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub line: Option<u64>,
    pub token_index: usize,
    pub token: String,
    #[serde(default)]
    pub raw: String,
}

/// A token placed on a manuscript unit.
///
/// `folio` falls back to `page` when the former is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTokenRecord {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}

impl UnitTokenRecord {
    /// Unit identifier: `folio`, then `page`
    pub fn unit_id(&self) -> Option<&str> {
        self.folio
            .as_deref()
            .or(self.page.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// Stream a JSONL file, calling `f` for each parsed record.
///
/// Blank lines are ignored; lines that fail to parse are logged and skipped.
/// Returns the number of skipped lines.
pub fn for_each_jsonl<T, F>(path: &Path, mut f: F) -> Result<usize>
where
    T: for<'de> Deserialize<'de>,
    F: FnMut(T),
{
    let mut skipped = 0;
    let mut line_no = 0;

    for_each_line_lossy(path, |line| {
        line_no += 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        match parse_record::<T>(trimmed, line_no) {
            Ok(rec) => f(rec),
            Err(err) => {
                debug!("{}: {}", path.display(), err);
                skipped += 1;
            }
        }
    })?;

    Ok(skipped)
}

/// Decode UTF-8, dropping invalid byte sequences.
///
/// Dropped bytes join their neighbours, so `ol\xffdy` reads as `oldy`.
pub fn decode_ignoring_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

/// Stream the lines of a text file without failing on invalid UTF-8.
///
/// Undecodable bytes are dropped, see [`decode_ignoring_invalid`].
pub fn for_each_line_lossy<F>(path: &Path, mut f: F) -> Result<()>
where
    F: FnMut(&str),
{
    let file = File::open(path).map_err(|e| StatsError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| StatsError::io(path, e))?;
        if n == 0 {
            break;
        }
        let line = decode_ignoring_invalid(&buf);
        f(line.trim_end_matches(['\n', '\r']));
    }

    Ok(())
}

fn parse_record<T>(line: &str, line_no: usize) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_str(line).map_err(|e| StatsError::InvalidRecord {
        line: line_no,
        reason: e.to_string(),
    })
}

/// Texts of every usable record in a transcription JSONL file.
pub fn read_lines_from_jsonl(path: &Path) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    let skipped = for_each_jsonl(path, |rec: TranscriptionRecord| {
        if let Some(text) = rec.extract_text() {
            lines.push(text);
        }
    })?;
    if skipped > 0 {
        debug!("Skipped {} malformed records in {}", skipped, path.display());
    }
    Ok(lines)
}

/// Read all records of type `T`, skipping malformed lines.
pub fn read_jsonl<T>(path: &Path) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let mut out = Vec::new();
    for_each_jsonl(path, |rec: T| out.push(rec))?;
    Ok(out)
}

/// Write one JSON object per line, creating parent directories.
pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StatsError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| StatsError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for rec in records {
        serde_json::to_writer(&mut writer, rec)?;
        writer.write_all(b"\n").map_err(|e| StatsError::io(path, e))?;
    }
    writer.flush().map_err(|e| StatsError::io(path, e))?;
    Ok(())
}
