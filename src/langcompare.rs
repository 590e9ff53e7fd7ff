//! Character n-gram comparison against candidate language corpora.
//!
//! The manuscript side is its distinct token set; each corpus is split on
//! whitespace. For n = 1..=4 both word lists are reduced to character
//! n-gram counts and compared with JSD and top-k overlap.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

use crate::compare::list_corpus_files;
use crate::divergence::{jensen_shannon_divergence, top_k_overlap};
use crate::error::{Result, StatsError};
use crate::ngram::FrequencyTable;
use crate::records::for_each_line_lossy;
use crate::tokenize::tokenize_str;

/// Largest character n-gram order compared.
pub const MAX_CHAR_NGRAM: usize = 4;

/// Character `n`-gram counts over a word list.
///
/// Words are lowercased; a word shorter than `n` characters counts once as a
/// whole. `n == 0` yields an empty table.
pub fn char_ngram_counts<I, S>(words: I, n: usize) -> FrequencyTable
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut table = FrequencyTable::new();
    if n == 0 {
        return table;
    }
    for word in words {
        let word = word.as_ref().to_lowercase();
        let chars: Vec<char> = word.chars().collect();
        if chars.len() < n {
            table.add(word);
            continue;
        }
        for gram in chars.windows(n) {
            table.add(gram.iter().collect::<String>());
        }
    }
    table
}

/// Distinct manuscript tokens in sorted order.
pub fn manuscript_terms<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let terms: BTreeSet<String> = lines
        .into_iter()
        .flat_map(|l| tokenize_str(l.as_ref()))
        .collect();
    terms.into_iter().collect()
}

/// Result for one n-gram order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharNgramComparison {
    pub n: usize,
    pub js_divergence: f64,
    pub top_k_overlap: f64,
    pub example_common: Vec<String>,
    pub manuscript_total_ngrams: u64,
    pub corpus_total_ngrams: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageComparison {
    pub corpus: String,
    pub source: String,
    pub results: Vec<CharNgramComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageReport {
    pub manuscript_terms: usize,
    pub corpora_analyzed: Vec<LanguageComparison>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Compare two word lists at every order 1..=[`MAX_CHAR_NGRAM`].
pub fn compare_words(
    manuscript: &[String],
    corpus: &[String],
    top_k: usize,
) -> Result<Vec<CharNgramComparison>> {
    if top_k == 0 {
        return Err(StatsError::invalid("top_k", "must be at least 1"));
    }

    (1..=MAX_CHAR_NGRAM)
        .map(|n| {
            let ms = char_ngram_counts(manuscript, n);
            let cs = char_ngram_counts(corpus, n);
            let (p, q) = (ms.to_distribution(), cs.to_distribution());
            let overlap = top_k_overlap(&p, &q, top_k)?;
            Ok(CharNgramComparison {
                n,
                js_divergence: jensen_shannon_divergence(&p, &q),
                top_k_overlap: overlap.fraction,
                example_common: overlap.example_common,
                manuscript_total_ngrams: ms.total(),
                corpus_total_ngrams: cs.total(),
            })
        })
        .collect()
}

/// Whitespace-separated words of a text file.
pub fn read_words(path: &Path) -> Result<Vec<String>> {
    let mut words = Vec::new();
    for_each_line_lossy(path, |line| {
        words.extend(line.split_whitespace().map(str::to_string));
    })?;
    Ok(words)
}

/// Compare the manuscript terms against one corpus file.
pub fn compare_corpus_file(
    terms: &[String],
    path: &Path,
    top_k: usize,
) -> Result<LanguageComparison> {
    let words = read_words(path)?;
    debug!("{}: {} words", path.display(), words.len());
    Ok(LanguageComparison {
        corpus: path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        source: path.display().to_string(),
        results: compare_words(terms, &words, top_k)?,
    })
}

/// Compare against every file in `corpora_dir`.
///
/// A missing or empty directory is not an error: the report carries a note
/// explaining how to add corpora.
pub fn compare_languages(terms: &[String], corpora_dir: &Path, top_k: usize) -> Result<LanguageReport> {
    let files = if corpora_dir.is_dir() {
        list_corpus_files(corpora_dir)?
    } else {
        Vec::new()
    };

    let mut report = LanguageReport {
        manuscript_terms: terms.len(),
        corpora_analyzed: Vec::with_capacity(files.len()),
        note: None,
    };

    if files.is_empty() {
        report.note = Some(format!(
            "no corpora found under {}; place plain-text files such as latin.txt there",
            corpora_dir.display()
        ));
        return Ok(report);
    }

    for path in files {
        info!("Analyzing {}", path.display());
        report
            .corpora_analyzed
            .push(compare_corpus_file(terms, &path, top_k)?);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_char_ngrams_short_words_count_whole() {
        let t = char_ngram_counts(["ol", "Dain"], 3);
        assert_eq!(t.get("ol"), 1);
        assert_eq!(t.get("dai"), 1);
        assert_eq!(t.get("ain"), 1);
        assert_eq!(t.total(), 3);
    }

    #[test]
    fn test_char_ngrams_unicode() {
        let t = char_ngram_counts(["æsc"], 2);
        assert_eq!(t.get("æs"), 1);
        assert_eq!(t.get("sc"), 1);
        assert!(char_ngram_counts(["abc"], 0).is_empty());
    }

    #[test]
    fn test_manuscript_terms_sorted_unique() {
        let terms = manuscript_terms(["qokedy daiin", "daiin ol"]);
        assert_eq!(terms, vec!["daiin", "ol", "qokedy"]);
    }

    #[test]
    fn test_compare_words_orders_and_totals() {
        let ms = words("daiin ol");
        let res = compare_words(&ms, &ms, 50).unwrap();
        assert_eq!(res.len(), MAX_CHAR_NGRAM);
        for r in &res {
            assert_eq!(r.js_divergence, 0.0);
            assert_eq!(r.manuscript_total_ngrams, r.corpus_total_ngrams);
        }
        // unigrams: 5 + 2 characters
        assert_eq!(res[0].manuscript_total_ngrams, 7);
        // top-50 over 6 distinct characters
        assert!(approx_eq(res[0].top_k_overlap, 6.0 / 50.0, 1e-12));
    }

    #[test]
    fn test_compare_words_disjoint() {
        let res = compare_words(&words("aaa"), &words("bbb"), 1).unwrap();
        assert!(approx_eq(res[0].js_divergence, 1.0, 1e-9));
        assert_eq!(res[0].top_k_overlap, 0.0);
        assert!(res[0].example_common.is_empty());
    }

    #[test]
    fn test_compare_languages_without_corpora() {
        let dir = tempfile::tempdir().unwrap();
        let report = compare_languages(&words("ol"), dir.path(), 50).unwrap();
        assert!(report.corpora_analyzed.is_empty());
        assert!(report.note.is_some());
    }

    #[test]
    fn test_compare_languages_with_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("latin.txt"), "arma virumque\ncano").unwrap();
        let report = compare_languages(&words("daiin ol"), dir.path(), 50).unwrap();
        assert_eq!(report.corpora_analyzed.len(), 1);
        assert_eq!(report.corpora_analyzed[0].corpus, "latin");
        assert_eq!(report.corpora_analyzed[0].results[0].corpus_total_ngrams, 16);
        assert!(report.note.is_none());
    }
}
