//! Distribution metrics over frequency tables.
//!
//! - Shannon entropy (bits)
//! - Hapax legomena ratio
//! - Zipf rank-frequency slope in log-log space
//!
//! plus the per-corpus summary record built from them.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::ngram::{FrequencyTable, NgramCounter, TextProfile};
use crate::tokenize::tokenize_str;

/// Ranks beyond this are dropped from the Zipf fit to suppress tail noise.
pub const ZIPF_MAX_RANKS: usize = 1000;

/// Minimum number of distinct frequency values needed for a Zipf fit.
pub const ZIPF_MIN_DISTINCT_FREQUENCIES: usize = 3;

/// Shannon entropy H = -Σ p_i log2(p_i) of a frequency table.
///
/// 0.0 for an empty table, and 0.0 exactly when one symbol holds all mass.
pub fn shannon_entropy(table: &FrequencyTable) -> f64 {
    let total = table.total();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    let h: f64 = table
        .values()
        .map(|c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();
    // A single symbol gives -1·log2(1) = -0.0
    h.max(0.0)
}

/// Fraction of the vocabulary seen exactly once (0.0 for an empty table).
pub fn hapax_ratio(table: &FrequencyTable) -> f64 {
    let vocab = table.vocab_size();
    if vocab == 0 {
        return 0.0;
    }
    table.hapax_count() as f64 / vocab as f64
}

/// Least-squares line through (log10 rank, log10 frequency).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZipfFit {
    pub slope: f64,
    pub intercept: f64,
    pub ranks_used: usize,
}

/// Fit the rank-frequency line over at most `max_ranks` top ranks.
///
/// Returns `None` when fewer than [`ZIPF_MIN_DISTINCT_FREQUENCIES`] distinct
/// frequency values exist: no slope can be meaningfully fit.
pub fn zipf_fit(table: &FrequencyTable, max_ranks: usize) -> Option<ZipfFit> {
    let mut freqs: Vec<u64> = table.values().collect();
    freqs.sort_unstable_by(|a, b| b.cmp(a));

    let mut distinct = freqs.clone();
    distinct.dedup();
    if distinct.len() < ZIPF_MIN_DISTINCT_FREQUENCIES {
        return None;
    }

    let n = freqs.len().min(max_ranks.max(2));
    let design = DMatrix::from_fn(n, 2, |i, j| {
        if j == 0 {
            1.0
        } else {
            ((i + 1) as f64).log10()
        }
    });
    let y = DVector::from_iterator(n, freqs.iter().take(n).map(|&f| (f as f64).log10()));

    let beta = design.svd(true, true).solve(&y, 1e-12).ok()?;
    let (intercept, slope) = (beta[0], beta[1]);
    if !slope.is_finite() {
        return None;
    }

    Some(ZipfFit {
        slope,
        intercept,
        ranks_used: n,
    })
}

/// Zipf slope over the default top [`ZIPF_MAX_RANKS`] ranks.
pub fn zipf_slope(table: &FrequencyTable) -> Option<f64> {
    zipf_fit(table, ZIPF_MAX_RANKS).map(|fit| fit.slope)
}

/// Summary statistics for one tokenized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusMetrics {
    pub lines: usize,
    pub tokens: u64,
    pub vocab_size: usize,
    pub hapax_legomena: usize,
    pub hapax_ratio: f64,
    pub unigram_entropy_bits: f64,
    /// Absent (null) when the fit is undefined; never reported as 0
    pub zipf_slope_loglog: Option<f64>,
    pub top_unigrams: Vec<(String, u64)>,
    pub top_bigrams: Vec<(String, u64)>,
}

impl CorpusMetrics {
    /// Compute metrics over normalized text lines
    pub fn compute<I, S>(lines: I, top_n: usize, zipf_max_ranks: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_profile(&TextProfile::from_lines(lines), top_n, zipf_max_ranks)
    }

    pub fn from_profile(profile: &TextProfile, top_n: usize, zipf_max_ranks: usize) -> Self {
        let uni = &profile.unigrams;
        Self {
            lines: profile.lines,
            tokens: uni.total(),
            vocab_size: uni.vocab_size(),
            hapax_legomena: uni.hapax_count(),
            hapax_ratio: hapax_ratio(uni),
            unigram_entropy_bits: shannon_entropy(uni),
            zipf_slope_loglog: zipf_fit(uni, zipf_max_ranks).map(|f| f.slope),
            top_unigrams: uni.most_common(top_n),
            top_bigrams: profile.bigrams.most_common(top_n),
        }
    }

    /// Short human-readable reading of the numbers
    pub fn interpret(&self) -> Vec<String> {
        let mut notes = vec![format!(
            "Lines: {}, Tokens: {}, Vocab: {}",
            self.lines, self.tokens, self.vocab_size
        )];

        if self.unigram_entropy_bits <= 0.0 {
            notes.push("No token information to compute entropy.".to_string());
        } else {
            notes.push(format!(
                "Unigram Shannon entropy: {:.3} bits per token (higher = more unpredictable).",
                self.unigram_entropy_bits
            ));
        }

        match self.zipf_slope_loglog {
            None => notes.push("Zipf slope: not enough data to compute.".to_string()),
            Some(s) => notes.push(format!(
                "Zipf slope (log-log) ~ {:.3}. Natural languages typically show a slope near -1; \
                 large deviations may indicate an atypical distribution or preprocessing artifacts.",
                s
            )),
        }

        if self.hapax_ratio > 0.2 {
            notes.push(format!(
                "High hapax legomena ratio: {:.3} (many tokens occur only once). Possible causes: \
                 rich morphology, transcription noise, or a small sample.",
                self.hapax_ratio
            ));
        } else {
            notes.push(format!("Hapax legomena ratio: {:.3}.", self.hapax_ratio));
        }

        notes.push(
            "Top unigrams and bigrams are listed for manual inspection of frequent tokens \
             (possible function words or repeated glyph sequences)."
                .to_string(),
        );

        notes
    }
}

/// Per-line n-gram counts (n-grams do not span lines).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NgramStats {
    pub lines: usize,
    pub tokens: u64,
    pub unigram_entropy: f64,
    pub top_unigrams: Vec<(String, u64)>,
    pub top_bigrams: Vec<(String, u64)>,
    pub top_trigrams: Vec<(String, u64)>,
    #[serde(skip)]
    pub unigrams: FrequencyTable,
    #[serde(skip)]
    pub bigrams: FrequencyTable,
    #[serde(skip)]
    pub trigrams: FrequencyTable,
}

impl NgramStats {
    pub fn compute<I, S>(lines: I, top_n: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut uni = FrequencyTable::new();
        let mut bi = FrequencyTable::new();
        let mut tri = FrequencyTable::new();
        let mut n_lines = 0;

        for line in lines {
            n_lines += 1;
            let tokens = tokenize_str(line.as_ref());
            for token in &tokens {
                uni.add(token.as_str());
            }
            // fresh counters per line: no carry-over
            for (order, table) in [(2, &mut bi), (3, &mut tri)] {
                let mut counter = NgramCounter::new(order);
                counter.feed(&tokens);
                table.merge(counter.table());
            }
        }

        Self {
            lines: n_lines,
            tokens: uni.total(),
            unigram_entropy: shannon_entropy(&uni),
            top_unigrams: uni.most_common(top_n),
            top_bigrams: bi.most_common(top_n),
            top_trigrams: tri.most_common(top_n),
            unigrams: uni,
            bigrams: bi,
            trigrams: tri,
        }
    }
}
