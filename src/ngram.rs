//! N-gram extraction and frequency tables.
//!
//! A [`FrequencyTable`] keeps symbols in first-seen order, so "most common"
//! rankings break count ties by first occurrence. N-grams are logically token
//! tuples; they are stored under a single key with fields joined by one space.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::distribution::ProbabilityDistribution;

/// Separator between n-gram fields in a serialized key.
pub const NGRAM_SEPARATOR: &str = " ";

/// All contiguous `n`-length subsequences of `tokens`, in order.
///
/// `n == 0` yields nothing, as does a sequence shorter than `n`.
pub fn ngrams(tokens: &[String], n: usize) -> Vec<&[String]> {
    if n == 0 || tokens.len() < n {
        return Vec::new();
    }
    tokens.windows(n).collect()
}

/// Serialize an n-gram tuple to its storage key.
#[inline]
pub fn ngram_key(gram: &[String]) -> String {
    gram.join(NGRAM_SEPARATOR)
}

/// Symbol → count mapping. Only keys with count >= 1 are ever stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IndexMap<String, u64>", into = "IndexMap<String, u64>")]
pub struct FrequencyTable {
    counts: IndexMap<String, u64>,
    total: u64,
}

impl From<IndexMap<String, u64>> for FrequencyTable {
    fn from(map: IndexMap<String, u64>) -> Self {
        let mut table = Self::new();
        for (key, count) in map {
            table.add_count(key, count);
        }
        table
    }
}

impl From<FrequencyTable> for IndexMap<String, u64> {
    fn from(table: FrequencyTable) -> Self {
        table.counts
    }
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unigram table over a token sequence
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for token in tokens {
            table.add(token);
        }
        table
    }

    /// Table of order-`n` n-grams over a token sequence
    pub fn from_ngrams(tokens: &[String], n: usize) -> Self {
        let mut table = Self::new();
        for gram in ngrams(tokens, n) {
            table.add(ngram_key(gram));
        }
        table
    }

    /// Count one occurrence of `key`
    #[inline]
    pub fn add(&mut self, key: impl Into<String>) {
        self.add_count(key, 1);
    }

    /// Count `count` occurrences of `key`. A zero count stores nothing.
    pub fn add_count(&mut self, key: impl Into<String>, count: u64) {
        if count == 0 {
            return;
        }
        *self.counts.entry(key.into()).or_insert(0) += count;
        self.total += count;
    }

    /// Merge another table's counts into this one
    pub fn merge(&mut self, other: &FrequencyTable) {
        for (key, &count) in &other.counts {
            self.add_count(key.clone(), count);
        }
    }

    /// Count for `key` (0 when absent)
    #[inline]
    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.counts.contains_key(key)
    }

    /// Sum of all counts
    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct symbols
    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Symbols and counts in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(|k| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.counts.values().copied()
    }

    /// Number of symbols seen exactly once
    pub fn hapax_count(&self) -> usize {
        self.counts.values().filter(|&&c| c == 1).count()
    }

    /// Top `n` symbols by descending count, ties in first-seen order
    pub fn most_common(&self, n: usize) -> Vec<(String, u64)> {
        let mut entries: Vec<(&String, &u64)> = self.counts.iter().collect();
        // sort_by is stable: equal counts keep insertion order
        entries.sort_by(|a, b| b.1.cmp(a.1));
        entries
            .into_iter()
            .take(n)
            .map(|(k, &v)| (k.clone(), v))
            .collect()
    }

    /// Normalize to a probability distribution
    pub fn to_distribution(&self) -> ProbabilityDistribution {
        ProbabilityDistribution::from_table(self)
    }
}

/// Streaming n-gram counter.
///
/// Tokens may be fed in arbitrary chunks (one line at a time, for instance);
/// the last `n - 1` tokens are carried over so n-grams span chunk boundaries
/// exactly as if the whole stream had been counted at once.
#[derive(Debug, Clone)]
pub struct NgramCounter {
    order: usize,
    window: VecDeque<String>,
    table: FrequencyTable,
}

impl NgramCounter {
    pub fn new(order: usize) -> Self {
        Self {
            order,
            window: VecDeque::with_capacity(order),
            table: FrequencyTable::new(),
        }
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Feed the next chunk of the token stream
    pub fn feed(&mut self, tokens: &[String]) {
        if self.order == 0 {
            return;
        }
        for token in tokens {
            self.window.push_back(token.clone());
            if self.window.len() > self.order {
                self.window.pop_front();
            }
            if self.window.len() == self.order {
                let key = self
                    .window
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(NGRAM_SEPARATOR);
                self.table.add(key);
            }
        }
    }

    /// Counts accumulated so far
    pub fn table(&self) -> &FrequencyTable {
        &self.table
    }

    pub fn finish(self) -> FrequencyTable {
        self.table
    }
}

/// Unigram and bigram tables over one text stream.
///
/// Lines are tokenized one at a time; bigrams run across line boundaries.
#[derive(Debug, Clone, Default)]
pub struct TextProfile {
    pub lines: usize,
    pub unigrams: FrequencyTable,
    pub bigrams: FrequencyTable,
}

impl TextProfile {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = ProfileBuilder::new();
        for line in lines {
            builder.push_line(line.as_ref());
        }
        builder.finish()
    }

    #[inline]
    pub fn token_count(&self) -> u64 {
        self.unigrams.total()
    }
}

/// Incremental [`TextProfile`] construction, one line at a time.
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    lines: usize,
    unigrams: FrequencyTable,
    bigrams: NgramCounter,
}

impl Default for ProfileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileBuilder {
    pub fn new() -> Self {
        Self {
            lines: 0,
            unigrams: FrequencyTable::new(),
            bigrams: NgramCounter::new(2),
        }
    }

    pub fn push_line(&mut self, line: &str) {
        self.lines += 1;
        let tokens = crate::tokenize::tokenize_str(line);
        for token in &tokens {
            self.unigrams.add(token.as_str());
        }
        self.bigrams.feed(&tokens);
    }

    pub fn finish(self) -> TextProfile {
        TextProfile {
            lines: self.lines,
            unigrams: self.unigrams,
            bigrams: self.bigrams.finish(),
        }
    }
}
