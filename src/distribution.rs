//! Probability distributions derived from frequency tables.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ngram::FrequencyTable;

/// Symbol → probability mapping.
///
/// Built by dividing every count by the table total. An empty table maps to
/// an empty distribution (the zero measure); it never gets probability 1
/// anywhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbabilityDistribution {
    probs: IndexMap<String, f64>,
}

impl ProbabilityDistribution {
    /// Normalize a frequency table
    pub fn from_table(table: &FrequencyTable) -> Self {
        let total = table.total();
        if total == 0 {
            return Self::default();
        }
        let total = total as f64;
        let probs = table
            .iter()
            .map(|(k, c)| (k.to_string(), c as f64 / total))
            .collect();
        Self { probs }
    }

    /// Build from explicit probabilities (first-seen order is kept).
    ///
    /// Values are taken as given; zero entries are dropped.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let probs = pairs
            .into_iter()
            .filter(|(_, p)| *p > 0.0)
            .map(|(k, p)| (k.into(), p))
            .collect();
        Self { probs }
    }

    /// Probability of `key` (0.0 when absent)
    #[inline]
    pub fn get(&self, key: &str) -> f64 {
        self.probs.get(key).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.probs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Total mass (≈ 1.0 for a non-empty distribution, 0.0 when empty)
    pub fn mass(&self) -> f64 {
        self.probs.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.probs.iter().map(|(k, &p)| (k.as_str(), p))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.probs.keys().map(|k| k.as_str())
    }

    /// Shannon entropy H(P) = -Σ p log2 p, in bits
    pub fn entropy(&self) -> f64 {
        self.probs
            .values()
            .filter(|&&p| p > 0.0)
            .map(|&p| -p * p.log2())
            .sum()
    }

    /// Top `k` symbols by descending probability, ties in first-seen order
    pub fn top_k(&self, k: usize) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_mass_sums_to_one() {
        let table = FrequencyTable::from_tokens(["a", "b", "b", "c", "c", "c", "d"]);
        let dist = table.to_distribution();
        assert!(approx_eq(dist.mass(), 1.0, 1e-9));
        assert!(approx_eq(dist.get("c"), 3.0 / 7.0, 1e-12));
        assert_eq!(dist.get("missing"), 0.0);
    }

    #[test]
    fn test_empty_table_is_zero_measure() {
        let dist = FrequencyTable::new().to_distribution();
        assert!(dist.is_empty());
        assert_eq!(dist.mass(), 0.0);
        assert_eq!(dist.entropy(), 0.0);
    }

    #[test]
    fn test_top_k_tie_break() {
        let dist = ProbabilityDistribution::from_pairs([("a", 0.5), ("b", 0.5)]);
        assert_eq!(dist.top_k(1), vec![("a", 0.5)]);
        let dist = ProbabilityDistribution::from_pairs([("b", 0.5), ("a", 0.5)]);
        assert_eq!(dist.top_k(1), vec![("b", 0.5)]);
    }

    #[test]
    fn test_from_pairs_drops_zero() {
        let dist = ProbabilityDistribution::from_pairs([("a", 1.0), ("b", 0.0)]);
        assert_eq!(dist.len(), 1);
    }
}
