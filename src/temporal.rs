//! Temporal (windowed) vocabulary analysis across manuscript units.
//!
//! Units (folios) are ordered by their identifier:
//!
//! ```text
//! order("12v") = 2·12 + 1 = 25      recto before verso
//! ```
//!
//! For window size w, window pair i compares units [i, i+w) with
//! [i+w, i+2w), giving N - 2w + 1 pairs for N units. Each pair reports the
//! Jaccard similarity of the two vocabularies and the JSD of their unigram
//! distributions.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::debug;

use crate::divergence::jensen_shannon_divergence;
use crate::error::{Result, StatsError};
use crate::ngram::FrequencyTable;
use crate::records::UnitTokenRecord;

/// Tokens listed in the timeline summary.
pub const SUMMARY_TOP_TOKENS: usize = 5;

static UNIT_ID_RE: OnceLock<Regex> = OnceLock::new();

fn unit_id_re() -> &'static Regex {
    UNIT_ID_RE.get_or_init(|| Regex::new(r"^(\d+)([rv])").expect("valid regex"))
}

/// Position of a unit in manuscript order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitOrder {
    pub order: u64,
    pub side: char,
}

impl UnitOrder {
    /// Parse a leading page number and side (`r`/`v`).
    ///
    /// Identifiers that do not match sort first as `(0, 'r')`.
    pub fn parse(id: &str) -> Self {
        let fallback = Self { order: 0, side: 'r' };
        let Some(caps) = unit_id_re().captures(id) else {
            return fallback;
        };
        let Ok(num) = caps[1].parse::<u64>() else {
            return fallback;
        };
        let side = if &caps[2] == "r" { 'r' } else { 'v' };
        match num
            .checked_mul(2)
            .and_then(|n| n.checked_add(u64::from(side == 'v')))
        {
            Some(order) => Self { order, side },
            None => fallback,
        }
    }
}

/// All tokens of one manuscript unit, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: String,
    pub order: UnitOrder,
    pub tokens: Vec<String>,
}

impl Unit {
    pub fn new(id: impl Into<String>, tokens: Vec<String>) -> Self {
        let id = id.into();
        Self {
            order: UnitOrder::parse(&id),
            id,
            tokens,
        }
    }

    /// Group token records by unit and sort by unit order.
    ///
    /// Records without a unit identifier are dropped. Units with equal order
    /// keep first-seen order.
    pub fn group<I>(records: I) -> Vec<Unit>
    where
        I: IntoIterator<Item = UnitTokenRecord>,
    {
        let mut units: indexmap::IndexMap<String, Vec<String>> = indexmap::IndexMap::new();
        let mut dropped = 0usize;
        for rec in records {
            match rec.unit_id() {
                Some(id) => units.entry(id.to_string()).or_default().push(rec.token),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!("Dropped {} token records without a unit id", dropped);
        }

        let mut units: Vec<Unit> = units
            .into_iter()
            .map(|(id, tokens)| Unit::new(id, tokens))
            .collect();
        units.sort_by_key(|u| u.order.order);
        units
    }

    pub fn table(&self) -> FrequencyTable {
        FrequencyTable::from_tokens(self.tokens.iter().map(String::as_str))
    }
}

/// Per-unit vocabulary statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    pub unit: String,
    pub order: u64,
    pub side: char,
    pub token_count: usize,
    pub unique_tokens: usize,
    /// distinct / total, 0 for an empty unit
    pub vocabulary_diversity: f64,
    pub most_common_token: Option<String>,
    pub most_common_freq: u64,
    pub repetition_rate: f64,
}

impl UnitStats {
    pub fn compute(unit: &Unit) -> Self {
        let table = unit.table();
        let total = unit.tokens.len();
        let (most_common_token, most_common_freq) = match table.most_common(1).pop() {
            Some((token, freq)) => (Some(token), freq),
            None => (None, 0),
        };
        Self {
            unit: unit.id.clone(),
            order: unit.order.order,
            side: unit.order.side,
            token_count: total,
            unique_tokens: table.vocab_size(),
            vocabulary_diversity: ratio(table.vocab_size() as f64, total),
            most_common_token,
            most_common_freq,
            repetition_rate: ratio(most_common_freq as f64, total),
        }
    }
}

#[inline]
fn ratio(num: f64, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num / den as f64
    }
}

/// Jaccard similarity |A ∩ B| / |A ∪ B|, defined as 0 for two empty sets.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let inter = a.intersection(b).count();
    let union = a.len() + b.len() - inter;
    if union == 0 {
        return 0.0;
    }
    inter as f64 / union as f64
}

/// Comparison of two adjacent windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowShift {
    /// First unit of the first window
    pub window_start: String,
    /// Last unit of the second window
    pub window_end: String,
    pub jaccard_similarity: f64,
    pub jsd: f64,
    pub vocab_size_1: usize,
    pub vocab_size_2: usize,
    /// In the second window but not the first
    pub new_tokens: usize,
    /// In the first window but not the second
    pub disappeared_tokens: usize,
}

/// Lazy sequence of [`WindowShift`]s.
///
/// Holds only a cursor; calling [`TemporalAnalyzer::shifts`] again restarts
/// from the first pair and yields identical values.
#[derive(Debug, Clone)]
pub struct WindowShifts<'a> {
    analyzer: &'a TemporalAnalyzer,
    next: usize,
    end: usize,
}

impl Iterator for WindowShifts<'_> {
    type Item = WindowShift;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let shift = self.analyzer.window_shift(self.next);
        self.next += 1;
        Some(shift)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.next;
        (n, Some(n))
    }
}

impl ExactSizeIterator for WindowShifts<'_> {}

/// One unit's share of a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenFrequencyPoint {
    pub unit: String,
    pub order: u64,
    pub frequency: f64,
    pub absolute_count: u64,
}

/// How one token's usage moves across the manuscript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenEvolution {
    pub token: String,
    pub first_appearance: Option<String>,
    pub last_appearance: Option<String>,
    pub total_occurrences: u64,
    pub appears_in_units: usize,
    pub evolution: Vec<TokenFrequencyPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stability {
    High,
    Moderate,
    Low,
}

impl Stability {
    /// High above 0.7 mean Jaccard, Moderate above 0.5, otherwise Low.
    pub fn from_mean_jaccard(mean: f64) -> Self {
        if mean > 0.7 {
            Stability::High
        } else if mean > 0.5 {
            Stability::Moderate
        } else {
            Stability::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stability::High => "High",
            Stability::Moderate => "Moderate",
            Stability::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversityExtreme {
    pub unit: String,
    pub diversity: f64,
}

/// Whole-manuscript digest of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSummary {
    pub units: usize,
    pub total_tokens: u64,
    pub unique_tokens: usize,
    pub global_diversity: f64,
    pub mean_diversity: f64,
    /// Sample standard deviation; 0 with fewer than two units
    pub std_diversity: f64,
    pub min_diversity: Option<DiversityExtreme>,
    pub max_diversity: Option<DiversityExtreme>,
    pub top_tokens: Vec<(String, u64)>,
    pub most_significant_shift: Option<WindowShift>,
    pub mean_jaccard: Option<f64>,
    pub mean_jsd: Option<f64>,
    pub stability: Option<Stability>,
}

/// Everything written to `timeline.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineReport {
    pub window_size: usize,
    pub summary: TimelineSummary,
    pub units: Vec<UnitStats>,
    pub shifts: Vec<WindowShift>,
    pub top_token_evolution: Option<TokenEvolution>,
}

/// Windowed analyzer over ordered units.
#[derive(Debug, Clone)]
pub struct TemporalAnalyzer {
    units: Vec<Unit>,
    window_size: usize,
}

impl TemporalAnalyzer {
    /// `units` must already be in manuscript order (see [`Unit::group`]).
    pub fn new(units: Vec<Unit>, window_size: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(StatsError::invalid("window_size", "must be at least 1"));
        }
        Ok(Self { units, window_size })
    }

    pub fn from_records<I>(records: I, window_size: usize) -> Result<Self>
    where
        I: IntoIterator<Item = UnitTokenRecord>,
    {
        Self::new(Unit::group(records), window_size)
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    #[inline]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn unit_stats(&self) -> Vec<UnitStats> {
        self.units.iter().map(UnitStats::compute).collect()
    }

    /// Number of adjacent window pairs: N - 2w + 1, or 0 when N < 2w.
    pub fn shift_count(&self) -> usize {
        let n = self.units.len();
        self.window_size
            .checked_mul(2)
            .filter(|&span| span <= n)
            .map_or(0, |span| n - span + 1)
    }

    pub fn shifts(&self) -> WindowShifts<'_> {
        WindowShifts {
            analyzer: self,
            next: 0,
            end: self.shift_count(),
        }
    }

    fn window_table(units: &[Unit]) -> FrequencyTable {
        FrequencyTable::from_tokens(units.iter().flat_map(|u| u.tokens.iter().map(String::as_str)))
    }

    fn window_shift(&self, i: usize) -> WindowShift {
        let w = self.window_size;
        let first = &self.units[i..i + w];
        let second = &self.units[i + w..i + 2 * w];

        let t1 = Self::window_table(first);
        let t2 = Self::window_table(second);
        let v1: BTreeSet<&str> = t1.keys().collect();
        let v2: BTreeSet<&str> = t2.keys().collect();

        WindowShift {
            window_start: first[0].id.clone(),
            window_end: second[w - 1].id.clone(),
            jaccard_similarity: jaccard(&v1, &v2),
            jsd: jensen_shannon_divergence(&t1.to_distribution(), &t2.to_distribution()),
            vocab_size_1: v1.len(),
            vocab_size_2: v2.len(),
            new_tokens: v2.difference(&v1).count(),
            disappeared_tokens: v1.difference(&v2).count(),
        }
    }

    /// Per-unit frequency of `token`, with first/last appearance.
    pub fn token_evolution(&self, token: &str) -> TokenEvolution {
        let evolution: Vec<TokenFrequencyPoint> = self
            .units
            .iter()
            .map(|u| {
                let count = u.tokens.iter().filter(|t| t.as_str() == token).count();
                TokenFrequencyPoint {
                    unit: u.id.clone(),
                    order: u.order.order,
                    frequency: ratio(count as f64, u.tokens.len()),
                    absolute_count: count as u64,
                }
            })
            .collect();

        let present: Vec<&TokenFrequencyPoint> =
            evolution.iter().filter(|p| p.absolute_count > 0).collect();

        TokenEvolution {
            token: token.to_string(),
            first_appearance: present.first().map(|p| p.unit.clone()),
            last_appearance: present.last().map(|p| p.unit.clone()),
            total_occurrences: present.iter().map(|p| p.absolute_count).sum(),
            appears_in_units: present.len(),
            evolution,
        }
    }

    pub fn summary(&self) -> TimelineSummary {
        let stats = self.unit_stats();
        let shifts: Vec<WindowShift> = self.shifts().collect();
        summarize(&self.units, &stats, &shifts)
    }

    /// Full report: stats, shifts, summary and the top token's evolution.
    pub fn report(&self) -> TimelineReport {
        let units = self.unit_stats();
        let shifts: Vec<WindowShift> = self.shifts().collect();
        let summary = summarize(&self.units, &units, &shifts);
        let top_token_evolution = summary
            .top_tokens
            .first()
            .map(|(token, _)| self.token_evolution(token));

        TimelineReport {
            window_size: self.window_size,
            summary,
            units,
            shifts,
            top_token_evolution,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

fn summarize(units: &[Unit], stats: &[UnitStats], shifts: &[WindowShift]) -> TimelineSummary {
    let all = FrequencyTable::from_tokens(units.iter().flat_map(|u| u.tokens.iter().map(String::as_str)));
    let diversities: Vec<f64> = stats.iter().map(|s| s.vocabulary_diversity).collect();

    // first unit wins ties in both directions
    let mut min_d: Option<&UnitStats> = None;
    let mut max_d: Option<&UnitStats> = None;
    for s in stats {
        if min_d.map_or(true, |m| s.vocabulary_diversity < m.vocabulary_diversity) {
            min_d = Some(s);
        }
        if max_d.map_or(true, |m| s.vocabulary_diversity > m.vocabulary_diversity) {
            max_d = Some(s);
        }
    }
    let extreme = |s: &UnitStats| DiversityExtreme {
        unit: s.unit.clone(),
        diversity: s.vocabulary_diversity,
    };

    let mut most_significant: Option<&WindowShift> = None;
    for shift in shifts {
        if most_significant.map_or(true, |m| shift.jsd > m.jsd) {
            most_significant = Some(shift);
        }
    }

    let (mean_jaccard, mean_jsd) = if shifts.is_empty() {
        (None, None)
    } else {
        let j: Vec<f64> = shifts.iter().map(|s| s.jaccard_similarity).collect();
        let d: Vec<f64> = shifts.iter().map(|s| s.jsd).collect();
        (Some(mean(&j)), Some(mean(&d)))
    };

    TimelineSummary {
        units: units.len(),
        total_tokens: all.total(),
        unique_tokens: all.vocab_size(),
        global_diversity: ratio(all.vocab_size() as f64, all.total() as usize),
        mean_diversity: mean(&diversities),
        std_diversity: sample_std(&diversities),
        min_diversity: min_d.map(extreme),
        max_diversity: max_d.map(extreme),
        top_tokens: all.most_common(SUMMARY_TOP_TOKENS),
        most_significant_shift: most_significant.cloned(),
        mean_jaccard,
        mean_jsd,
        stability: mean_jaccard.map(Stability::from_mean_jaccard),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn rec(token: &str, folio: &str) -> UnitTokenRecord {
        UnitTokenRecord {
            token: token.to_string(),
            folio: Some(folio.to_string()),
            page: None,
        }
    }

    fn unit(id: &str, tokens: &str) -> Unit {
        Unit::new(id, tokens.split_whitespace().map(str::to_string).collect())
    }

    fn set<'a>(items: &[&'a str]) -> BTreeSet<&'a str> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_unit_order() {
        assert_eq!(UnitOrder::parse("1r"), UnitOrder { order: 2, side: 'r' });
        assert_eq!(UnitOrder::parse("1v"), UnitOrder { order: 3, side: 'v' });
        assert_eq!(UnitOrder::parse("103v").order, 207);
        assert_eq!(UnitOrder::parse("f1r"), UnitOrder { order: 0, side: 'r' });
        assert_eq!(UnitOrder::parse("inside-front").order, 0);
        assert!(UnitOrder::parse("2r") > UnitOrder::parse("1v"));
    }

    #[test]
    fn test_unit_order_overflow_falls_back() {
        let fallback = UnitOrder { order: 0, side: 'r' };
        assert_eq!(UnitOrder::parse("9223372036854775808v"), fallback);
        assert_eq!(UnitOrder::parse("9223372036854775808r"), fallback);
        assert_eq!(UnitOrder::parse("99999999999999999999r"), fallback);
        assert_eq!(UnitOrder::parse("9223372036854775807v").order, u64::MAX);
        assert_eq!(UnitOrder::parse("9223372036854775807r").order, u64::MAX - 1);
    }

    #[test]
    fn test_group_sorts_by_order() {
        let records = vec![
            rec("ol", "2r"),
            rec("daiin", "1v"),
            rec("chedy", "1r"),
            rec("dar", "2r"),
            UnitTokenRecord {
                token: "x".into(),
                folio: None,
                page: None,
            },
        ];
        let units = Unit::group(records);
        let ids: Vec<&str> = units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["1r", "1v", "2r"]);
        assert_eq!(units[2].tokens, vec!["ol", "dar"]);
    }

    #[test]
    fn test_jaccard_properties() {
        let a = set(&["ol", "dar"]);
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&a, &set(&["chedy"])), 0.0);
        assert_eq!(jaccard(&BTreeSet::<&str>::new(), &BTreeSet::new()), 0.0);
        assert!(approx_eq(jaccard(&a, &set(&["ol"])), 0.5, 1e-12));
    }

    #[test]
    fn test_window_count_four_units() {
        let units = vec![
            unit("1r", "a b"),
            unit("1v", "b c"),
            unit("2r", "c d"),
            unit("2v", "d e"),
        ];
        let analyzer = TemporalAnalyzer::new(units, 1).unwrap();
        let shifts: Vec<WindowShift> = analyzer.shifts().collect();
        // N - 2w + 1 pairs: [i, i+w) vs [i+w, i+2w) for i = 0, 1, 2
        assert_eq!(shifts.len(), 3);
        assert_eq!(analyzer.shifts().len(), 3);
        assert_eq!(shifts[0].window_start, "1r");
        assert_eq!(shifts[0].window_end, "1v");
        assert_eq!(shifts[2].window_start, "2r");
        assert_eq!(shifts[2].window_end, "2v");
        assert!(approx_eq(shifts[0].jaccard_similarity, 1.0 / 3.0, 1e-12));
        assert_eq!(shifts[0].new_tokens, 1);
        assert_eq!(shifts[0].disappeared_tokens, 1);
    }

    #[test]
    fn test_window_size_two() {
        let units = vec![
            unit("1r", "a"),
            unit("1v", "a"),
            unit("2r", "a"),
            unit("2v", "a"),
            unit("3r", "b"),
        ];
        let analyzer = TemporalAnalyzer::new(units, 2).unwrap();
        let shifts: Vec<WindowShift> = analyzer.shifts().collect();
        assert_eq!(shifts.len(), 2);
        assert_eq!(shifts[0].jaccard_similarity, 1.0);
        assert_eq!(shifts[0].jsd, 0.0);
        assert_eq!(shifts[1].window_start, "1v");
        assert_eq!(shifts[1].window_end, "3r");
        assert!(approx_eq(shifts[1].jaccard_similarity, 0.5, 1e-12));
    }

    #[test]
    fn test_too_few_units_and_zero_window() {
        let analyzer = TemporalAnalyzer::new(vec![unit("1r", "a")], 1).unwrap();
        assert_eq!(analyzer.shifts().count(), 0);
        assert!(TemporalAnalyzer::new(Vec::new(), 0).is_err());
    }

    #[test]
    fn test_huge_window_yields_no_pairs() {
        let units = vec![unit("1r", "a"), unit("1v", "b")];
        for w in [3, usize::MAX / 2 + 1, usize::MAX] {
            let analyzer = TemporalAnalyzer::new(units.clone(), w).unwrap();
            assert_eq!(analyzer.shift_count(), 0);
            assert_eq!(analyzer.shifts().count(), 0);
            let report = analyzer.report();
            assert!(report.shifts.is_empty());
            assert!(report.summary.stability.is_none());
        }
    }

    #[test]
    fn test_shifts_restartable() {
        let units = vec![unit("1r", "a b a"), unit("1v", "b c"), unit("2r", "")];
        let analyzer = TemporalAnalyzer::new(units, 1).unwrap();
        let first: Vec<WindowShift> = analyzer.shifts().collect();
        let second: Vec<WindowShift> = analyzer.shifts().collect();
        assert_eq!(first, second);
        // empty second window is compared, not skipped
        assert_eq!(first[1].vocab_size_2, 0);
        assert_eq!(first[1].jaccard_similarity, 0.0);
    }

    #[test]
    fn test_unit_stats() {
        let s = UnitStats::compute(&unit("1r", "ol dar ol ol"));
        assert_eq!(s.token_count, 4);
        assert_eq!(s.unique_tokens, 2);
        assert!(approx_eq(s.vocabulary_diversity, 0.5, 1e-12));
        assert_eq!(s.most_common_token.as_deref(), Some("ol"));
        assert!(approx_eq(s.repetition_rate, 0.75, 1e-12));

        let empty = UnitStats::compute(&unit("1v", ""));
        assert_eq!(empty.vocabulary_diversity, 0.0);
        assert_eq!(empty.most_common_token, None);
    }

    #[test]
    fn test_token_evolution() {
        let units = vec![unit("1r", "ol dar"), unit("1v", "chedy"), unit("2r", "ol ol")];
        let analyzer = TemporalAnalyzer::new(units, 1).unwrap();
        let evo = analyzer.token_evolution("ol");
        assert_eq!(evo.first_appearance.as_deref(), Some("1r"));
        assert_eq!(evo.last_appearance.as_deref(), Some("2r"));
        assert_eq!(evo.total_occurrences, 3);
        assert_eq!(evo.appears_in_units, 2);
        assert!(approx_eq(evo.evolution[0].frequency, 0.5, 1e-12));

        let none = analyzer.token_evolution("qokedy");
        assert_eq!(none.first_appearance, None);
        assert_eq!(none.appears_in_units, 0);
    }

    #[test]
    fn test_summary() {
        let units = vec![unit("1r", "a b"), unit("1v", "a b"), unit("2r", "c c")];
        let analyzer = TemporalAnalyzer::new(units, 1).unwrap();
        let s = analyzer.summary();
        assert_eq!(s.units, 3);
        assert_eq!(s.total_tokens, 6);
        assert_eq!(s.unique_tokens, 3);
        assert!(approx_eq(s.global_diversity, 0.5, 1e-12));
        assert_eq!(s.min_diversity.as_ref().unwrap().unit, "2r");
        assert_eq!(s.max_diversity.as_ref().unwrap().unit, "1r");
        assert_eq!(s.most_significant_shift.as_ref().unwrap().window_start, "1v");
        assert!(approx_eq(s.mean_jaccard.unwrap(), 0.5, 1e-12));
        assert_eq!(s.stability, Some(Stability::Low));
        assert_eq!(s.top_tokens[0], ("a".to_string(), 2));
    }

    #[test]
    fn test_stability_labels() {
        assert_eq!(Stability::from_mean_jaccard(0.8), Stability::High);
        assert_eq!(Stability::from_mean_jaccard(0.7), Stability::Moderate);
        assert_eq!(Stability::from_mean_jaccard(0.5), Stability::Low);
    }
}
