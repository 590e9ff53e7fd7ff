//! Report writers.
//!
//! Every JSON artifact carries a [`RunMetadata`] block so results from
//! different runs can be told apart. Markdown and CSV renderers are pure
//! functions returning `String`; `write_*` functions put them on disk.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::compare::ComparisonReport;
use crate::error::{Result, StatsError};
use crate::langcompare::LanguageReport;
use crate::metrics::{CorpusMetrics, NgramStats};
use crate::temporal::TimelineReport;

/// Top-list entries rendered in Markdown.
const MAX_MARKDOWN_ITEMS: usize = 50;

/// Provenance attached to every JSON record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// UUID v4, simple (hex) form
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub input_file: Option<String>,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RunMetadata {
    pub fn new(input_file: Option<&Path>, params: serde_json::Value) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().simple().to_string(),
            generated_at: Utc::now(),
            input_file: input_file.map(|p| p.display().to_string()),
            params,
        }
    }

    /// Same run, different parameters
    pub fn with_params(&self, params: serde_json::Value) -> Self {
        Self {
            params,
            ..self.clone()
        }
    }

    pub fn timestamp(&self) -> String {
        self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// A record with its run metadata under `metadata`.
#[derive(Debug, Serialize)]
pub struct Stamped<'a, T: Serialize> {
    #[serde(flatten)]
    pub record: &'a T,
    pub metadata: &'a RunMetadata,
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| StatsError::io(dir, e))
}

fn write_string(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    fs::write(path, content).map_err(|e| StatsError::io(path, e))
}

/// Pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_string(path, &json)
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{:.*}", precision, v))
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

pub fn render_metrics_markdown(metrics: &CorpusMetrics, meta: &RunMetadata) -> String {
    let mut md = String::from("# Experiment metrics summary\n\n");
    md.push_str(&format!("Generated: {} (run {})\n\n", meta.timestamp(), meta.run_id));
    if let Some(input) = &meta.input_file {
        md.push_str(&format!("Input: {}\n\n", input));
    }

    md.push_str("## Overview\n\n");
    md.push_str(&format!("- Lines: {}\n", metrics.lines));
    md.push_str(&format!("- Tokens: {}\n", metrics.tokens));
    md.push_str(&format!("- Vocabulary size: {}\n", metrics.vocab_size));
    md.push_str(&format!(
        "- Hapax legomena: {} (ratio {:.4})\n",
        metrics.hapax_legomena, metrics.hapax_ratio
    ));
    md.push_str(&format!(
        "- Unigram entropy (bits): {:.4}\n",
        metrics.unigram_entropy_bits
    ));
    md.push_str(&format!(
        "- Zipf slope (log-log): {}\n",
        fmt_opt(metrics.zipf_slope_loglog, 4)
    ));

    md.push_str("\n## Interpretation notes\n\n");
    for note in metrics.interpret() {
        md.push_str(&format!("- {}\n", note));
    }

    md.push_str("\n## Top unigrams\n\n");
    for (w, c) in metrics.top_unigrams.iter().take(MAX_MARKDOWN_ITEMS) {
        md.push_str(&format!("- {}: {}\n", w, c));
    }

    md.push_str("\n## Top bigrams\n\n");
    for (w, c) in metrics.top_bigrams.iter().take(MAX_MARKDOWN_ITEMS) {
        md.push_str(&format!("- {}: {}\n", w, c));
    }

    md
}

/// `experiment_metrics.json` and `experiment_metrics.md` under `out_dir`.
pub fn write_metrics(out_dir: &Path, metrics: &CorpusMetrics, meta: &RunMetadata) -> Result<Vec<PathBuf>> {
    let json_path = out_dir.join("experiment_metrics.json");
    let md_path = out_dir.join("experiment_metrics.md");

    write_json(
        &json_path,
        &Stamped {
            record: metrics,
            metadata: meta,
        },
    )?;
    write_string(&md_path, &render_metrics_markdown(metrics, meta))?;

    info!("Wrote metrics to {}", json_path.display());
    Ok(vec![json_path, md_path])
}

/// Full n-gram count dump written by the `stats` command.
#[derive(Debug, Serialize)]
struct NgramDump<'a> {
    lines: usize,
    tokens: u64,
    unigram_entropy: f64,
    unigrams: &'a crate::ngram::FrequencyTable,
    bigrams: &'a crate::ngram::FrequencyTable,
    trigrams: &'a crate::ngram::FrequencyTable,
}

pub fn write_ngram_stats(path: &Path, stats: &NgramStats) -> Result<()> {
    write_json(
        path,
        &NgramDump {
            lines: stats.lines,
            tokens: stats.tokens,
            unigram_entropy: stats.unigram_entropy,
            unigrams: &stats.unigrams,
            bigrams: &stats.bigrams,
            trigrams: &stats.trigrams,
        },
    )
}

// ---------------------------------------------------------------------------
// Corpus comparison
// ---------------------------------------------------------------------------

/// Quote a CSV field when it contains a separator, quote or newline.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn render_summary_csv(report: &ComparisonReport) -> String {
    let mut out = String::from("corpus,jsd_unigram,jsd_bigram,embedding_similarity\n");
    for r in &report.results {
        out.push_str(&format!(
            "{},{},{},{}\n",
            csv_field(&r.corpus),
            r.jsd_unigram,
            r.jsd_bigram,
            r.embedding_similarity.map(|v| v.to_string()).unwrap_or_default()
        ));
    }
    out
}

pub fn render_summary_markdown(report: &ComparisonReport) -> String {
    let mut md = String::from("# Corpus comparison summary\n\n");
    md.push_str(&format!("Manuscript source: {}\n\n", report.manuscript));
    md.push_str("| corpus | jsd_unigram | jsd_bigram | top_k_overlap | embedding_similarity |\n");
    md.push_str("|---|---:|---:|---:|---:|\n");
    for r in &report.results {
        md.push_str(&format!(
            "| {} | {:.6} | {:.6} | {} | {} |\n",
            r.corpus,
            r.jsd_unigram,
            r.jsd_bigram,
            r.top_k_overlap
                .as_ref()
                .map(|o| format!("{:.3}", o.fraction))
                .unwrap_or_default(),
            r.embedding_similarity
                .map(|v| format!("{:.4}", v))
                .unwrap_or_default()
        ));
    }
    md
}

/// Write the comparison artifacts into `out_dir`.
pub fn write_comparison(
    out_dir: &Path,
    report: &ComparisonReport,
    corpora_dir: &Path,
    meta: &RunMetadata,
) -> Result<Vec<PathBuf>> {
    ensure_dir(out_dir)?;
    let mut written = Vec::with_capacity(report.results.len() + 3);

    let meta_path = out_dir.join("comparison_metadata.json");
    write_json(
        &meta_path,
        &serde_json::json!({
            "run_id": meta.run_id,
            "generated_at": meta.generated_at,
            "manuscript_source": report.manuscript,
            "corpora_dir": corpora_dir.display().to_string(),
        }),
    )?;
    written.push(meta_path);

    for r in &report.results {
        let path = out_dir.join(format!("{}_details.json", r.corpus));
        let corpus_meta = meta.with_params(serde_json::json!({ "corpus": r.corpus }));
        write_json(
            &path,
            &Stamped {
                record: r,
                metadata: &corpus_meta,
            },
        )?;
        written.push(path);
    }

    let csv_path = out_dir.join("summary.csv");
    write_string(&csv_path, &render_summary_csv(report))?;
    written.push(csv_path);

    let md_path = out_dir.join("summary.md");
    write_string(&md_path, &render_summary_markdown(report))?;
    written.push(md_path);

    info!("Wrote comparison outputs to {}", out_dir.display());
    Ok(written)
}

// ---------------------------------------------------------------------------
// Character n-gram language comparison
// ---------------------------------------------------------------------------

pub fn write_language_report(out_dir: &Path, report: &LanguageReport, meta: &RunMetadata) -> Result<Vec<PathBuf>> {
    ensure_dir(out_dir)?;
    let mut written = Vec::new();

    let json_path = out_dir.join("compare_report.json");
    write_json(
        &json_path,
        &Stamped {
            record: report,
            metadata: meta,
        },
    )?;
    written.push(json_path);

    for lang in &report.corpora_analyzed {
        let path = out_dir.join(format!("{}_summary.csv", lang.corpus));
        let mut csv =
            String::from("ngram,js_divergence,top_overlap,manuscript_total,corpus_total,example_common\n");
        for r in &lang.results {
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                r.n,
                r.js_divergence,
                r.top_k_overlap,
                r.manuscript_total_ngrams,
                r.corpus_total_ngrams,
                csv_field(&r.example_common.join(";"))
            ));
        }
        write_string(&path, &csv)?;
        written.push(path);
    }

    Ok(written)
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

pub fn render_timeline_markdown(report: &TimelineReport, meta: &RunMetadata) -> String {
    let s = &report.summary;
    let mut md = String::from("# Timeline Analysis Report\n\n");
    md.push_str(&format!("**Analysis Date**: {}\n\n", meta.timestamp()));

    md.push_str("## Dataset Summary\n\n");
    md.push_str(&format!("- **Total Units Analyzed**: {}\n", s.units));
    md.push_str(&format!("- **Total Tokens**: {}\n", s.total_tokens));
    md.push_str(&format!("- **Unique Tokens**: {}\n", s.unique_tokens));
    md.push_str(&format!(
        "- **Global Vocabulary Diversity**: {:.3}\n\n",
        s.global_diversity
    ));

    md.push_str("| unit | token_count | unique_tokens | vocabulary_diversity |\n");
    md.push_str("|---|---:|---:|---:|\n");
    for u in &report.units {
        md.push_str(&format!(
            "| {} | {} | {} | {:.3} |\n",
            u.unit, u.token_count, u.unique_tokens, u.vocabulary_diversity
        ));
    }

    md.push_str("\n## Top Tokens\n\n");
    for (i, (token, count)) in s.top_tokens.iter().enumerate() {
        let pct = if s.total_tokens == 0 {
            0.0
        } else {
            *count as f64 / s.total_tokens as f64 * 100.0
        };
        md.push_str(&format!(
            "{}. **{}**: {} occurrences ({:.2}%)\n",
            i + 1,
            token,
            count,
            pct
        ));
    }

    md.push_str("\n## Vocabulary Diversity\n\n");
    md.push_str(&format!("- **Mean Diversity**: {:.3}\n", s.mean_diversity));
    md.push_str(&format!("- **Std Deviation**: {:.3}\n", s.std_diversity));
    if let Some(min) = &s.min_diversity {
        md.push_str(&format!(
            "- **Min Diversity**: {:.3} (Unit: {})\n",
            min.diversity, min.unit
        ));
    }
    if let Some(max) = &s.max_diversity {
        md.push_str(&format!(
            "- **Max Diversity**: {:.3} (Unit: {})\n",
            max.diversity, max.unit
        ));
    }

    if let Some(shift) = &s.most_significant_shift {
        md.push_str(&format!(
            "\n## Vocabulary Shifts (window size {})\n\n",
            report.window_size
        ));
        md.push_str(&format!(
            "The largest shift occurs between **{}** and **{}**:\n\n",
            shift.window_start, shift.window_end
        ));
        md.push_str(&format!("- **Jensen-Shannon Divergence**: {:.3}\n", shift.jsd));
        md.push_str(&format!(
            "- **Jaccard Similarity**: {:.3}\n",
            shift.jaccard_similarity
        ));
        md.push_str(&format!("- **New Tokens Introduced**: {}\n", shift.new_tokens));
        md.push_str(&format!(
            "- **Tokens Disappeared**: {}\n\n",
            shift.disappeared_tokens
        ));
        md.push_str(&format!(
            "- **Mean Jaccard Similarity**: {}\n",
            fmt_opt(s.mean_jaccard, 3)
        ));
        md.push_str(&format!("- **Mean JS Divergence**: {}\n", fmt_opt(s.mean_jsd, 3)));
        if let Some(stability) = s.stability {
            md.push_str(&format!("- **Vocabulary Stability**: {}\n", stability.label()));
        }
    }

    if let Some(evo) = &report.top_token_evolution {
        md.push_str(&format!("\n## Most Common Token: \"{}\"\n\n", evo.token));
        md.push_str(&format!(
            "- **First Appearance**: {}\n",
            evo.first_appearance.as_deref().unwrap_or("N/A")
        ));
        md.push_str(&format!(
            "- **Last Appearance**: {}\n",
            evo.last_appearance.as_deref().unwrap_or("N/A")
        ));
        md.push_str(&format!("- **Total Occurrences**: {}\n", evo.total_occurrences));
        md.push_str(&format!(
            "- **Appears in {} / {} units**\n",
            evo.appears_in_units, s.units
        ));
    }

    md
}

/// `timeline.json` and `timeline_analysis.md` under `out_dir`.
pub fn write_timeline(out_dir: &Path, report: &TimelineReport, meta: &RunMetadata) -> Result<Vec<PathBuf>> {
    let json_path = out_dir.join("timeline.json");
    let md_path = out_dir.join("timeline_analysis.md");

    write_json(
        &json_path,
        &Stamped {
            record: report,
            metadata: meta,
        },
    )?;
    write_string(&md_path, &render_timeline_markdown(report, meta))?;

    info!("Wrote timeline report to {}", md_path.display());
    Ok(vec![json_path, md_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{ComparatorConfig, Corpus, CorpusComparator};
    use crate::temporal::{TemporalAnalyzer, Unit};

    fn meta() -> RunMetadata {
        RunMetadata::new(Some(Path::new("ms.jsonl")), serde_json::json!({ "top_n": 5 }))
    }

    fn comparison() -> ComparisonReport {
        let ms = Corpus::from_lines("manuscript", "ms.jsonl", ["daiin ol daiin"]);
        let corpora = vec![
            Corpus::from_lines("far", "far.txt", ["lorem ipsum"]),
            Corpus::from_lines("near", "near.txt", ["daiin ol"]),
        ];
        CorpusComparator::new(ComparatorConfig::default())
            .unwrap()
            .compare(&ms, &corpora)
            .unwrap()
    }

    #[test]
    fn test_run_metadata() {
        let m = meta();
        assert_eq!(m.run_id.len(), 32);
        assert!(m.run_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(m.timestamp().ends_with('Z'));
        assert_ne!(m.run_id, meta().run_id);
    }

    #[test]
    fn test_metrics_json_carries_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let metrics = CorpusMetrics::compute(["ol"], 5, 1000);
        let written = write_metrics(dir.path(), &metrics, &meta()).unwrap();
        assert_eq!(written.len(), 2);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert_eq!(json["tokens"], 1);
        assert!(json["zipf_slope_loglog"].is_null());
        assert_eq!(json["metadata"]["input_file"], "ms.jsonl");
        assert_eq!(json["metadata"]["params"]["top_n"], 5);

        let md = fs::read_to_string(&written[1]).unwrap();
        assert!(md.contains("Zipf slope (log-log): N/A"));
    }

    #[test]
    fn test_summary_csv_ranked_and_blank_embedding() {
        let csv = render_summary_csv(&comparison());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "corpus,jsd_unigram,jsd_bigram,embedding_similarity");
        assert!(lines[1].starts_with("near,"));
        assert!(lines[1].ends_with(','));
        assert!(lines[2].starts_with("far,"));
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_write_comparison_files() {
        let dir = tempfile::tempdir().unwrap();
        let written =
            write_comparison(dir.path(), &comparison(), Path::new("corpora"), &meta()).unwrap();
        assert_eq!(written.len(), 5);
        assert!(dir.path().join("near_details.json").is_file());

        let detail: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("far_details.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(detail["corpus"], "far");
        assert!(detail["embedding_similarity"].is_null());
        assert_eq!(detail["metadata"]["params"]["corpus"], "far");

        let md = fs::read_to_string(dir.path().join("summary.md")).unwrap();
        assert!(md.find("| near |").unwrap() < md.find("| far |").unwrap());
    }

    #[test]
    fn test_timeline_markdown() {
        let units = vec![
            Unit::new("1r", vec!["ol".into(), "dar".into()]),
            Unit::new("1v", vec!["ol".into()]),
        ];
        let report = TemporalAnalyzer::new(units, 1).unwrap().report();
        let md = render_timeline_markdown(&report, &meta());
        assert!(md.contains("**Total Units Analyzed**: 2"));
        assert!(md.contains("between **1r** and **1v**"));
        assert!(md.contains("Most Common Token: \"ol\""));

        let dir = tempfile::tempdir().unwrap();
        let written = write_timeline(dir.path(), &report, &meta()).unwrap();
        assert!(written.iter().all(|p| p.is_file()));
    }
}
