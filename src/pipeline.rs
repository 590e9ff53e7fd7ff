//! End-to-end run: ingest → metrics → corpus comparison → timeline.
//!
//! Each stage is also exposed on its own so the CLI subcommands share the
//! exact code path the full pipeline takes. The pipeline fails fast on the
//! first error.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::compare::{list_corpus_files, load_corpora, ComparisonReport, Corpus, CorpusComparator};
use crate::config::{AnalysisConfig, RunConfig};
use crate::error::{Result, StatsError};
use crate::ingest::{extract_takahashi, ingest_text, token_records, NormalizeOptions};
use crate::langcompare::{compare_languages, manuscript_terms, LanguageReport};
use crate::metrics::CorpusMetrics;
use crate::records::{decode_ignoring_invalid, read_jsonl, read_lines_from_jsonl, write_jsonl, UnitTokenRecord};
use crate::report::{self, RunMetadata};
use crate::temporal::{TemporalAnalyzer, TimelineReport};

/// What a pipeline run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub run_id: String,
    pub records: usize,
    pub corpora_compared: usize,
    pub timeline_units: Option<usize>,
    pub artifacts: Vec<PathBuf>,
}

/// Read a text file, dropping invalid UTF-8.
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| StatsError::io(path, e))?;
    Ok(decode_ignoring_invalid(&bytes))
}

/// Normalize a raw transcription into transcription JSONL. Returns the
/// number of records written.
pub fn ingest_file(input: &Path, output: &Path, opts: &NormalizeOptions) -> Result<usize> {
    let raw = read_text_lossy(input)?;
    let records = ingest_text(&raw, opts);
    write_jsonl(output, &records)?;
    info!("Wrote {} records to {}", records.len(), output.display());
    Ok(records.len())
}

/// Extract the Takahashi transcription lines to a plain-text file.
pub fn extract_takahashi_file(input: &Path, output: &Path) -> Result<usize> {
    let lines = extract_takahashi(&read_text_lossy(input)?);
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StatsError::io(parent, e))?;
    }
    fs::write(output, out).map_err(|e| StatsError::io(output, e))?;
    info!("Wrote {} Takahashi lines to {}", lines.len(), output.display());
    Ok(lines.len())
}

/// Explode transcription JSONL into per-token JSONL.
pub fn tokenize_file(input: &Path, output: &Path) -> Result<usize> {
    let records = read_jsonl(input)?;
    let tokens = token_records(&records);
    write_jsonl(output, &tokens)?;
    info!("Wrote {} token records to {}", tokens.len(), output.display());
    Ok(tokens.len())
}

/// Corpus metrics of a transcription JSONL file.
pub fn compute_metrics(input: &Path, analysis: &AnalysisConfig) -> Result<CorpusMetrics> {
    let lines = read_lines_from_jsonl(input)?;
    Ok(CorpusMetrics::compute(
        &lines,
        analysis.top_n,
        analysis.zipf_max_ranks,
    ))
}

/// Compare a transcription JSONL file against every corpus in `corpora_dir`.
pub fn compare_corpora(input: &Path, corpora_dir: &Path, analysis: &AnalysisConfig) -> Result<ComparisonReport> {
    let lines = read_lines_from_jsonl(input)?;
    let manuscript = Corpus::from_lines("manuscript", input, &lines);
    let corpora = load_corpora(corpora_dir)?;
    CorpusComparator::new(analysis.comparator())?.compare(&manuscript, &corpora)
}

/// Character n-gram comparison of the manuscript vocabulary.
pub fn compare_language_corpora(input: &Path, corpora_dir: &Path, top_k: usize) -> Result<LanguageReport> {
    let lines = read_lines_from_jsonl(input)?;
    let terms = manuscript_terms(&lines);
    compare_languages(&terms, corpora_dir, top_k)
}

/// Windowed timeline over a token-coordinate JSONL file.
pub fn analyze_timeline(token_coords: &Path, window_size: usize) -> Result<TimelineReport> {
    let records: Vec<UnitTokenRecord> = read_jsonl(token_coords)?;
    let analyzer = TemporalAnalyzer::from_records(records, window_size)?;
    info!(
        "Timeline over {} units, {} window pairs",
        analyzer.units().len(),
        analyzer.shift_count()
    );
    Ok(analyzer.report())
}

fn has_files(dir: &Path) -> Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    Ok(!list_corpus_files(dir)?.is_empty())
}

pub struct Pipeline;

impl Pipeline {
    pub fn run(config: &RunConfig) -> Result<PipelineSummary> {
        config.validate()?;
        let paths = &config.paths;
        let analysis = &config.analysis;
        let meta = RunMetadata::new(
            Some(&paths.input),
            serde_json::to_value(analysis)?,
        );
        info!("Starting run {}", meta.run_id);

        let mut artifacts = Vec::new();

        // 1) ingest
        let processed = config.processed_path();
        info!("Stage 1/5: ingest {}", paths.input.display());
        let records = ingest_file(&paths.input, &processed, &config.normalize)?;
        artifacts.push(processed.clone());

        // 2) tokenize
        let tokens_path = config.tokens_path();
        info!("Stage 2/5: tokenize");
        tokenize_file(&processed, &tokens_path)?;
        artifacts.push(tokens_path);

        // 3) metrics
        info!("Stage 3/5: metrics");
        let metrics = compute_metrics(&processed, analysis)?;
        let metrics_meta = meta.with_params(serde_json::json!({
            "top_n": analysis.top_n,
            "zipf_max_ranks": analysis.zipf_max_ranks,
        }));
        artifacts.extend(report::write_metrics(&paths.output_dir, &metrics, &metrics_meta)?);

        // 4) corpus comparison
        let mut corpora_compared = 0;
        if has_files(&paths.corpora_dir)? {
            info!("Stage 4/5: compare against {}", paths.corpora_dir.display());
            let out_dir = config.comparison_dir();
            let comparison = compare_corpora(&processed, &paths.corpora_dir, analysis)?;
            corpora_compared = comparison.results.len();
            artifacts.extend(report::write_comparison(
                &out_dir,
                &comparison,
                &paths.corpora_dir,
                &meta,
            )?);

            let languages = compare_language_corpora(&processed, &paths.corpora_dir, analysis.top_k)?;
            artifacts.extend(report::write_language_report(&out_dir, &languages, &meta)?);
        } else {
            info!(
                "Stage 4/5: skipped, no corpora under {}",
                paths.corpora_dir.display()
            );
        }

        // 5) timeline
        let mut timeline_units = None;
        match &paths.token_coords {
            Some(coords) => {
                info!("Stage 5/5: timeline over {}", coords.display());
                let timeline = analyze_timeline(coords, analysis.window_size)?;
                timeline_units = Some(timeline.summary.units);
                let timeline_meta = RunMetadata {
                    input_file: Some(coords.display().to_string()),
                    params: serde_json::json!({ "window_size": analysis.window_size }),
                    ..meta.clone()
                };
                artifacts.extend(report::write_timeline(
                    &config.timeline_dir(),
                    &timeline,
                    &timeline_meta,
                )?);
            }
            None => info!("Stage 5/5: skipped, no token coordinates configured"),
        }

        info!("Run {} wrote {} artifacts", meta.run_id, artifacts.len());
        Ok(PipelineSummary {
            run_id: meta.run_id,
            records,
            corpora_compared,
            timeline_units,
            artifacts,
        })
    }
}
