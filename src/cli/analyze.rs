//! stats, metrics, compare, compare-languages and timeline commands

use anyhow::{bail, Context, Result};
use std::path::Path;

use glyphstat::config::RunConfig;
use glyphstat::metrics::NgramStats;
use glyphstat::pipeline::{analyze_timeline, compare_corpora, compare_language_corpora, compute_metrics};
use glyphstat::records::read_lines_from_jsonl;
use glyphstat::report::{self, RunMetadata};

pub fn run_stats(input: &Path, output: &Path, top: usize) -> Result<()> {
    let lines = read_lines_from_jsonl(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let stats = NgramStats::compute(&lines, top);
    report::write_ngram_stats(output, &stats)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Lines: {}", stats.lines);
    println!("Tokens: {}", stats.tokens);
    println!("Unigram entropy: {:.4}", stats.unigram_entropy);
    println!("Top unigrams:");
    for (w, c) in &stats.top_unigrams {
        println!("  {}: {}", w, c);
    }
    println!("Top bigrams:");
    for (w, c) in &stats.top_bigrams {
        println!("  {}: {}", w, c);
    }
    Ok(())
}

pub fn run_metrics(input: &Path, out: &Path, config: &RunConfig) -> Result<()> {
    config.validate()?;
    let metrics = compute_metrics(input, &config.analysis)
        .with_context(|| format!("Failed to compute metrics for {}", input.display()))?;
    let meta = RunMetadata::new(
        Some(input),
        serde_json::json!({
            "top_n": config.analysis.top_n,
            "zipf_max_ranks": config.analysis.zipf_max_ranks,
        }),
    );
    let written = report::write_metrics(out, &metrics, &meta)?;

    for note in metrics.interpret() {
        println!("- {}", note);
    }
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

pub fn run_compare(input: &Path, out: &Path, config: &RunConfig) -> Result<()> {
    config.validate()?;
    let corpora_dir = &config.paths.corpora_dir;
    if !corpora_dir.is_dir() {
        bail!("Corpora directory {} does not exist", corpora_dir.display());
    }

    let comparison = compare_corpora(input, corpora_dir, &config.analysis)
        .with_context(|| format!("Failed to compare {}", input.display()))?;
    let meta = RunMetadata::new(Some(input), serde_json::to_value(config.analysis.comparator())?);
    report::write_comparison(out, &comparison, corpora_dir, &meta)?;

    println!("{:<24} {:>12} {:>12}", "corpus", "jsd_unigram", "jsd_bigram");
    for r in &comparison.results {
        println!("{:<24} {:>12.6} {:>12.6}", r.corpus, r.jsd_unigram, r.jsd_bigram);
    }
    println!("Wrote comparison outputs to {}", out.display());
    Ok(())
}

pub fn run_compare_languages(input: &Path, out: &Path, config: &RunConfig) -> Result<()> {
    config.validate()?;
    let languages = compare_language_corpora(input, &config.paths.corpora_dir, config.analysis.top_k)
        .with_context(|| format!("Failed to compare languages for {}", input.display()))?;
    let meta = RunMetadata::new(Some(input), serde_json::json!({ "top_k": config.analysis.top_k }));
    report::write_language_report(out, &languages, &meta)?;

    if let Some(note) = &languages.note {
        println!("{}", note);
    }
    for lang in &languages.corpora_analyzed {
        for r in &lang.results {
            println!(
                "{} {}-gram: jsd={:.4} overlap={:.2}",
                lang.corpus, r.n, r.js_divergence, r.top_k_overlap
            );
        }
    }
    println!("Wrote compare_report.json to {}", out.display());
    Ok(())
}

pub fn run_timeline(out: &Path, config: &RunConfig) -> Result<()> {
    config.validate()?;
    let Some(coords) = config.paths.token_coords.as_deref() else {
        bail!("No token coordinates given (use --token-coords or paths.token_coords)");
    };

    let timeline = analyze_timeline(coords, config.analysis.window_size)
        .with_context(|| format!("Failed to analyze {}", coords.display()))?;
    let meta = RunMetadata::new(
        Some(coords),
        serde_json::json!({ "window_size": config.analysis.window_size }),
    );
    let written = report::write_timeline(out, &timeline, &meta)?;

    let s = &timeline.summary;
    println!(
        "Units: {}, tokens: {}, unique: {}, window pairs: {}",
        s.units,
        s.total_tokens,
        s.unique_tokens,
        timeline.shifts.len()
    );
    if let Some(stability) = s.stability {
        println!("Vocabulary stability: {}", stability.label());
    }
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
