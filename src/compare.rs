//! Corpus comparator.
//!
//! Compares the manuscript against a set of named reference corpora:
//!
//! ```text
//! JSD_uni(M, C) = JS(P_M, P_C)      over unigram distributions
//! JSD_bi(M, C)  = JS(B_M, B_C)      over bigram distributions
//! ```
//!
//! Results are ranked ascending by unigram JSD (most similar first).
//! Per-corpus work shares no mutable state, so it can run on rayon workers.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::distribution::ProbabilityDistribution;
use crate::divergence::{jensen_shannon_divergence, top_k_overlap, TopKOverlap};
use crate::error::{Result, StatsError};
use crate::ngram::{ProfileBuilder, TextProfile};
use crate::records::for_each_line_lossy;

/// Lines kept per corpus for the embedding collaborator.
pub const EMBEDDING_SAMPLE_LINES: usize = 200;

/// External sentence-embedding similarity between two texts.
///
/// Implementations live outside this crate; `None` means the score could not
/// be produced and is reported as absent.
pub trait EmbeddingSimilarity {
    fn similarity(&self, manuscript: &[String], corpus: &[String]) -> Option<f64>;
}

/// A named text with its counted profile.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub name: String,
    pub source: PathBuf,
    pub profile: TextProfile,
    /// First [`EMBEDDING_SAMPLE_LINES`] non-empty lines
    pub sample: Vec<String>,
}

impl Corpus {
    /// Build from already-read lines
    pub fn from_lines<I, S>(name: impl Into<String>, source: impl Into<PathBuf>, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = ProfileBuilder::new();
        let mut sample = Vec::new();
        for line in lines {
            let line = line.as_ref();
            keep_sample(&mut sample, line);
            builder.push_line(line);
        }
        Self {
            name: name.into(),
            source: source.into(),
            profile: builder.finish(),
            sample,
        }
    }

    /// Stream a plain-text file line by line. The name is the file stem.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut builder = ProfileBuilder::new();
        let mut sample = Vec::new();
        for_each_line_lossy(path, |line| {
            keep_sample(&mut sample, line);
            builder.push_line(line);
        })?;

        Ok(Self {
            name,
            source: path.to_path_buf(),
            profile: builder.finish(),
            sample,
        })
    }

    pub fn unigram_distribution(&self) -> ProbabilityDistribution {
        self.profile.unigrams.to_distribution()
    }

    pub fn bigram_distribution(&self) -> ProbabilityDistribution {
        self.profile.bigrams.to_distribution()
    }
}

fn keep_sample(sample: &mut Vec<String>, line: &str) {
    if sample.len() < EMBEDDING_SAMPLE_LINES && !line.trim().is_empty() {
        sample.push(line.to_string());
    }
}

/// Regular files directly under `dir`, sorted by path.
pub fn list_corpus_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| StatsError::io(dir, e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Load every reference corpus under `dir`.
///
/// A file that cannot be read is logged and skipped; the directory itself
/// must exist.
pub fn load_corpora(dir: &Path) -> Result<Vec<Corpus>> {
    let mut corpora = Vec::new();
    for path in list_corpus_files(dir)? {
        match Corpus::from_path(&path) {
            Ok(corpus) => {
                debug!(
                    "Loaded corpus {} ({} tokens)",
                    corpus.name,
                    corpus.profile.token_count()
                );
                corpora.push(corpus);
            }
            Err(err) => warn!("Skipping corpus {}: {}", path.display(), err),
        }
    }
    Ok(corpora)
}

/// Comparison of the manuscript against one corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceResult {
    pub corpus: String,
    pub source: String,
    pub jsd_unigram: f64,
    pub jsd_bigram: f64,
    pub top_k_overlap: Option<TopKOverlap>,
    /// Null when no embedding collaborator is configured or it declined
    pub embedding_similarity: Option<f64>,
    pub top_unigrams: Vec<(String, u64)>,
    pub top_bigrams: Vec<(String, u64)>,
}

/// Ranked comparison of the manuscript against all corpora.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub manuscript: String,
    pub manuscript_tokens: u64,
    /// Ascending by `jsd_unigram`
    pub results: Vec<DivergenceResult>,
}

impl ComparisonReport {
    /// Most similar corpus, if any were compared
    pub fn best(&self) -> Option<&DivergenceResult> {
        self.results.first()
    }
}

/// Comparator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparatorConfig {
    /// Symbols per side for top-k overlap
    pub top_k: usize,
    /// N-grams kept per corpus in the detail lists
    pub detail_top_n: usize,
    /// Compare corpora on the rayon pool
    pub parallel: bool,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            top_k: 50,
            detail_top_n: 40,
            parallel: false,
        }
    }
}

pub struct CorpusComparator {
    config: ComparatorConfig,
    embedder: Option<Box<dyn EmbeddingSimilarity + Send + Sync>>,
}

impl std::fmt::Debug for CorpusComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorpusComparator")
            .field("config", &self.config)
            .field("embedder", &self.embedder.is_some())
            .finish()
    }
}

/// Manuscript-side distributions, computed once per run.
struct Reference<'a> {
    corpus: &'a Corpus,
    unigrams: ProbabilityDistribution,
    bigrams: ProbabilityDistribution,
}

impl CorpusComparator {
    pub fn new(config: ComparatorConfig) -> Result<Self> {
        if config.top_k == 0 {
            return Err(StatsError::invalid("top_k", "must be at least 1"));
        }
        Ok(Self {
            config,
            embedder: None,
        })
    }

    /// Attach an embedding collaborator
    pub fn with_embedder(mut self, embedder: Box<dyn EmbeddingSimilarity + Send + Sync>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }

    /// Compare `manuscript` against every corpus and rank the results.
    pub fn compare(&self, manuscript: &Corpus, corpora: &[Corpus]) -> Result<ComparisonReport> {
        let reference = Reference {
            corpus: manuscript,
            unigrams: manuscript.unigram_distribution(),
            bigrams: manuscript.bigram_distribution(),
        };

        info!(
            "Comparing {} against {} corpora{}",
            manuscript.name,
            corpora.len(),
            if self.config.parallel { " (parallel)" } else { "" }
        );

        let mut results: Vec<DivergenceResult> = if self.config.parallel {
            corpora
                .par_iter()
                .map(|c| self.compare_one(&reference, c))
                .collect::<Result<Vec<_>>>()?
        } else {
            corpora
                .iter()
                .map(|c| self.compare_one(&reference, c))
                .collect::<Result<Vec<_>>>()?
        };

        // stable: equal JSD keeps corpus file order
        results.sort_by(|a, b| a.jsd_unigram.total_cmp(&b.jsd_unigram));

        Ok(ComparisonReport {
            manuscript: manuscript.source.display().to_string(),
            manuscript_tokens: manuscript.profile.token_count(),
            results,
        })
    }

    fn compare_one(&self, reference: &Reference<'_>, corpus: &Corpus) -> Result<DivergenceResult> {
        let uni = corpus.unigram_distribution();
        let bi = corpus.bigram_distribution();

        let jsd_unigram = jensen_shannon_divergence(&reference.unigrams, &uni);
        let jsd_bigram = jensen_shannon_divergence(&reference.bigrams, &bi);
        let overlap = top_k_overlap(&reference.unigrams, &uni, self.config.top_k)?;

        let embedding_similarity = self
            .embedder
            .as_ref()
            .and_then(|e| e.similarity(&reference.corpus.sample, &corpus.sample));

        debug!(
            "{}: jsd_unigram={:.6} jsd_bigram={:.6}",
            corpus.name, jsd_unigram, jsd_bigram
        );

        Ok(DivergenceResult {
            corpus: corpus.name.clone(),
            source: corpus.source.display().to_string(),
            jsd_unigram,
            jsd_bigram,
            top_k_overlap: Some(overlap),
            embedding_similarity,
            top_unigrams: corpus.profile.unigrams.most_common(self.config.detail_top_n),
            top_bigrams: corpus.profile.bigrams.most_common(self.config.detail_top_n),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn manuscript() -> Corpus {
        Corpus::from_lines("manuscript", "ms.jsonl", ["daiin ol daiin", "qokedy ol chedy"])
    }

    fn write(dir: &Path, name: &str, bytes: &[u8]) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(bytes).unwrap();
    }

    struct FixedEmbedder(f64);

    impl EmbeddingSimilarity for FixedEmbedder {
        fn similarity(&self, manuscript: &[String], corpus: &[String]) -> Option<f64> {
            (!manuscript.is_empty() && !corpus.is_empty()).then_some(self.0)
        }
    }

    #[test]
    fn test_ranked_ascending_by_unigram_jsd() {
        let corpora = vec![
            Corpus::from_lines("far", "far.txt", ["lorem ipsum dolor"]),
            Corpus::from_lines("near", "near.txt", ["daiin ol daiin qokedy ol"]),
            Corpus::from_lines("same", "same.txt", ["daiin ol daiin", "qokedy ol chedy"]),
        ];
        let cmp = CorpusComparator::new(ComparatorConfig::default()).unwrap();
        let report = cmp.compare(&manuscript(), &corpora).unwrap();

        let order: Vec<&str> = report.results.iter().map(|r| r.corpus.as_str()).collect();
        assert_eq!(order, vec!["same", "near", "far"]);
        assert_eq!(report.best().unwrap().jsd_unigram, 0.0);
        assert!(approx_eq(report.results[2].jsd_unigram, 1.0, 1e-9));
        assert_eq!(report.manuscript_tokens, 6);
    }

    #[test]
    fn test_empty_corpus_is_tolerated() {
        let corpora = vec![Corpus::from_lines("empty", "empty.txt", Vec::<String>::new())];
        let cmp = CorpusComparator::new(ComparatorConfig::default()).unwrap();
        let report = cmp.compare(&manuscript(), &corpora).unwrap();
        let r = &report.results[0];
        assert!(approx_eq(r.jsd_unigram, 0.5, 1e-12));
        assert!(r.jsd_bigram.is_finite());
        assert_eq!(r.top_k_overlap.as_ref().unwrap().fraction, 0.0);
        assert!(r.top_unigrams.is_empty());
    }

    #[test]
    fn test_embedding_absent_by_default() {
        let corpora = vec![Corpus::from_lines("c", "c.txt", ["ol"])];
        let cmp = CorpusComparator::new(ComparatorConfig::default()).unwrap();
        let report = cmp.compare(&manuscript(), &corpora).unwrap();
        assert_eq!(report.results[0].embedding_similarity, None);

        let json = serde_json::to_value(&report.results[0]).unwrap();
        assert!(json["embedding_similarity"].is_null());

        let cmp = CorpusComparator::new(ComparatorConfig::default())
            .unwrap()
            .with_embedder(Box::new(FixedEmbedder(0.42)));
        let report = cmp.compare(&manuscript(), &corpora).unwrap();
        assert_eq!(report.results[0].embedding_similarity, Some(0.42));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let corpora: Vec<Corpus> = (0..8)
            .map(|i| {
                let text = format!("daiin ol w{} chedy w{} ol", i, i % 3);
                Corpus::from_lines(format!("c{}", i), format!("c{}.txt", i), [text])
            })
            .collect();

        let seq = CorpusComparator::new(ComparatorConfig::default())
            .unwrap()
            .compare(&manuscript(), &corpora)
            .unwrap();
        let par = CorpusComparator::new(ComparatorConfig {
            parallel: true,
            ..Default::default()
        })
        .unwrap()
        .compare(&manuscript(), &corpora)
        .unwrap();

        assert_eq!(seq, par);
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let err = CorpusComparator::new(ComparatorConfig {
            top_k: 0,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, StatsError::InvalidParameter { .. }));
    }

    #[test]
    fn test_load_corpora_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "latin.txt", b"arma virumque cano\ntroiae qui primus\n");
        write(dir.path(), "binary.txt", b"ol\xff\xfedy\n");
        fs::create_dir(dir.path().join("nested")).unwrap();

        let corpora = load_corpora(dir.path()).unwrap();
        let names: Vec<&str> = corpora.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["binary", "latin"]);
        // invalid bytes are dropped, not turned into separators
        assert_eq!(corpora[0].profile.unigrams.get("oldy"), 1);
        assert_eq!(corpora[0].profile.unigrams.get("ol"), 0);
        assert_eq!(corpora[1].profile.lines, 2);
        // bigrams run across lines
        assert_eq!(corpora[1].profile.bigrams.get("cano troiae"), 1);
        assert_eq!(corpora[1].sample.len(), 2);
    }

    #[test]
    fn test_missing_corpora_dir_is_error() {
        assert!(load_corpora(Path::new("/nonexistent/corpora")).is_err());
    }
}
