//! # glyphstat
//!
//! Distributional statistics for transcriptions of undeciphered manuscripts.
//!
//! ## Theory
//!
//! A transcription is reduced to token and n-gram frequency tables. From
//! those the crate derives Shannon entropy, the hapax legomena ratio and the
//! Zipf rank-frequency slope, and compares the manuscript with reference
//! corpora through the Jensen-Shannon divergence:
//!
//! ```text
//! JSD(P, Q) = ½·D_KL(P || M) + ½·D_KL(Q || M),   M = ½(P + Q)
//! ```
//!
//! computed in bits over the union of both key sets, so 0 ≤ JSD ≤ 1.
//!
//! ## Modules
//!
//! - [`tokenize`], [`ngram`], [`distribution`]: tokens → counts → probabilities
//! - [`metrics`], [`divergence`]: entropy, Zipf, JSD, top-k overlap
//! - [`compare`], [`langcompare`]: manuscript vs reference corpora
//! - [`temporal`]: windowed vocabulary shifts across folios
//! - [`ingest`], [`records`], [`report`], [`pipeline`], [`config`]: I/O around the core
//!
//! ## Example
//!
//! ```rust
//! use glyphstat::{jensen_shannon_divergence, shannon_entropy, tokenize_str, FrequencyTable};
//!
//! let tokens = tokenize_str("daiin qokedy daiin");
//! let table = FrequencyTable::from_tokens(tokens);
//!
//! let h = shannon_entropy(&table);
//! assert!((h - 0.918).abs() < 1e-3);
//!
//! let p = table.to_distribution();
//! assert_eq!(jensen_shannon_divergence(&p, &p), 0.0);
//! ```

pub mod compare;
pub mod config;
pub mod distribution;
pub mod divergence;
pub mod error;
pub mod ingest;
pub mod langcompare;
pub mod metrics;
pub mod ngram;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod temporal;
pub mod tokenize;

// Re-exports
pub use compare::{ComparisonReport, Corpus, CorpusComparator, DivergenceResult, EmbeddingSimilarity};
pub use config::RunConfig;
pub use distribution::ProbabilityDistribution;
pub use divergence::{jensen_shannon_divergence, top_k_overlap, TopKOverlap};
pub use error::{Result, StatsError};
pub use metrics::{hapax_ratio, shannon_entropy, zipf_slope, CorpusMetrics};
pub use ngram::{FrequencyTable, NgramCounter, TextProfile};
pub use pipeline::{Pipeline, PipelineSummary};
pub use records::TranscriptionRecord;
pub use temporal::{TemporalAnalyzer, UnitStats, WindowShift};
pub use tokenize::{tokenize, tokenize_str};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
