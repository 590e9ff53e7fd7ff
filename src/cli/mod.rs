//! CLI command definitions and handlers

mod analyze;
mod ingest;
mod pipeline;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use glyphstat::config::RunConfig;

/// Parse a strictly positive count
fn parse_positive(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

/// glyphstat - distributional statistics for manuscript transcriptions
#[derive(Parser, Debug)]
#[command(name = "glyphstat")]
#[command(
    version,
    about = "Entropy, Zipf, n-gram and divergence statistics for undeciphered manuscript transcriptions",
    after_help = "\
Examples:
  glyphstat ingest transcription.txt -o data/processed/transcription.jsonl
  glyphstat metrics --input data/processed/transcription.jsonl
  glyphstat compare --input data/processed/transcription.jsonl --corpora data/corpora
  glyphstat timeline --token-coords data/processed/token_coords.jsonl --window-size 2
  glyphstat pipeline --input transcription.txt"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Config file (default: ./glyphstat.toml when present)
    #[arg(long, global = true, env = "GLYPHSTAT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Normalize a raw transcription into JSONL (line, raw, text)
    Ingest {
        /// Raw transcription text file
        input: PathBuf,

        #[arg(long, short = 'o', default_value = "data/processed/transcription.jsonl")]
        output: PathBuf,

        /// Keep HTML-like tags
        #[arg(long)]
        no_strip_html: bool,

        /// Keep digit runs
        #[arg(long)]
        no_remove_numbers: bool,

        /// Keep uncertainty markers (? * † ( ) ¶ [ ])
        #[arg(long)]
        no_remove_uncertainty: bool,
    },

    /// Extract the Takahashi (;H) lines from an interlinear transcription
    ExtractTakahashi {
        input: PathBuf,

        #[arg(long, short = 'o', default_value = "data/raw/takahashi.txt")]
        output: PathBuf,
    },

    /// Split transcription JSONL into per-token JSONL
    Tokenize {
        input: PathBuf,

        #[arg(long, short = 'o', default_value = "data/processed/tokens.jsonl")]
        output: PathBuf,
    },

    /// Per-line uni/bi/trigram counts and entropy
    Stats {
        input: PathBuf,

        /// Full count dump
        #[arg(long, short = 'o', default_value = "data/processed/ngrams.json")]
        output: PathBuf,

        /// How many top items to print
        #[arg(long, default_value = "20")]
        top: usize,
    },

    /// Entropy, hapax ratio, Zipf slope and top n-grams report
    Metrics {
        /// Transcription JSONL
        #[arg(long)]
        input: PathBuf,

        /// Output directory (default: paths.output_dir)
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long, value_parser = parse_positive)]
        top_n: Option<usize>,
    },

    /// Rank reference corpora by unigram/bigram JSD against the manuscript
    Compare {
        /// Transcription JSONL
        #[arg(long)]
        input: PathBuf,

        /// Directory of plain-text corpora (default: paths.corpora_dir)
        #[arg(long)]
        corpora: Option<PathBuf>,

        /// Output directory (default: <output_dir>/comparison)
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long, value_parser = parse_positive)]
        top_k: Option<usize>,

        /// Compare corpora in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Character 1-4 gram comparison against candidate language corpora
    CompareLanguages {
        /// Transcription JSONL
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        corpora: Option<PathBuf>,

        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long, value_parser = parse_positive)]
        top_k: Option<usize>,
    },

    /// Vocabulary evolution and shifts across folios
    Timeline {
        /// Token records carrying folio/page ids
        #[arg(long)]
        token_coords: Option<PathBuf>,

        /// Output directory (default: <output_dir>/timeline)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Units per window
        #[arg(long, value_parser = parse_positive)]
        window_size: Option<usize>,
    },

    /// Run ingest, tokenize, metrics, comparison and timeline in order
    Pipeline {
        /// Raw transcription text file
        #[arg(long)]
        input: Option<PathBuf>,

        #[arg(long)]
        corpora: Option<PathBuf>,

        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long)]
        token_coords: Option<PathBuf>,

        #[arg(long, value_parser = parse_positive)]
        window_size: Option<usize>,

        #[arg(long)]
        parallel: bool,
    },
}

fn load_config(explicit: Option<&Path>) -> Result<RunConfig> {
    RunConfig::discover(explicit, Path::new(".")).with_context(|| match explicit {
        Some(p) => format!("Failed to load config {}", p.display()),
        None => "Failed to load glyphstat.toml".to_string(),
    })
}

pub fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest {
            input,
            output,
            no_strip_html,
            no_remove_numbers,
            no_remove_uncertainty,
        } => {
            if no_strip_html {
                config.normalize.strip_html = false;
            }
            if no_remove_numbers {
                config.normalize.remove_numbers = false;
            }
            if no_remove_uncertainty {
                config.normalize.remove_uncertainty = false;
            }
            ingest::run_ingest(&input, &output, &config.normalize)
        }

        Commands::ExtractTakahashi { input, output } => ingest::run_extract(&input, &output),

        Commands::Tokenize { input, output } => ingest::run_tokenize(&input, &output),

        Commands::Stats { input, output, top } => analyze::run_stats(&input, &output, top),

        Commands::Metrics { input, out, top_n } => {
            if let Some(n) = top_n {
                config.analysis.top_n = n;
            }
            let out = out.unwrap_or_else(|| config.paths.output_dir.clone());
            analyze::run_metrics(&input, &out, &config)
        }

        Commands::Compare {
            input,
            corpora,
            out,
            top_k,
            parallel,
        } => {
            if let Some(dir) = corpora {
                config.paths.corpora_dir = dir;
            }
            if let Some(k) = top_k {
                config.analysis.top_k = k;
            }
            config.analysis.parallel |= parallel;
            let out = out.unwrap_or_else(|| config.comparison_dir());
            analyze::run_compare(&input, &out, &config)
        }

        Commands::CompareLanguages {
            input,
            corpora,
            out,
            top_k,
        } => {
            if let Some(dir) = corpora {
                config.paths.corpora_dir = dir;
            }
            if let Some(k) = top_k {
                config.analysis.top_k = k;
            }
            let out = out.unwrap_or_else(|| config.comparison_dir());
            analyze::run_compare_languages(&input, &out, &config)
        }

        Commands::Timeline {
            token_coords,
            out,
            window_size,
        } => {
            if let Some(path) = token_coords {
                config.paths.token_coords = Some(path);
            }
            if let Some(w) = window_size {
                config.analysis.window_size = w;
            }
            let out = out.unwrap_or_else(|| config.timeline_dir());
            analyze::run_timeline(&out, &config)
        }

        Commands::Pipeline {
            input,
            corpora,
            out,
            token_coords,
            window_size,
            parallel,
        } => {
            if let Some(p) = input {
                config.paths.input = p;
            }
            if let Some(dir) = corpora {
                config.paths.corpora_dir = dir;
            }
            if let Some(dir) = out {
                config.paths.output_dir = dir;
            }
            if let Some(p) = token_coords {
                config.paths.token_coords = Some(p);
            }
            if let Some(w) = window_size {
                config.analysis.window_size = w;
            }
            config.analysis.parallel |= parallel;
            pipeline::run(&config)
        }
    }
}
