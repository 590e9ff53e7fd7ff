//! Run configuration.
//!
//! Read from `glyphstat.toml` (or an explicit path); every field has a
//! default so a partial file, or none at all, is fine:
//!
//! ```toml
//! [paths]
//! input = "transcription.txt"
//! corpora_dir = "data/corpora"
//! output_dir = "reports"
//! token_coords = "data/processed/token_coords.jsonl"
//!
//! [analysis]
//! top_n = 30
//! detail_top_n = 40
//! top_k = 50
//! window_size = 1
//! zipf_max_ranks = 1000
//! parallel = false
//!
//! [normalize]
//! strip_html = true
//! remove_numbers = true
//! remove_uncertainty = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::compare::ComparatorConfig;
use crate::error::{Result, StatsError};
use crate::ingest::NormalizeOptions;
use crate::metrics::ZIPF_MAX_RANKS;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "glyphstat.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub paths: PathsConfig,
    pub analysis: AnalysisConfig,
    pub normalize: NormalizeOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw transcription text
    pub input: PathBuf,
    /// Reference corpora, one plain-text file each
    pub corpora_dir: PathBuf,
    /// Root of every written report
    pub output_dir: PathBuf,
    /// Token records with unit ids; the timeline is skipped when unset
    pub token_coords: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("transcription.txt"),
            corpora_dir: PathBuf::from("data/corpora"),
            output_dir: PathBuf::from("reports"),
            token_coords: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Entries in the metrics top lists
    pub top_n: usize,
    /// Entries in per-corpus detail lists
    pub detail_top_n: usize,
    /// Symbols per side for top-k overlap
    pub top_k: usize,
    /// Units per temporal window
    pub window_size: usize,
    pub zipf_max_ranks: usize,
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: 30,
            detail_top_n: 40,
            top_k: 50,
            window_size: 1,
            zipf_max_ranks: ZIPF_MAX_RANKS,
            parallel: false,
        }
    }
}

impl AnalysisConfig {
    pub fn comparator(&self) -> ComparatorConfig {
        ComparatorConfig {
            top_k: self.top_k,
            detail_top_n: self.detail_top_n,
            parallel: self.parallel,
        }
    }
}

impl RunConfig {
    /// Parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StatsError::io(path, e))?;
        let config: RunConfig = toml::from_str(&content)
            .map_err(|e| StatsError::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `explicit` if given, else [`DEFAULT_CONFIG_FILE`] in `dir` if it
    /// exists, else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            return Self::load(&candidate);
        }
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Reject parameters the analysis cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.analysis.window_size == 0 {
            return Err(StatsError::invalid("window_size", "must be at least 1"));
        }
        if self.analysis.top_k == 0 {
            return Err(StatsError::invalid("top_k", "must be at least 1"));
        }
        if self.analysis.zipf_max_ranks < 2 {
            return Err(StatsError::invalid("zipf_max_ranks", "must be at least 2"));
        }
        Ok(())
    }

    pub fn processed_path(&self) -> PathBuf {
        self.paths.output_dir.join("processed").join("transcription.jsonl")
    }

    pub fn tokens_path(&self) -> PathBuf {
        self.paths.output_dir.join("processed").join("tokens.jsonl")
    }

    pub fn comparison_dir(&self) -> PathBuf {
        self.paths.output_dir.join("comparison")
    }

    pub fn timeline_dir(&self) -> PathBuf {
        self.paths.output_dir.join("timeline")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.analysis.top_n, 30);
        assert_eq!(config.analysis.top_k, 50);
        assert_eq!(config.analysis.window_size, 1);
        assert!(config.normalize.strip_html);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: RunConfig = toml::from_str(
            r#"
            [paths]
            output_dir = "out"

            [analysis]
            window_size = 3
            parallel = true

            [normalize]
            remove_numbers = false
            "#,
        )
        .unwrap();
        assert_eq!(config.paths.output_dir, PathBuf::from("out"));
        assert_eq!(config.paths.corpora_dir, PathBuf::from("data/corpora"));
        assert_eq!(config.analysis.window_size, 3);
        assert_eq!(config.analysis.top_k, 50);
        assert!(config.analysis.parallel);
        assert!(!config.normalize.remove_numbers);
        assert!(config.normalize.strip_html);
        assert_eq!(config.comparison_dir(), PathBuf::from("out/comparison"));
    }

    #[test]
    fn test_validate_rejects_zero() {
        let mut config = RunConfig::default();
        config.analysis.window_size = 0;
        assert!(matches!(
            config.validate(),
            Err(StatsError::InvalidParameter { name: "window_size", .. })
        ));

        let mut config = RunConfig::default();
        config.analysis.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(RunConfig::discover(None, dir.path()).unwrap(), RunConfig::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[analysis]\ntop_n = 7\n").unwrap();
        let config = RunConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config.analysis.top_n, 7);

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[analysis\n").unwrap();
        assert!(matches!(
            RunConfig::discover(Some(&bad), dir.path()),
            Err(StatsError::Config(_))
        ));
    }
}
