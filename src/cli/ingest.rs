//! ingest, extract-takahashi and tokenize commands

use anyhow::{Context, Result};
use std::path::Path;

use glyphstat::ingest::NormalizeOptions;
use glyphstat::pipeline::{extract_takahashi_file, ingest_file, tokenize_file};

pub fn run_ingest(input: &Path, output: &Path, opts: &NormalizeOptions) -> Result<()> {
    let n = ingest_file(input, output, opts)
        .with_context(|| format!("Failed to ingest {}", input.display()))?;
    println!("Wrote {} records to {}", n, output.display());
    Ok(())
}

pub fn run_extract(input: &Path, output: &Path) -> Result<()> {
    let n = extract_takahashi_file(input, output)
        .with_context(|| format!("Failed to extract Takahashi lines from {}", input.display()))?;
    println!("Wrote {} lines to {}", n, output.display());
    Ok(())
}

pub fn run_tokenize(input: &Path, output: &Path) -> Result<()> {
    let n = tokenize_file(input, output)
        .with_context(|| format!("Failed to tokenize {}", input.display()))?;
    println!("Wrote {} token records to {}", n, output.display());
    Ok(())
}
