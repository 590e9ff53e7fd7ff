//! pipeline command

use anyhow::{Context, Result};

use glyphstat::config::RunConfig;
use glyphstat::pipeline::Pipeline;

pub fn run(config: &RunConfig) -> Result<()> {
    let summary = Pipeline::run(config).context("Pipeline failed")?;

    println!("\nFull pipeline finished (run {}).", summary.run_id);
    println!("Records ingested: {}", summary.records);
    println!("Corpora compared: {}", summary.corpora_compared);
    if let Some(units) = summary.timeline_units {
        println!("Timeline units: {}", units);
    }
    println!("Artifacts:");
    for path in &summary.artifacts {
        println!("- {}", path.display());
    }
    Ok(())
}
