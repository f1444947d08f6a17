use super::types::TestResults;
use anyhow::{Context, Result};
use std::path::Path;

/// Write results as pretty JSON, or print them when no path is given
pub fn generate(results: &TestResults, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;

    if let Some(path) = output {
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

pub fn load(path: &Path) -> Result<TestResults> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid results file: {}", path.display()))
}
