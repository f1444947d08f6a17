pub mod feature;
pub mod types;
pub mod yaml;

use anyhow::Result;
use std::path::{Path, PathBuf};
pub use types::{FileHeader, Keyword, Scenario, ScenarioFile, StepLine};

fn is_scenario_file(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext == "feature" || ext == "yaml" || ext == "yml")
}

/// Parse a `.feature` or YAML scenario file, chosen by extension
pub fn parse_file(path: &Path) -> Result<ScenarioFile> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("feature") => feature::parse_feature_file(path),
        Some("yaml") | Some("yml") => yaml::parse_test_file(path),
        _ => anyhow::bail!(
            "Unsupported scenario file {}: expected .feature, .yaml or .yml",
            path.display()
        ),
    }
}

/// Scenario files under `path`, sorted; a file path is returned as-is
pub fn discover(path: &Path) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_scenario_file(e.path()))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}
