pub mod json;
pub mod junit;
pub mod types;

use anyhow::Result;
use std::path::Path;

/// Re-render a saved `test-results.json`
pub fn generate_report(results_path: &Path, format: &str, output: Option<&Path>) -> Result<()> {
    let test_results = json::load(results_path)?;

    match format {
        "json" => json::generate(&test_results, output),
        "junit" => {
            let xml = junit::generate_junit_xml(&test_results)?;
            match output {
                Some(path) => {
                    std::fs::write(path, xml)?;
                    println!("JUnit report saved to: {}", path.display());
                }
                None => println!("{}", xml),
            }
            Ok(())
        }
        _ => anyhow::bail!("Unknown format: {} (expected json or junit)", format),
    }
}
