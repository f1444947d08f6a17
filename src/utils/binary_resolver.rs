use anyhow::Result;
use std::path::PathBuf;

/// Locations checked before falling back to the system PATH, in order
fn candidate_paths(name: &str) -> Vec<PathBuf> {
    let file = if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    };
    let mut paths = Vec::new();

    for var in ["ANDROID_HOME", "ANDROID_SDK_ROOT"] {
        if let Ok(sdk) = std::env::var(var) {
            paths.push(PathBuf::from(sdk).join("platform-tools").join(&file));
        }
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".g2-bdd").join("platform-tools").join(&file));
        if cfg!(target_os = "macos") {
            paths.push(
                home.join("Library")
                    .join("Android")
                    .join("sdk")
                    .join("platform-tools")
                    .join(&file),
            );
        } else {
            paths.push(
                home.join("Android")
                    .join("Sdk")
                    .join("platform-tools")
                    .join(&file),
            );
        }
    }

    paths
}

/// Find an executable in the SDK/install locations, then on PATH
pub fn find_binary(name: &str) -> Result<PathBuf> {
    let checked = candidate_paths(name);
    if let Some(path) = checked.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    if let Ok(path) = which::which(name) {
        return Ok(path);
    }

    Err(anyhow::anyhow!(
        "Could not find binary '{}'. Checked paths:\n{}\nand the system PATH",
        name,
        checked
            .iter()
            .map(|p| format!("  {}", p.display()))
            .collect::<Vec<_>>()
            .join("\n")
    ))
}

/// `G2_ADB` overrides the lookup
pub fn find_adb() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("G2_ADB") {
        return Ok(PathBuf::from(path));
    }
    find_binary("adb")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_end_with_binary_name() {
        for path in candidate_paths("adb") {
            let file = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(file.starts_with("adb"));
        }
    }

    #[test]
    fn test_missing_binary_lists_checked_paths() {
        let err = find_binary("g2-definitely-not-installed").unwrap_err();
        assert!(err.to_string().contains("g2-definitely-not-installed"));
    }
}
