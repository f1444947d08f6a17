use crate::utils::binary_resolver;
use anyhow::{Context, Result};
use std::process::Stdio;
use tokio::process::Command;

/// Represents an Android device
#[derive(Debug, Clone)]
pub struct Device {
    pub serial: String,
    pub state: String,
}

/// Parse the output of `adb devices`
pub fn parse_devices(stdout: &str) -> Vec<Device> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                Some(Device {
                    serial: parts[0].to_string(),
                    state: parts[1].to_string(),
                })
            } else {
                None
            }
        })
        .collect()
}

/// Get list of connected Android devices
pub async fn get_devices() -> Result<Vec<Device>> {
    let adb_path = binary_resolver::find_adb()?;
    let output = Command::new(adb_path)
        .args(["devices"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("Failed to execute adb devices")?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        log::debug!("adb devices stderr: {}", stderr);
    }

    Ok(parse_devices(&String::from_utf8_lossy(&output.stdout)))
}

impl Device {
    /// Authorized and online
    pub fn is_ready(&self) -> bool {
        self.state == "device"
    }
}

async fn run(serial: Option<&str>, mode: &str, cmd: &str) -> Result<std::process::Output> {
    let mut args: Vec<&str> = Vec::with_capacity(4);
    if let Some(s) = serial {
        args.extend(["-s", s]);
    }
    args.extend([mode, cmd]);

    log::debug!("adb {}", args.join(" "));

    let adb_path = binary_resolver::find_adb()?;
    Command::new(adb_path)
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("Failed to execute: adb {} {}", mode, cmd))
}

/// Run `cmd` through `adb shell`
pub async fn shell(serial: Option<&str>, cmd: &str) -> Result<String> {
    let output = run(serial, "shell", cmd).await?;
    if !output.status.success() {
        anyhow::bail!(
            "ADB shell command failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Run `cmd` through `adb exec-out`, streaming stdout without a temp file
pub async fn exec_out(serial: Option<&str>, cmd: &str) -> Result<String> {
    let output = run(serial, "exec-out", cmd).await?;
    // exit status is unreliable here; empty stdout is the failure signal
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if stdout.is_empty() && !output.status.success() {
        anyhow::bail!(
            "ADB exec-out command failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(stdout)
}

/// Dump the current view hierarchy as XML
pub async fn dump_hierarchy(serial: Option<&str>) -> Result<String> {
    match exec_out(serial, "uiautomator dump /dev/stdout").await {
        Ok(output) if output.contains("<?xml") => Ok(output),
        _ => {
            // older Android versions cannot dump to stdout
            shell(
                serial,
                "uiautomator dump /sdcard/window_dump.xml > /dev/null && cat /sdcard/window_dump.xml",
            )
            .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devices() {
        let out = "List of devices attached\nemulator-5554\tdevice\nR58M\tunauthorized\n\n";
        let devices = parse_devices(out);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial, "emulator-5554");
        assert_eq!(devices[1].state, "unauthorized");
        assert!(devices[0].is_ready());
        assert!(!devices[1].is_ready());
    }
}
