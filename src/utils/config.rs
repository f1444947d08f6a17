//! Run configuration
//!
//! Defaults cover a local run; a YAML file passed with `--config` overrides
//! any subset of fields, and a few environment variables override both.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Seconds used by waits that a step does not bound explicitly
    pub default_wait_secs: u64,
    /// Implicit wait applied by backends before an element counts as missing
    pub action_timeout_ms: u64,
    pub continue_on_failure: bool,
    /// Toggle controls are driven through their aria-label
    pub ai_pw: bool,
    pub poll: PollSettings,
    pub data: DataSettings,
    pub slots: SlotSettings,
    pub web: WebSettings,
    pub mobile: MobileSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_wait_secs: 10,
            action_timeout_ms: 10_000,
            continue_on_failure: false,
            ai_pw: false,
            poll: PollSettings::default(),
            data: DataSettings::default(),
            slots: SlotSettings::default(),
            web: WebSettings::default(),
            mobile: MobileSettings::default(),
        }
    }
}

/// Bounded polling used by the incoming call flows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PollSettings {
    pub max_attempts: u32,
    /// Facade wait inside each attempt
    pub wait_secs: u64,
    /// Extra pause between attempts
    pub interval_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            wait_secs: 5,
            interval_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataSettings {
    pub password_length: usize,
    pub alpha_length: usize,
    pub numeric_length: usize,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            password_length: 12,
            alpha_length: 6,
            numeric_length: 10,
        }
    }
}

/// Bookable window for the time-slot step, as `HH:MM`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SlotSettings {
    pub open: String,
    pub close: String,
    pub step_minutes: u32,
}

impl Default for SlotSettings {
    fn default() -> Self {
        Self {
            open: "07:00".to_string(),
            close: "20:30".to_string(),
            step_minutes: 30,
        }
    }
}

impl SlotSettings {
    pub fn open_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.open)
    }

    pub fn close_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.close)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebSettings {
    pub base_url: Option<String>,
    pub browser: String,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            browser: "chromium".to_string(),
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Device-side constants of the dialer and messaging flows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MobileSettings {
    /// Helper name used by `switch_helper` before device steps
    pub helper: String,
    /// Helper to return to after device steps
    pub web_helper: String,
    pub dialer_app: String,
    pub messages_app: String,
    /// Screen point of the answer control on the incoming call screen
    pub answer_point: (i32, i32),
    /// Swipe used to decline an incoming call
    pub decline_swipe: ((i32, i32), (i32, i32)),
    pub swipe_duration_ms: u64,
}

impl Default for MobileSettings {
    fn default() -> Self {
        Self {
            helper: "android".to_string(),
            web_helper: "web".to_string(),
            dialer_app: "com.google.android.dialer".to_string(),
            messages_app: "com.google.android.apps.messaging".to_string(),
            answer_point: (540, 1900),
            decline_swipe: ((540, 1900), (540, 1100)),
            swipe_duration_ms: 400,
        }
    }
}

pub fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .with_context(|| format!("Invalid time '{}', expected HH:MM", value))
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        )
    })
}

impl Config {
    /// Load from a YAML file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `AI_PW`, `G2_BASE_URL` and `G2_HEADLESS`
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(flag) = env_flag("AI_PW") {
            self.ai_pw = flag;
        }
        if let Ok(url) = std::env::var("G2_BASE_URL") {
            if !url.trim().is_empty() {
                self.web.base_url = Some(url);
            }
        }
        if let Some(flag) = env_flag("G2_HEADLESS") {
            self.web.headless = flag;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let open = self.slots.open_time()?;
        let close = self.slots.close_time()?;
        if open >= close {
            anyhow::bail!(
                "Slot window is empty: open {} is not before close {}",
                self.slots.open,
                self.slots.close
            );
        }
        if self.slots.step_minutes == 0 || 1440 % self.slots.step_minutes != 0 {
            anyhow::bail!(
                "Slot step must divide a day evenly, got {} minutes",
                self.slots.step_minutes
            );
        }
        if self.poll.max_attempts == 0 {
            anyhow::bail!("poll.maxAttempts must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.poll.max_attempts, 5);
        assert_eq!(config.slots.open_time().unwrap(), NaiveTime::from_hms_opt(7, 0, 0).unwrap());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "defaultWaitSecs: 3\nslots:\n  close: \"18:00\"\nweb:\n  baseUrl: https://g2.example.com"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.default_wait_secs, 3);
        assert_eq!(config.slots.close, "18:00");
        assert_eq!(config.slots.open, "07:00");
        assert_eq!(config.web.base_url.as_deref(), Some("https://g2.example.com"));
        assert_eq!(config.data.numeric_length, 10);
    }

    #[test]
    fn test_rejects_empty_window() {
        let mut config = Config::default();
        config.slots.open = "21:00".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_hhmm() {
        assert!(parse_hhmm("09:07").is_ok());
        assert!(parse_hhmm("nine").is_err());
    }
}
