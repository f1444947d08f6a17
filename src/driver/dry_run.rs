//! Recording backend
//!
//! Logs every facade call instead of driving a device or browser. Lookups
//! answer from scripted values, which makes it the backend for `--platform
//! dry-run` and for tests of steps and page objects.

use crate::driver::traits::{Actor, TouchAction};
use crate::locator::Locator;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

/// A facade call as seen by the recorder; locators are kept in display form
#[derive(Debug, Clone, PartialEq)]
pub enum ActorCall {
    Open(String),
    FillField { locator: String, value: String },
    Click { locator: String, context: Option<String> },
    CheckOption(String),
    See { text: String, context: Option<String> },
    DontSee { text: String, context: Option<String> },
    WaitForElement { locator: String, seconds: u64 },
    Wait(u64),
    Tap(String),
    TouchPerform(Vec<TouchAction>),
    KeyEvent(u32),
    GrabCount(String),
    GrabTexts(String),
    Report(String),
    StartApp { app_id: String, device: Option<String> },
    SetDevice(String),
    SwitchHelper(String),
}

#[derive(Default)]
struct Script {
    counts: HashMap<String, VecDeque<usize>>,
    texts: HashMap<String, Vec<String>>,
    missing: HashSet<String>,
}

pub struct DryRunDriver {
    name: String,
    default_count: usize,
    calls: Mutex<Vec<ActorCall>>,
    script: Mutex<Script>,
}

impl Default for DryRunDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunDriver {
    /// Every lookup reports one visible element unless scripted otherwise
    pub fn new() -> Self {
        Self {
            name: "dry-run".to_string(),
            default_count: 1,
            calls: Mutex::new(Vec::new()),
            script: Mutex::new(Script::default()),
        }
    }

    /// Rename the backend, e.g. to stand in for "web" inside a `HelperSwitch`
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Count returned for locators without a scripted sequence
    pub fn with_default_count(mut self, count: usize) -> Self {
        self.default_count = count;
        self
    }

    /// Successive counts for a locator; the last one repeats
    pub fn script_counts(&self, locator: &Locator, counts: &[usize]) {
        if let Ok(mut script) = self.script.lock() {
            script
                .counts
                .insert(locator.to_string(), counts.iter().copied().collect());
        }
    }

    pub fn script_texts(&self, locator: &Locator, texts: &[&str]) {
        if let Ok(mut script) = self.script.lock() {
            script.texts.insert(
                locator.to_string(),
                texts.iter().map(|t| t.to_string()).collect(),
            );
        }
    }

    /// Make every action on `locator` fail as element-not-found
    pub fn script_missing(&self, locator: &Locator) {
        if let Ok(mut script) = self.script.lock() {
            script.missing.insert(locator.to_string());
        }
    }

    pub fn calls(&self) -> Vec<ActorCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: ActorCall) {
        log::info!("[{}] {:?}", self.name, call);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn ensure_present(&self, locator: &Locator) -> Result<()> {
        let missing = self
            .script
            .lock()
            .map(|s| s.missing.contains(&locator.to_string()))
            .unwrap_or(false);
        if missing {
            anyhow::bail!("Element not found: {}", locator);
        }
        Ok(())
    }

    fn next_count(&self, locator: &Locator) -> usize {
        let key = locator.to_string();
        let Ok(mut script) = self.script.lock() else {
            return self.default_count;
        };
        if script.missing.contains(&key) {
            return 0;
        }
        match script.counts.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(self.default_count),
            Some(queue) => queue.front().copied().unwrap_or(self.default_count),
            None => self.default_count,
        }
    }
}

#[async_trait]
impl Actor for DryRunDriver {
    fn backend_name(&self) -> &str {
        &self.name
    }

    async fn open(&self, url: &str) -> Result<()> {
        self.record(ActorCall::Open(url.to_string()));
        Ok(())
    }

    async fn fill_field(&self, locator: &Locator, value: &str) -> Result<()> {
        self.record(ActorCall::FillField {
            locator: locator.to_string(),
            value: value.to_string(),
        });
        self.ensure_present(locator)
    }

    async fn click(&self, locator: &Locator, context: Option<&Locator>) -> Result<()> {
        self.record(ActorCall::Click {
            locator: locator.to_string(),
            context: context.map(|c| c.to_string()),
        });
        self.ensure_present(locator)
    }

    async fn check_option(&self, locator: &Locator) -> Result<()> {
        self.record(ActorCall::CheckOption(locator.to_string()));
        self.ensure_present(locator)
    }

    async fn see(&self, text: &str, context: Option<&Locator>) -> Result<()> {
        self.record(ActorCall::See {
            text: text.to_string(),
            context: context.map(|c| c.to_string()),
        });
        self.ensure_present(&Locator::semantic(text))
    }

    async fn dont_see(&self, text: &str, context: Option<&Locator>) -> Result<()> {
        self.record(ActorCall::DontSee {
            text: text.to_string(),
            context: context.map(|c| c.to_string()),
        });
        Ok(())
    }

    async fn wait_for_element(&self, locator: &Locator, seconds: u64) -> Result<()> {
        self.record(ActorCall::WaitForElement {
            locator: locator.to_string(),
            seconds,
        });
        self.ensure_present(locator)
            .map_err(|_| anyhow::anyhow!("Element {} not found after {} sec", locator, seconds))
    }

    async fn wait(&self, seconds: u64) -> Result<()> {
        self.record(ActorCall::Wait(seconds));
        Ok(())
    }

    async fn tap(&self, locator: &Locator) -> Result<()> {
        self.record(ActorCall::Tap(locator.to_string()));
        self.ensure_present(locator)
    }

    async fn touch_perform(&self, actions: &[TouchAction]) -> Result<()> {
        self.record(ActorCall::TouchPerform(actions.to_vec()));
        Ok(())
    }

    async fn send_device_key_event(&self, code: u32) -> Result<()> {
        self.record(ActorCall::KeyEvent(code));
        Ok(())
    }

    async fn grab_number_of_visible_elements(&self, locator: &Locator) -> Result<usize> {
        self.record(ActorCall::GrabCount(locator.to_string()));
        Ok(self.next_count(locator))
    }

    async fn grab_text_from_all(&self, locator: &Locator) -> Result<Vec<String>> {
        self.record(ActorCall::GrabTexts(locator.to_string()));
        Ok(self
            .script
            .lock()
            .ok()
            .and_then(|s| s.texts.get(&locator.to_string()).cloned())
            .unwrap_or_default())
    }

    async fn report(&self, message: &str) -> Result<()> {
        self.record(ActorCall::Report(message.to_string()));
        Ok(())
    }

    async fn start_app(&self, app_id: &str, device: Option<&str>) -> Result<()> {
        self.record(ActorCall::StartApp {
            app_id: app_id.to_string(),
            device: device.map(str::to_string),
        });
        Ok(())
    }

    async fn set_device(&self, device: &str) -> Result<()> {
        self.record(ActorCall::SetDevice(device.to_string()));
        Ok(())
    }

    /// The recorder stands in for any helper
    async fn switch_helper(&self, name: &str) -> Result<()> {
        self.record(ActorCall::SwitchHelper(name.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let driver = DryRunDriver::new();
        driver.open("/login").await.unwrap();
        driver
            .fill_field(&Locator::semantic("Email"), "a@b.c")
            .await
            .unwrap();

        assert_eq!(
            driver.calls(),
            vec![
                ActorCall::Open("/login".to_string()),
                ActorCall::FillField {
                    locator: "\"Email\"".to_string(),
                    value: "a@b.c".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_scripted_counts_advance_then_repeat() {
        let driver = DryRunDriver::new();
        let loc = Locator::id("incoming");
        driver.script_counts(&loc, &[0, 0, 2]);

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(driver.grab_number_of_visible_elements(&loc).await.unwrap());
        }
        assert_eq!(seen, vec![0, 0, 2, 2]);
    }

    #[tokio::test]
    async fn test_missing_element_fails_actions() {
        let driver = DryRunDriver::new();
        let loc = Locator::semantic("Ghost");
        driver.script_missing(&loc);

        assert!(driver.click(&loc, None).await.is_err());
        assert_eq!(driver.grab_number_of_visible_elements(&loc).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fail_always_errors() {
        let driver = DryRunDriver::new();
        let err = driver.fail("Call not received").await.unwrap_err();
        assert_eq!(err.to_string(), "Call not received");
    }
}
