//! Multi-backend actor
//!
//! Holds several named backends and forwards every call to the active one.
//! Page objects that move between the browser and a phone call
//! `switch_helper` to pick the backend for the next calls.

use crate::driver::traits::{Actor, TouchAction};
use crate::locator::Locator;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct HelperSwitch {
    helpers: Vec<(String, Box<dyn Actor>)>,
    active: AtomicUsize,
}

impl HelperSwitch {
    /// The first registered helper is active initially
    pub fn new() -> Self {
        Self {
            helpers: Vec::new(),
            active: AtomicUsize::new(0),
        }
    }

    pub fn with_helper(mut self, name: &str, actor: Box<dyn Actor>) -> Self {
        self.helpers.push((name.to_string(), actor));
        self
    }

    pub fn helper_names(&self) -> Vec<&str> {
        self.helpers.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn active_name(&self) -> Option<&str> {
        self.helpers
            .get(self.active.load(Ordering::SeqCst))
            .map(|(n, _)| n.as_str())
    }

    fn current(&self) -> Result<&dyn Actor> {
        self.helpers
            .get(self.active.load(Ordering::SeqCst))
            .map(|(_, a)| a.as_ref())
            .ok_or_else(|| anyhow::anyhow!("No helper registered"))
    }
}

impl Default for HelperSwitch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Actor for HelperSwitch {
    fn backend_name(&self) -> &str {
        self.active_name().unwrap_or("none")
    }

    async fn open(&self, url: &str) -> Result<()> {
        self.current()?.open(url).await
    }

    async fn fill_field(&self, locator: &Locator, value: &str) -> Result<()> {
        self.current()?.fill_field(locator, value).await
    }

    async fn click(&self, locator: &Locator, context: Option<&Locator>) -> Result<()> {
        self.current()?.click(locator, context).await
    }

    async fn check_option(&self, locator: &Locator) -> Result<()> {
        self.current()?.check_option(locator).await
    }

    async fn see(&self, text: &str, context: Option<&Locator>) -> Result<()> {
        self.current()?.see(text, context).await
    }

    async fn dont_see(&self, text: &str, context: Option<&Locator>) -> Result<()> {
        self.current()?.dont_see(text, context).await
    }

    async fn wait_for_element(&self, locator: &Locator, seconds: u64) -> Result<()> {
        self.current()?.wait_for_element(locator, seconds).await
    }

    async fn wait(&self, seconds: u64) -> Result<()> {
        self.current()?.wait(seconds).await
    }

    async fn tap(&self, locator: &Locator) -> Result<()> {
        self.current()?.tap(locator).await
    }

    async fn touch_perform(&self, actions: &[TouchAction]) -> Result<()> {
        self.current()?.touch_perform(actions).await
    }

    async fn send_device_key_event(&self, code: u32) -> Result<()> {
        self.current()?.send_device_key_event(code).await
    }

    async fn grab_number_of_visible_elements(&self, locator: &Locator) -> Result<usize> {
        self.current()?.grab_number_of_visible_elements(locator).await
    }

    async fn grab_text_from_all(&self, locator: &Locator) -> Result<Vec<String>> {
        self.current()?.grab_text_from_all(locator).await
    }

    async fn fail(&self, message: &str) -> Result<()> {
        self.current()?.fail(message).await
    }

    async fn report(&self, message: &str) -> Result<()> {
        self.current()?.report(message).await
    }

    async fn start_app(&self, app_id: &str, device: Option<&str>) -> Result<()> {
        self.current()?.start_app(app_id, device).await
    }

    async fn set_device(&self, device: &str) -> Result<()> {
        self.current()?.set_device(device).await
    }

    async fn switch_helper(&self, name: &str) -> Result<()> {
        let index = self
            .helpers
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown helper '{}'. Available: {}",
                    name,
                    self.helper_names().join(", ")
                )
            })?;
        if index != self.active.swap(index, Ordering::SeqCst) {
            log::debug!("Switched helper to {}", name);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        for (name, helper) in &self.helpers {
            if let Err(e) = helper.close().await {
                log::warn!("Failed to close helper {}: {}", name, e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::dry_run::DryRunDriver;

    #[tokio::test]
    async fn test_routes_to_active_helper() {
        let switch = HelperSwitch::new()
            .with_helper("web", Box::new(DryRunDriver::new().named("web")))
            .with_helper("android", Box::new(DryRunDriver::new().named("android")));

        assert_eq!(switch.backend_name(), "web");
        switch.switch_helper("Android").await.unwrap();
        assert_eq!(switch.backend_name(), "android");
        assert_eq!(switch.active_name(), Some("android"));
    }

    #[tokio::test]
    async fn test_unknown_helper_is_rejected() {
        let switch =
            HelperSwitch::new().with_helper("web", Box::new(DryRunDriver::new().named("web")));
        let err = switch.switch_helper("ios").await.unwrap_err();
        assert!(err.to_string().contains("Unknown helper 'ios'"));
        assert_eq!(switch.backend_name(), "web");
    }

    #[tokio::test]
    async fn test_empty_switch_errors() {
        let switch = HelperSwitch::new();
        assert!(switch.open("/").await.is_err());
    }
}
