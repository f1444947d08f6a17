use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use super::adb;
use super::uiautomator::{self, UiElement};
use crate::driver::common::{self, WaitConfig};
use crate::driver::traits::{Actor, TouchAction};
use crate::locator::Locator;

#[derive(Debug, Clone)]
pub struct AndroidConfig {
    /// Upper bound for implicit element waits
    pub action_timeout_ms: u64,
    /// Pause after taps so the next dump sees the new screen
    pub tap_delay_ms: u64,
}

impl Default for AndroidConfig {
    fn default() -> Self {
        Self {
            action_timeout_ms: 10_000,
            tap_delay_ms: 150,
        }
    }
}

/// Android backend driving a device through adb and uiautomator dumps
pub struct AndroidDriver {
    serial: Mutex<Option<String>>,
    config: AndroidConfig,
}

impl AndroidDriver {
    pub fn new(serial: Option<String>, config: AndroidConfig) -> Self {
        Self {
            serial: Mutex::new(serial),
            config,
        }
    }

    fn serial(&self) -> Option<String> {
        self.serial.lock().ok().and_then(|s| s.clone())
    }

    async fn shell(&self, cmd: &str) -> Result<String> {
        adb::shell(self.serial().as_deref(), cmd).await
    }

    async fn hierarchy(&self) -> Result<Vec<UiElement>> {
        let xml = adb::dump_hierarchy(self.serial().as_deref()).await?;
        uiautomator::parse_hierarchy(&xml)
    }

    /// Wait for the first on-screen element the locator selects
    async fn find(&self, locator: &Locator, context: Option<&Locator>) -> Result<UiElement> {
        let deadline = std::time::Instant::now() + Duration::from_millis(self.config.action_timeout_ms);
        loop {
            let elements = self.hierarchy().await?;
            let found = uiautomator::find_in_context(&elements, locator, context)?
                .into_iter()
                .map(|i| &elements[i])
                .find(|e| !e.bounds.is_empty());
            if let Some(element) = found {
                return Ok(element.clone());
            }
            if std::time::Instant::now() >= deadline {
                anyhow::bail!("Element not found: {}", locator);
            }
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
    }

    async fn tap_point(&self, x: i32, y: i32) -> Result<()> {
        self.shell(&format!("input tap {} {}", x, y)).await?;
        if self.config.tap_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.tap_delay_ms)).await;
        }
        Ok(())
    }

    async fn text_visible(&self, text: &str, context: Option<&Locator>) -> Result<bool> {
        let elements = self.hierarchy().await?;
        let scopes = match context {
            Some(ctx) => Some(uiautomator::find_indices(&elements, ctx)?),
            None => None,
        };
        Ok(uiautomator::find_text(&elements, text).into_iter().any(|i| {
            !elements[i].bounds.is_empty()
                && scopes
                    .as_ref()
                    .map_or(true, |s| uiautomator::has_ancestor_in(&elements, i, s))
        }))
    }
}

/// `input swipe` / `input tap` commands for a gesture. Press..Release
/// sequences become one swipe; a press without movement is a long press.
pub fn touch_commands(actions: &[TouchAction]) -> Vec<String> {
    let mut commands = Vec::new();
    let mut pressed: Option<(i32, i32)> = None;
    let mut target: Option<(i32, i32)> = None;
    let mut held_ms = 0;

    for action in actions {
        match *action {
            TouchAction::Tap { x, y } => commands.push(format!("input tap {} {}", x, y)),
            TouchAction::Press { x, y } => {
                pressed = Some((x, y));
                target = None;
                held_ms = 0;
            }
            TouchAction::Wait { ms } => held_ms += ms,
            TouchAction::MoveTo { x, y } => target = Some((x, y)),
            TouchAction::Release => {
                if let Some(from) = pressed.take() {
                    let to = target.take().unwrap_or(from);
                    commands.push(format!(
                        "input swipe {} {} {} {} {}",
                        from.0,
                        from.1,
                        to.0,
                        to.1,
                        held_ms.max(100)
                    ));
                }
                held_ms = 0;
            }
        }
    }
    commands
}

#[async_trait]
impl Actor for AndroidDriver {
    fn backend_name(&self) -> &str {
        "android"
    }

    async fn open(&self, url: &str) -> Result<()> {
        self.shell(&format!(
            "am start -a android.intent.action.VIEW -d '{}'",
            url.replace('\'', "")
        ))
        .await?;
        Ok(())
    }

    async fn fill_field(&self, locator: &Locator, value: &str) -> Result<()> {
        let element = self.find(locator, None).await?;
        let (x, y) = element.bounds.center();
        self.tap_point(x, y).await?;
        self.shell(&format!(
            "input text \"{}\"",
            common::escape_for_android_shell(value)
        ))
        .await?;
        Ok(())
    }

    async fn click(&self, locator: &Locator, context: Option<&Locator>) -> Result<()> {
        let element = self.find(locator, context).await?;
        let (x, y) = element.bounds.center();
        self.tap_point(x, y).await
    }

    async fn check_option(&self, locator: &Locator) -> Result<()> {
        let element = self.find(locator, None).await?;
        if element.checked {
            log::debug!("{} already checked", locator);
            return Ok(());
        }
        let (x, y) = element.bounds.center();
        self.tap_point(x, y).await
    }

    async fn see(&self, text: &str, context: Option<&Locator>) -> Result<()> {
        let config = WaitConfig::within(self.config.action_timeout_ms);
        let visible = common::wait_until(|| self.text_visible(text, context), config).await?;
        if !visible {
            anyhow::bail!("Text \"{}\" is not visible", text);
        }
        Ok(())
    }

    async fn dont_see(&self, text: &str, context: Option<&Locator>) -> Result<()> {
        if self.text_visible(text, context).await? {
            anyhow::bail!("Text \"{}\" is visible but should not be", text);
        }
        Ok(())
    }

    async fn wait_for_element(&self, locator: &Locator, seconds: u64) -> Result<()> {
        let config = WaitConfig::within(seconds * 1000);
        let found = common::wait_until(
            || async {
                let elements = self.hierarchy().await?;
                Ok(!uiautomator::find_indices(&elements, locator)?.is_empty())
            },
            config,
        )
        .await?;
        if !found {
            anyhow::bail!("Element {} not found after {} sec", locator, seconds);
        }
        Ok(())
    }

    async fn wait(&self, seconds: u64) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(seconds)).await;
        Ok(())
    }

    async fn tap(&self, locator: &Locator) -> Result<()> {
        self.click(locator, None).await
    }

    async fn touch_perform(&self, actions: &[TouchAction]) -> Result<()> {
        for cmd in touch_commands(actions) {
            self.shell(&cmd).await?;
        }
        Ok(())
    }

    async fn send_device_key_event(&self, code: u32) -> Result<()> {
        self.shell(&format!("input keyevent {}", code)).await?;
        Ok(())
    }

    async fn grab_number_of_visible_elements(&self, locator: &Locator) -> Result<usize> {
        let elements = self.hierarchy().await?;
        Ok(uiautomator::find_indices(&elements, locator)?
            .into_iter()
            .filter(|&i| !elements[i].bounds.is_empty())
            .count())
    }

    async fn grab_text_from_all(&self, locator: &Locator) -> Result<Vec<String>> {
        let elements = self.hierarchy().await?;
        Ok(uiautomator::find_indices(&elements, locator)?
            .into_iter()
            .map(|i| elements[i].label().to_string())
            .collect())
    }

    async fn start_app(&self, app_id: &str, device: Option<&str>) -> Result<()> {
        if let Some(device) = device {
            self.set_device(device).await?;
        }
        log::info!("Launching {} on {:?}", app_id, self.serial());
        self.shell(&format!(
            "monkey -p {} -c android.intent.category.LAUNCHER 1",
            app_id
        ))
        .await?;
        Ok(())
    }

    async fn set_device(&self, device: &str) -> Result<()> {
        let devices = adb::get_devices().await?;
        if !devices.iter().any(|d| d.serial == device && d.is_ready()) {
            anyhow::bail!("Device {} is not connected", device);
        }
        if let Ok(mut serial) = self.serial.lock() {
            *serial = Some(device.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swipe_becomes_single_command() {
        let cmds = touch_commands(&TouchAction::swipe((540, 1700), (540, 900), 300));
        assert_eq!(cmds, vec!["input swipe 540 1700 540 900 300"]);
    }

    #[test]
    fn test_press_release_is_long_press() {
        let cmds = touch_commands(&[
            TouchAction::Press { x: 10, y: 20 },
            TouchAction::Wait { ms: 800 },
            TouchAction::Release,
            TouchAction::Tap { x: 1, y: 2 },
        ]);
        assert_eq!(
            cmds,
            vec!["input swipe 10 20 10 20 800", "input tap 1 2"]
        );
    }
}
