use crate::error::StepError;
use crate::locator::Locator;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One step of a raw touch gesture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum TouchAction {
    Press { x: i32, y: i32 },
    MoveTo { x: i32, y: i32 },
    Wait { ms: u64 },
    Release,
    Tap { x: i32, y: i32 },
}

impl TouchAction {
    /// press → wait → move → release
    pub fn swipe(from: (i32, i32), to: (i32, i32), duration_ms: u64) -> Vec<TouchAction> {
        vec![
            TouchAction::Press {
                x: from.0,
                y: from.1,
            },
            TouchAction::Wait { ms: duration_ms },
            TouchAction::MoveTo { x: to.0, y: to.1 },
            TouchAction::Release,
        ]
    }
}

/// Android key codes used by the mobile flows
pub mod keycode {
    pub const HOME: u32 = 3;
    pub const BACK: u32 = 4;
    pub const CALL: u32 = 5;
    pub const ENDCALL: u32 = 6;
    pub const DIGIT_0: u32 = 7;
    pub const STAR: u32 = 17;
    pub const POUND: u32 = 18;
    pub const PLUS: u32 = 81;
    pub const ENTER: u32 = 66;

    /// Key code for a dial-pad character
    pub fn for_dial_char(c: char) -> Option<u32> {
        match c {
            '0'..='9' => c.to_digit(10).map(|d| DIGIT_0 + d),
            '*' => Some(STAR),
            '#' => Some(POUND),
            '+' => Some(PLUS),
            _ => None,
        }
    }
}

/// The automation facade every step and page object goes through.
///
/// Implementations adapt an external automation stack (a browser driver, a
/// device bridge, or a recorder for dry runs). Waits and lookups that run
/// past their bound come back as errors; this layer does not retry them.
#[async_trait]
pub trait Actor: Send + Sync {
    /// Name of the active backend (e.g. "dry-run", "web", "android")
    fn backend_name(&self) -> &str;

    /// Navigate to a URL or path
    async fn open(&self, url: &str) -> Result<()>;

    async fn fill_field(&self, locator: &Locator, value: &str) -> Result<()>;

    /// Click an element, optionally inside a context element
    async fn click(&self, locator: &Locator, context: Option<&Locator>) -> Result<()>;

    async fn check_option(&self, locator: &Locator) -> Result<()>;

    /// Assert that text is visible, optionally inside a context element
    async fn see(&self, text: &str, context: Option<&Locator>) -> Result<()>;

    async fn dont_see(&self, text: &str, context: Option<&Locator>) -> Result<()>;

    /// Wait until the element is present; fails after `seconds`
    async fn wait_for_element(&self, locator: &Locator, seconds: u64) -> Result<()>;

    /// Fixed pause
    async fn wait(&self, seconds: u64) -> Result<()>;

    async fn tap(&self, locator: &Locator) -> Result<()>;

    async fn touch_perform(&self, actions: &[TouchAction]) -> Result<()>;

    async fn send_device_key_event(&self, code: u32) -> Result<()>;

    async fn grab_number_of_visible_elements(&self, locator: &Locator) -> Result<usize>;

    async fn grab_text_from_all(&self, locator: &Locator) -> Result<Vec<String>>;

    /// Fail the current step with `message`
    async fn fail(&self, message: &str) -> Result<()> {
        Err(StepError::Failed(message.to_string()).into())
    }

    /// Attach a message to the run output
    async fn report(&self, message: &str) -> Result<()> {
        log::info!("{}", message);
        Ok(())
    }

    /// Launch an application on a device
    async fn start_app(&self, _app_id: &str, _device: Option<&str>) -> Result<()> {
        Err(anyhow::anyhow!(
            "start_app not supported by the {} backend",
            self.backend_name()
        ))
    }

    async fn set_device(&self, _device: &str) -> Result<()> {
        Err(anyhow::anyhow!(
            "set_device not supported by the {} backend",
            self.backend_name()
        ))
    }

    /// Route subsequent calls to another backend. Single-backend actors accept
    /// their own name and reject anything else.
    async fn switch_helper(&self, name: &str) -> Result<()> {
        if name.eq_ignore_ascii_case(self.backend_name()) {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "Cannot switch to '{}': only '{}' is available",
                name,
                self.backend_name()
            ))
        }
    }

    /// Release backend resources at the end of a run
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dial_keycodes() {
        assert_eq!(keycode::for_dial_char('0'), Some(7));
        assert_eq!(keycode::for_dial_char('9'), Some(16));
        assert_eq!(keycode::for_dial_char('#'), Some(keycode::POUND));
        assert_eq!(keycode::for_dial_char('-'), None);
    }

    #[test]
    fn test_swipe_sequence() {
        let seq = TouchAction::swipe((540, 1700), (540, 900), 300);
        assert_eq!(seq.len(), 4);
        assert_eq!(seq[0], TouchAction::Press { x: 540, y: 1700 });
        assert_eq!(seq[3], TouchAction::Release);
    }
}
