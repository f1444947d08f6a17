//! Dialer and messaging flows on an Android handset.
//!
//! Every flow first switches the actor to the mobile helper, so the same
//! scenario can drive the web app and a phone in turn.

use crate::driver::common::{poll_until, PollConfig};
use crate::driver::traits::{keycode, Actor, TouchAction};
use crate::locator::Locator;
use crate::utils::config::{Config, MobileSettings};
use anyhow::Result;
use std::time::Duration;

pub const CALL_NOT_RECEIVED: &str = "Call not received";

pub struct MobileComponent<'a> {
    actor: &'a dyn Actor,
    settings: &'a MobileSettings,
    poll: PollConfig,
    /// Facade wait inside each poll attempt
    attempt_wait_secs: u64,
    default_wait_secs: u64,
}

impl<'a> MobileComponent<'a> {
    pub fn new(actor: &'a dyn Actor, config: &'a Config) -> Self {
        Self {
            actor,
            settings: &config.mobile,
            poll: PollConfig {
                max_attempts: config.poll.max_attempts,
                interval: Duration::from_secs(config.poll.interval_secs),
            },
            attempt_wait_secs: config.poll.wait_secs,
            default_wait_secs: config.default_wait_secs,
        }
    }

    fn dialer_id(&self, name: &str) -> Locator {
        Locator::id(format!("{}:id/{}", self.settings.dialer_app, name))
    }

    fn messages_id(&self, name: &str) -> Locator {
        Locator::id(format!("{}:id/{}", self.settings.messages_app, name))
    }

    fn incoming_call(&self) -> Locator {
        self.dialer_id("incoming_call_puck_container")
    }

    fn end_call_button(&self) -> Locator {
        Locator::accessibility_id("End call")
    }

    async fn use_device(&self, device: Option<&str>) -> Result<()> {
        self.actor.switch_helper(&self.settings.helper).await?;
        if let Some(device) = device {
            self.actor.set_device(device).await?;
        }
        Ok(())
    }

    pub async fn open_dialer(&self, device: &str) -> Result<()> {
        self.use_device(Some(device)).await?;
        self.actor
            .start_app(&self.settings.dialer_app, Some(device))
            .await?;
        let dialpad = self.dialer_id("fab");
        self.actor
            .wait_for_element(&dialpad, self.default_wait_secs)
            .await?;
        self.actor.tap(&dialpad).await
    }

    /// Key in a number on the open dial pad; separators are ignored
    pub async fn dial_number(&self, number: &str) -> Result<()> {
        self.use_device(None).await?;
        for c in number.chars() {
            match keycode::for_dial_char(c) {
                Some(code) => self.actor.send_device_key_event(code).await?,
                None => log::debug!("Skipping '{}' in dialled number {}", c, number),
            }
        }
        self.actor.see(number, Some(&self.dialer_id("digits"))).await
    }

    pub async fn place_call(&self, number: &str) -> Result<()> {
        self.dial_number(number).await?;
        self.actor
            .tap(&self.dialer_id("dialpad_floating_action_button"))
            .await?;
        self.actor
            .wait_for_element(&self.end_call_button(), self.default_wait_secs)
            .await
    }

    pub async fn end_call(&self) -> Result<()> {
        self.use_device(None).await?;
        let end = self.end_call_button();
        if self.actor.grab_number_of_visible_elements(&end).await? > 0 {
            self.actor.tap(&end).await
        } else {
            self.actor.send_device_key_event(keycode::ENDCALL).await
        }
    }

    /// Tap the answer point until the in-call screen shows up
    pub async fn pick_call(&self) -> Result<()> {
        self.use_device(None).await?;
        let (x, y) = self.settings.answer_point;
        if self.poll_incoming_call(&[TouchAction::Tap { x, y }]).await? {
            return self
                .actor
                .wait_for_element(&self.end_call_button(), self.default_wait_secs)
                .await;
        }
        self.actor.fail(CALL_NOT_RECEIVED).await
    }

    /// Swipe the decline gesture until the call screen reacts
    pub async fn reject_call(&self) -> Result<()> {
        self.use_device(None).await?;
        let (from, to) = self.settings.decline_swipe;
        let swipe = TouchAction::swipe(from, to, self.settings.swipe_duration_ms);
        if self.poll_incoming_call(&swipe).await? {
            return Ok(());
        }
        self.actor.fail(CALL_NOT_RECEIVED).await
    }

    /// Each attempt performs `gesture`, waits, then counts the call container
    async fn poll_incoming_call(&self, gesture: &[TouchAction]) -> Result<bool> {
        let actor = self.actor;
        let locator = &self.incoming_call();
        let wait_secs = self.attempt_wait_secs;

        let outcome = poll_until(
            move || async move {
                actor.touch_perform(gesture).await?;
                actor.wait(wait_secs).await?;
                Ok(actor.grab_number_of_visible_elements(locator).await? > 0)
            },
            &self.poll,
        )
        .await?;

        match outcome {
            Ok(done) => {
                log::info!("Incoming call after {} attempts", done.attempts);
                Ok(true)
            }
            Err(timeout) => {
                log::warn!("{}", timeout);
                Ok(false)
            }
        }
    }

    pub async fn open_messages(&self, device: &str) -> Result<()> {
        self.use_device(Some(device)).await?;
        self.actor
            .start_app(&self.settings.messages_app, Some(device))
            .await?;
        self.actor
            .wait_for_element(&Locator::accessibility_id("Start chat"), self.default_wait_secs)
            .await
    }

    pub async fn send_message(&self, number: &str, text: &str) -> Result<()> {
        self.use_device(None).await?;
        self.actor.tap(&Locator::accessibility_id("Start chat")).await?;
        self.actor
            .fill_field(&self.messages_id("recipient_text_view"), number)
            .await?;
        self.actor.send_device_key_event(keycode::ENTER).await?;
        self.actor
            .fill_field(&self.messages_id("compose_message_text"), text)
            .await?;
        self.actor.tap(&Locator::accessibility_id("Send SMS")).await
    }

    pub async fn verify_message(&self, text: &str) -> Result<()> {
        self.use_device(None).await?;
        self.actor
            .see(text, Some(&self.messages_id("message_text")))
            .await
    }
}
