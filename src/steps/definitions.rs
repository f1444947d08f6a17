//! The step phrase catalogue.
//!
//! Quoted arguments that carry values (field input, expected text, phone
//! numbers, messages) go through the data resolver first, so they may be
//! stored keys or random-data tokens. Steps that only make sense in the
//! browser switch back to the web helper after a device flow; generic steps
//! act on whichever helper is active.

use super::registry::{StepArgs, StepRegistry, World};
use super::slot::{format_slot, next_available_slot, SlotWindow};
use crate::data::generator::{self, DataKind};
use crate::driver::Actor;
use crate::locator::{xpath, Locator, Query};
use crate::pages::{LeftMenuPage, MobileComponent};
use crate::utils::config::Config;
use anyhow::Result;
use futures::future::BoxFuture;
use regex::Regex;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

pub const REQUEST_ID_MISSING: &str = "Request Id not available";

/// Build a registry holding every phrase below
pub fn default_registry() -> Result<StepRegistry> {
    let mut registry = StepRegistry::new();
    register_all(&mut registry)?;
    Ok(registry)
}

pub fn register_all(registry: &mut StepRegistry) -> Result<()> {
    // navigation and input
    registry.register(r#"I am on page "([^"]*)""#, am_on_page)?;
    registry.register(
        r#"I fill field for "([^"]*)" at position (\d+) with value "([^"]*)""#,
        fill_field_at_position,
    )?;
    registry.register(r#"I fill field "([^"]*)" with value "([^"]*)""#, fill_field)?;
    registry.register(r#"I fill textarea for "([^"]*)" with value "([^"]*)""#, fill_textarea)?;
    registry.register(r#"I select "([^"]*)" from dropdown "([^"]*)""#, select_from_dropdown)?;
    registry.register(r#"I click on "([^"]*)""#, click)?;
    registry.register(r#"I click on "([^"]*)" at position (\d+)"#, click_at_position)?;
    registry.register(r#"I click on tab "([^"]*)""#, click_tab)?;
    registry.register(r#"I check option "([^"]*)""#, check_option)?;
    registry.register(r#"I (enable|disable) toggle "([^"]*)""#, set_toggle)?;

    // assertions and waits
    registry.register(r#"I should see "([^"]*)""#, see)?;
    registry.register(r#"I should see "([^"]*)" in "([^"]*)""#, see_in)?;
    registry.register(r#"I should not see "([^"]*)""#, dont_see)?;
    registry.register(r"I wait for (\d+) seconds?", wait)?;
    registry.register(r#"I wait for element "([^"]*)" for (\d+) seconds?"#, wait_for_element)?;

    // test data
    registry.register(r#"I store request id from "([^"]*)" as "([^"]*)""#, store_request_id)?;
    registry.register(r#"I store value "([^"]*)" as "([^"]*)""#, store_value)?;
    registry.register(
        r#"I generate (email|name|phone|uuid|password|number) as "([^"]*)""#,
        generate_value,
    )?;
    registry.register(
        r#"I select the next available time slot in "([^"]*)""#,
        select_next_slot,
    )?;

    // left menu
    registry.register(r#"I navigate to "([^"]*)" in left menu"#, navigate_left_menu)?;
    registry.register(
        r#"I navigate to "([^"]*)" under "([^"]*)" in left menu"#,
        navigate_left_menu_sub_item,
    )?;
    registry.register(r#"I should see "([^"]*)" active in left menu"#, verify_left_menu_active)?;

    // device flows
    registry.register(r#"I open the dialer on device "([^"]*)""#, open_dialer)?;
    registry.register(r#"I call "([^"]*)""#, place_call)?;
    registry.register(r"I end the call", end_call)?;
    registry.register(r"I (pick up|reject) the incoming call", answer_call)?;
    registry.register(
        r#"I send message "([^"]*)" to "([^"]*)" on device "([^"]*)""#,
        send_message,
    )?;
    registry.register(r#"I should see message "([^"]*)""#, verify_message)?;

    registry.register(r#"I report "([^"]*)""#, report)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    Enable,
    Disable,
}

impl FromStr for ToggleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enable" => Ok(ToggleState::Enable),
            "disable" => Ok(ToggleState::Disable),
            other => Err(format!("unknown toggle state '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallAction {
    PickUp,
    Reject,
}

impl FromStr for CallAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pick up" => Ok(CallAction::PickUp),
            "reject" => Ok(CallAction::Reject),
            other => Err(format!("unknown call action '{}'", other)),
        }
    }
}

fn digits_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid digits regex"))
}

/// First run of digits in any of the texts
pub fn extract_request_id(texts: &[String]) -> Option<String> {
    texts
        .iter()
        .find_map(|t| digits_regex().find(t).map(|m| m.as_str().to_string()))
}

fn placeholder_input(placeholder: &str, position: usize) -> Locator {
    Query::by_tag("input")
        .with_attr("placeholder", placeholder)
        .at(position)
        .into()
}

/// Handles for a device flow; records the switch on the world
fn device(world: &mut World) -> (Arc<dyn Actor>, Arc<Config>) {
    let config = world.ctx.config.clone();
    world.helper_switched(&config.mobile.helper);
    (world.actor.clone(), config)
}

fn am_on_page(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        world.ensure_web().await?;
        let url = world.ctx.page_url(args.str(1)?);
        world.actor.open(&url).await
    })
}

fn fill_field_at_position(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        world.ensure_web().await?;
        let locator = placeholder_input(args.str(1)?, args.usize(2)?);
        let value = world.ctx.resolve(args.str(3)?);
        world.actor.fill_field(&locator, &value).await
    })
}

fn fill_field(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let value = world.ctx.resolve(args.str(2)?);
        world
            .actor
            .fill_field(&Locator::semantic(args.str(1)?), &value)
            .await
    })
}

fn fill_textarea(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        world.ensure_web().await?;
        let locator: Locator = Query::by_tag("textarea")
            .with_attr("placeholder", args.str(1)?)
            .into();
        let value = world.ctx.resolve(args.str(2)?);
        world.actor.fill_field(&locator, &value).await
    })
}

fn select_from_dropdown(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        world.ensure_web().await?;
        let option = world.ctx.resolve(args.str(1)?);
        let select: Locator = Query::by_tag("mat-select")
            .with_attr("ng-reflect-placeholder", args.str(2)?)
            .into();
        let choice: Locator = Query::by_tag("mat-option")
            .with_normalized_text(option)
            .into();

        world.actor.click(&select, None).await?;
        world
            .actor
            .wait_for_element(&choice, world.ctx.default_wait_secs)
            .await?;
        world.actor.click(&choice, None).await
    })
}

fn click(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        world
            .actor
            .click(&Locator::semantic(args.str(1)?), None)
            .await
    })
}

fn click_at_position(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let text = xpath::normalize_space(args.str(1)?);
        let locator = Locator::xpath(format!(
            "(//*[normalize-space(text())={}])[{}]",
            xpath::literal(&text),
            args.usize(2)?
        ));
        world.actor.click(&locator, None).await
    })
}

fn click_tab(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        world.ensure_web().await?;
        let label = xpath::normalize_space(args.str(1)?);
        let tab = Locator::xpath(format!(
            "{}[normalize-space(.)={}]",
            xpath::has_class("div", "mat-tab-label-content"),
            xpath::literal(&label)
        ));
        world.actor.click(&tab, None).await
    })
}

fn check_option(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        world
            .actor
            .check_option(&Locator::semantic(args.str(1)?))
            .await
    })
}

/// With `AI_PW` the toggle is found by its aria-label and its state read
/// from `aria-checked`; otherwise by its label text and `mat-checked`.
fn set_toggle(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        world.ensure_web().await?;
        let state: ToggleState = args.parse(1, "enable or disable")?;
        let label = args.str(2)?;
        let want_on = state == ToggleState::Enable;

        let (toggle, in_state): (Locator, Locator) = if world.ctx.config.ai_pw {
            let base = Query::any()
                .with_attr("role", "switch")
                .with_attr("aria-label", label);
            (
                base.clone().into(),
                base.with_attr("aria-checked", if want_on { "true" } else { "false" })
                    .into(),
            )
        } else {
            let base = Query::by_tag("mat-slide-toggle").with_normalized_text(label);
            let checked = format!("{}[contains(@class, \"mat-checked\")]", base.to_xpath());
            let unchecked = format!("{}[not(contains(@class, \"mat-checked\"))]", base.to_xpath());
            (
                base.into(),
                Locator::xpath(if want_on { checked } else { unchecked }),
            )
        };

        if world.actor.grab_number_of_visible_elements(&in_state).await? > 0 {
            log::debug!("Toggle '{}' already {:?}d", label, state);
            return Ok(());
        }
        world.actor.click(&toggle, None).await
    })
}

fn see(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let text = world.ctx.resolve(args.str(1)?);
        world.actor.see(&text, None).await
    })
}

fn see_in(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let text = world.ctx.resolve(args.str(1)?);
        let context = Locator::semantic(args.str(2)?);
        world.actor.see(&text, Some(&context)).await
    })
}

fn dont_see(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let text = world.ctx.resolve(args.str(1)?);
        world.actor.dont_see(&text, None).await
    })
}

fn wait(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move { world.actor.wait(args.u64(1)?).await })
}

fn wait_for_element(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        world
            .actor
            .wait_for_element(&Locator::semantic(args.str(1)?), args.u64(2)?)
            .await
    })
}

fn store_request_id(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        world.ensure_web().await?;
        let source = Locator::xpath(xpath::contains_text("*", args.str(1)?));
        let key = args.str(2)?;

        let texts = world.actor.grab_text_from_all(&source).await?;
        match extract_request_id(&texts) {
            Some(id) => {
                log::info!("Stored request id {} as '{}'", id, key);
                world.ctx.data.set_field(key, id);
                Ok(())
            }
            None => world.actor.fail(REQUEST_ID_MISSING).await,
        }
    })
}

fn store_value(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let value = world.ctx.resolve(args.str(1)?);
        world.ctx.data.set_field(args.str(2)?, value);
        Ok(())
    })
}

fn generate_value(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let kind: DataKind = args.parse(1, "a data kind")?;
        let settings = &world.ctx.config.data;
        let value = generator::generate(kind, settings.password_length, settings.numeric_length);
        log::debug!("Generated {:?} value '{}'", kind, value);
        world.ctx.data.set_field(args.str(2)?, value);
        Ok(())
    })
}

fn select_next_slot(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        world.ensure_web().await?;
        let window = SlotWindow::from_settings(&world.ctx.config.slots)?;
        let slot = format_slot(next_available_slot(chrono::Local::now().time(), &window)?);

        let field: Locator = Query::by_tag("input")
            .with_attr("placeholder", args.str(1)?)
            .into();
        world.actor.fill_field(&field, &slot).await?;
        world.ctx.data.set_field("slot", slot);
        Ok(())
    })
}

fn navigate_left_menu(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        world.ensure_web().await?;
        LeftMenuPage::new(world.actor.as_ref(), world.ctx.default_wait_secs)
            .navigate_to(args.str(1)?)
            .await
    })
}

fn navigate_left_menu_sub_item(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        world.ensure_web().await?;
        LeftMenuPage::new(world.actor.as_ref(), world.ctx.default_wait_secs)
            .navigate_to_sub_item(args.str(2)?, args.str(1)?)
            .await
    })
}

fn verify_left_menu_active(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        world.ensure_web().await?;
        LeftMenuPage::new(world.actor.as_ref(), world.ctx.default_wait_secs)
            .verify_active(args.str(1)?)
            .await
    })
}

fn open_dialer(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let device_id = world.ctx.resolve(args.str(1)?);
        let (actor, config) = device(world);
        MobileComponent::new(actor.as_ref(), &config)
            .open_dialer(&device_id)
            .await
    })
}

fn place_call(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let number = world.ctx.resolve(args.str(1)?);
        let (actor, config) = device(world);
        MobileComponent::new(actor.as_ref(), &config)
            .place_call(&number)
            .await
    })
}

fn end_call(world: &mut World, _args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let (actor, config) = device(world);
        MobileComponent::new(actor.as_ref(), &config).end_call().await
    })
}

fn answer_call(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let action: CallAction = args.parse(1, "pick up or reject")?;
        let (actor, config) = device(world);
        let mobile = MobileComponent::new(actor.as_ref(), &config);
        match action {
            CallAction::PickUp => mobile.pick_call().await,
            CallAction::Reject => mobile.reject_call().await,
        }
    })
}

fn send_message(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let text = world.ctx.resolve(args.str(1)?);
        let number = world.ctx.resolve(args.str(2)?);
        let device_id = world.ctx.resolve(args.str(3)?);
        let (actor, config) = device(world);
        let mobile = MobileComponent::new(actor.as_ref(), &config);
        mobile.open_messages(&device_id).await?;
        mobile.send_message(&number, &text).await
    })
}

fn verify_message(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let text = world.ctx.resolve(args.str(1)?);
        let (actor, config) = device(world);
        MobileComponent::new(actor.as_ref(), &config)
            .verify_message(&text)
            .await
    })
}

fn report(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
    Box::pin(async move {
        let message = world.ctx.resolve(args.str(1)?);
        world.actor.report(&message).await
    })
}
