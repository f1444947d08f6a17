//! Step text dispatch.
//!
//! Every definition is an anchored regular expression plus a handler. A step
//! line has its Gherkin keyword stripped, then must match exactly one
//! definition: no match is an undefined step, several matches are reported
//! as ambiguous rather than resolved by registration order.

use crate::driver::Actor;
use crate::error::StepError;
use crate::parser::types::Keyword;
use crate::runner::context::ScenarioContext;
use anyhow::Result;
use futures::future::BoxFuture;
use regex::Regex;
use std::str::FromStr;
use std::sync::Arc;

/// What a step handler works on: the facade and the scenario's state
pub struct World {
    pub actor: Arc<dyn Actor>,
    pub ctx: ScenarioContext,
    /// Helper last selected by a mobile flow, if any
    helper: Option<String>,
}

impl World {
    pub fn new(actor: Arc<dyn Actor>, ctx: ScenarioContext) -> Self {
        Self {
            actor,
            ctx,
            helper: None,
        }
    }

    /// Record that a page object moved the actor to `name`
    pub fn helper_switched(&mut self, name: &str) {
        self.helper = Some(name.to_string());
    }

    /// Return to the web helper after device steps; no-op otherwise
    pub async fn ensure_web(&mut self) -> Result<()> {
        let web = self.ctx.config.mobile.web_helper.clone();
        match self.helper {
            Some(ref current) if !current.eq_ignore_ascii_case(&web) => {
                self.actor.switch_helper(&web).await?;
                self.helper = Some(web);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

pub type StepHandler = for<'a> fn(&'a mut World, StepArgs) -> BoxFuture<'a, Result<()>>;

/// Captured groups of a matched step, indexed from 1 like regex groups
#[derive(Debug, Clone, PartialEq)]
pub struct StepArgs {
    pattern: String,
    captures: Vec<Option<String>>,
}

impl StepArgs {
    pub fn new(pattern: &str, captures: Vec<Option<String>>) -> Self {
        Self {
            pattern: pattern.to_string(),
            captures,
        }
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    pub fn str(&self, index: usize) -> Result<&str, StepError> {
        index
            .checked_sub(1)
            .and_then(|i| self.captures.get(i))
            .and_then(|c| c.as_deref())
            .ok_or_else(|| StepError::MissingCapture {
                pattern: self.pattern.clone(),
                index,
            })
    }

    /// Optional group; `None` when it did not participate in the match
    pub fn opt(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.captures.get(i))
            .and_then(|c| c.as_deref())
    }

    pub fn parse<T: FromStr>(&self, index: usize, expected: &'static str) -> Result<T, StepError> {
        let raw = self.str(index)?;
        raw.trim().parse().map_err(|_| StepError::InvalidCapture {
            index,
            value: raw.to_string(),
            expected,
        })
    }

    pub fn usize(&self, index: usize) -> Result<usize, StepError> {
        self.parse(index, "a non-negative integer")
    }

    pub fn u64(&self, index: usize) -> Result<u64, StepError> {
        self.parse(index, "a non-negative integer")
    }
}

pub struct StepDefinition {
    pub regex: Regex,
    /// Pattern as registered, before anchoring
    pub source: String,
    pub handler: StepHandler,
}

impl StepDefinition {
    fn args(&self, text: &str) -> Option<StepArgs> {
        let caps = self.regex.captures(text)?;
        let captures = caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect();
        Some(StepArgs::new(&self.source, captures))
    }
}

#[derive(Default)]
pub struct StepRegistry {
    definitions: Vec<StepDefinition>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pattern`; it is anchored at both ends if not already
    pub fn register(&mut self, pattern: &str, handler: StepHandler) -> Result<()> {
        let mut anchored = String::with_capacity(pattern.len() + 2);
        if !pattern.starts_with('^') {
            anchored.push('^');
        }
        anchored.push_str(pattern);
        if !pattern.ends_with('$') {
            anchored.push('$');
        }

        let regex = Regex::new(&anchored)
            .map_err(|e| anyhow::anyhow!("Invalid step pattern '{}': {}", pattern, e))?;
        self.definitions.push(StepDefinition {
            regex,
            source: pattern.to_string(),
            handler,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Registered patterns in registration order
    pub fn catalogue(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.source.as_str()).collect()
    }

    /// Find the single definition matching a step line
    pub fn find(&self, line: &str) -> Result<(&StepDefinition, StepArgs), StepError> {
        let (_, text) = Keyword::split(line);

        let mut matches: Vec<(&StepDefinition, StepArgs)> = self
            .definitions
            .iter()
            .filter_map(|d| d.args(text).map(|args| (d, args)))
            .collect();

        match matches.len() {
            0 => Err(StepError::Undefined(text.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(StepError::Ambiguous {
                text: text.to_string(),
                patterns: matches.iter().map(|(d, _)| d.source.clone()).collect(),
            }),
        }
    }

    /// Run the handler for a step line
    pub async fn dispatch(&self, line: &str, world: &mut World) -> Result<()> {
        let (definition, args) = self.find(line)?;
        log::debug!("'{}' matched {}", line, definition.source);
        (definition.handler)(world, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::dry_run::{ActorCall, DryRunDriver};
    use crate::utils::config::Config;
    use std::path::Path;

    fn open_page(world: &mut World, args: StepArgs) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { world.actor.open(args.str(1)?).await })
    }

    fn noop(_world: &mut World, _args: StepArgs) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { Ok(()) })
    }

    fn world(driver: Arc<DryRunDriver>) -> World {
        let ctx = ScenarioContext::new(Arc::new(Config::default()), Path::new("."), None, None);
        World::new(driver, ctx)
    }

    #[tokio::test]
    async fn test_dispatch_strips_keyword() {
        let mut registry = StepRegistry::new();
        registry.register(r#"I am on page "([^"]*)""#, open_page).unwrap();

        let driver = Arc::new(DryRunDriver::new());
        let mut w = world(driver.clone());
        registry.dispatch(r#"Given I am on page "/home""#, &mut w).await.unwrap();
        registry.dispatch(r#"I am on page "/about""#, &mut w).await.unwrap();

        assert_eq!(
            driver.calls(),
            vec![
                ActorCall::Open("/home".to_string()),
                ActorCall::Open("/about".to_string())
            ]
        );
    }

    #[test]
    fn test_patterns_are_anchored() {
        let mut registry = StepRegistry::new();
        registry.register(r#"I click on "([^"]*)""#, noop).unwrap();

        assert!(registry.find(r#"I click on "Save""#).is_ok());
        let err = registry
            .find(r#"I click on "Save" at position 2"#)
            .err()
            .unwrap();
        assert!(matches!(err, StepError::Undefined(_)));
    }

    #[test]
    fn test_ambiguous_match_is_reported() {
        let mut registry = StepRegistry::new();
        registry.register(r"I wait for (\d+) seconds?", noop).unwrap();
        registry.register(r"I wait for (.*)", noop).unwrap();

        match registry.find("When I wait for 2 seconds") {
            Err(StepError::Ambiguous { patterns, .. }) => assert_eq!(patterns.len(), 2),
            other => panic!("expected ambiguity, got {:?}", other.map(|(d, _)| &d.source)),
        }
    }

    #[test]
    fn test_typed_captures() {
        let args = StepArgs::new("p", vec![Some("3".into()), Some("x".into()), None]);
        assert_eq!(args.usize(1).unwrap(), 3);
        assert!(matches!(args.usize(2), Err(StepError::InvalidCapture { index: 2, .. })));
        assert!(matches!(args.str(3), Err(StepError::MissingCapture { index: 3, .. })));
        assert!(matches!(args.str(0), Err(StepError::MissingCapture { index: 0, .. })));
        assert_eq!(args.opt(3), None);
    }

    #[test]
    fn test_invalid_pattern() {
        let mut registry = StepRegistry::new();
        assert!(registry.register("I (broken", noop).is_err());
        assert!(registry.is_empty());
    }
}
