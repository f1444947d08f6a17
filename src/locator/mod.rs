//! Element locators handed to the [`Actor`](crate::driver::traits::Actor).
//!
//! Locators are plain data. Nothing here touches a page or device; a locator
//! that matches nothing only fails once a backend tries to resolve it.

pub mod query;
pub mod xpath;

pub use query::{Axis, Query, TextMatch};

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Label, placeholder, name or visible text; the backend picks the strategy
    Semantic(String),
    Css(String),
    /// Raw XPath, accepted verbatim
    XPath(String),
    /// Resource id (Android) or DOM id (web)
    Id(String),
    /// Accessibility id / content description
    AccessibilityId(String),
    Query(Query),
}

impl Locator {
    pub fn semantic(text: impl Into<String>) -> Self {
        Self::Semantic(text.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn accessibility_id(id: impl Into<String>) -> Self {
        Self::AccessibilityId(id.into())
    }

    /// XPath form when one exists without backend knowledge
    pub fn as_xpath(&self) -> Option<String> {
        match self {
            Locator::XPath(x) => Some(x.clone()),
            Locator::Query(q) => Some(q.to_xpath()),
            Locator::Id(id) => Some(format!("//*[@id={}]", xpath::literal(id))),
            Locator::AccessibilityId(id) => {
                Some(format!("//*[@aria-label={}]", xpath::literal(id)))
            }
            Locator::Semantic(_) | Locator::Css(_) => None,
        }
    }
}

impl From<Query> for Locator {
    fn from(query: Query) -> Self {
        Locator::Query(query)
    }
}

impl From<&str> for Locator {
    fn from(text: &str) -> Self {
        Locator::Semantic(text.to_string())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Semantic(t) => write!(f, "\"{}\"", t),
            Locator::Css(c) => write!(f, "css={}", c),
            Locator::XPath(x) => write!(f, "xpath={}", x),
            Locator::Id(id) => write!(f, "id={}", id),
            Locator::AccessibilityId(id) => write!(f, "~{}", id),
            Locator::Query(q) => write!(f, "xpath={}", q.to_xpath()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Locator::semantic("Save").to_string(), "\"Save\"");
        assert_eq!(Locator::id("call_button").to_string(), "id=call_button");
        let q: Locator = Query::by_tag("textarea")
            .with_attr("placeholder", "Notes")
            .into();
        assert_eq!(q.to_string(), "xpath=//textarea[@placeholder=\"Notes\"]");
    }

    #[test]
    fn test_as_xpath() {
        assert_eq!(Locator::css("a.menu").as_xpath(), None);
        assert_eq!(
            Locator::id("main").as_xpath().as_deref(),
            Some("//*[@id=\"main\"]")
        );
        assert_eq!(
            Locator::xpath("//span").as_xpath().as_deref(),
            Some("//span")
        );
    }
}
