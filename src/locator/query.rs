//! Composable element query.
//!
//! A `Query` only describes an element: tag, attribute constraints, an
//! optional text match, an optional 1-based position and an optional parent
//! scope. Every builder method consumes `self` and returns a new value, so a
//! query is never mutated after it has been handed to a backend.
//!
//! Rendering to XPath always succeeds; rendering to CSS only succeeds for
//! queries without text or position constraints.

use super::xpath::{literal, normalize_space, tag_or_any};
use std::fmt;

/// How the element text has to match
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextMatch {
    Exact(String),
    /// Compared after collapsing whitespace on both sides
    Normalized(String),
    Contains(String),
}

/// Relationship between a query and its parent scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Scope {
    parent: Box<Query>,
    axis: Axis,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    tag: String,
    attrs: Vec<(String, String)>,
    text: Option<TextMatch>,
    position: Option<usize>,
    scope: Option<Scope>,
}

impl Query {
    /// Base query for an element type; an empty tag matches any element.
    pub fn by_tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            text: None,
            position: None,
            scope: None,
        }
    }

    /// Any element (`*`)
    pub fn any() -> Self {
        Self::by_tag("")
    }

    /// Narrow by an attribute equality. Repeated calls compose conjunctively.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_attrs<I, K, V>(self, attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        attrs
            .into_iter()
            .fold(self, |query, (k, v)| query.with_attr(k, v))
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(TextMatch::Exact(text.into()));
        self
    }

    pub fn with_normalized_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(TextMatch::Normalized(text.into()));
        self
    }

    pub fn containing_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(TextMatch::Contains(text.into()));
        self
    }

    /// Select the Nth match (1-based). Out-of-range positions are not checked
    /// here; the backend reports them as element-not-found.
    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Descendant of this query
    pub fn find(self, child: impl Into<Query>) -> Self {
        self.nest(child.into(), Axis::Descendant)
    }

    /// Direct child of this query
    pub fn child(self, child: impl Into<Query>) -> Self {
        self.nest(child.into(), Axis::Child)
    }

    /// Hangs `self` above the outermost ancestor of `child`, keeping any
    /// scope the child already carries
    fn nest(self, mut child: Query, axis: Axis) -> Self {
        child.scope = Some(match child.scope.take() {
            None => Scope {
                parent: Box::new(self),
                axis,
            },
            Some(inner) => Scope {
                parent: Box::new(self.nest(*inner.parent, axis)),
                axis: inner.axis,
            },
        });
        child
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    pub fn text(&self) -> Option<&TextMatch> {
        self.text.as_ref()
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn parent(&self) -> Option<&Query> {
        self.scope.as_ref().map(|s| s.parent.as_ref())
    }

    pub fn axis(&self) -> Option<Axis> {
        self.scope.as_ref().map(|s| s.axis)
    }

    pub fn to_xpath(&self) -> String {
        let path = match &self.scope {
            Some(scope) => {
                let sep = match scope.axis {
                    Axis::Child => "/",
                    Axis::Descendant => "//",
                };
                format!("{}{}{}", scope.parent.to_xpath(), sep, self.step())
            }
            None => format!("//{}", self.step()),
        };

        match self.position {
            Some(n) => format!("({})[{}]", path, n),
            None => path,
        }
    }

    fn step(&self) -> String {
        let mut out = tag_or_any(&self.tag).to_string();
        for (name, value) in &self.attrs {
            out.push_str(&format!("[@{}={}]", name, literal(value)));
        }
        match &self.text {
            Some(TextMatch::Exact(t)) => out.push_str(&format!("[.={}]", literal(t))),
            Some(TextMatch::Normalized(t)) => out.push_str(&format!(
                "[normalize-space(.)={}]",
                literal(&normalize_space(t))
            )),
            Some(TextMatch::Contains(t)) => {
                out.push_str(&format!("[contains(., {})]", literal(t)))
            }
            None => {}
        }
        out
    }

    pub fn to_css(&self) -> Option<String> {
        if self.text.is_some() || self.position.is_some() {
            return None;
        }

        let mut out = if self.tag.is_empty() {
            "*".to_string()
        } else {
            self.tag.clone()
        };
        for (name, value) in &self.attrs {
            out.push_str(&format!("[{}=\"{}\"]", name, css_escape(value)));
        }

        match &self.scope {
            Some(scope) => {
                let parent = scope.parent.to_css()?;
                let sep = match scope.axis {
                    Axis::Child => " > ",
                    Axis::Descendant => " ",
                };
                Some(format!("{}{}{}", parent, sep, out))
            }
            None => Some(out),
        }
    }
}

impl From<&str> for Query {
    fn from(tag: &str) -> Self {
        Query::by_tag(tag)
    }
}

impl From<String> for Query {
    fn from(tag: String) -> Self {
        Query::by_tag(tag)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xpath())
    }
}

pub(crate) fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_at_position() {
        let q = Query::by_tag("input").with_attr("placeholder", "Email").at(1);
        assert_eq!(q.to_xpath(), "(//input[@placeholder=\"Email\"])[1]");
        assert_eq!(q.to_css(), None);
    }

    #[test]
    fn test_builder_is_pure() {
        let build = || {
            Query::by_tag("mat-select")
                .with_attr("ng-reflect-placeholder", "Country")
                .with_attr("aria-label", "Country")
                .with_normalized_text("Viet  Nam")
                .at(2)
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_attrs_compose_conjunctively() {
        let q = Query::by_tag("input")
            .with_attr("type", "text")
            .with_attr("name", "first");
        assert_eq!(q.to_xpath(), "//input[@type=\"text\"][@name=\"first\"]");
        assert_eq!(
            q.to_css().as_deref(),
            Some("input[type=\"text\"][name=\"first\"]")
        );

        let batch = Query::by_tag("input").with_attrs([("type", "text"), ("name", "first")]);
        assert_eq!(batch, q);
    }

    #[test]
    fn test_composition_leaves_original_untouched() {
        let base = Query::by_tag("button");
        let narrowed = base.clone().with_text("Save");
        assert_eq!(base.to_xpath(), "//button");
        assert_eq!(narrowed.to_xpath(), "//button[.=\"Save\"]");
    }

    #[test]
    fn test_find_descendant_with_text() {
        let q = Query::by_tag("mat-tab-header")
            .find("div")
            .with_attr("role", "tab")
            .with_normalized_text(" Orders ");
        assert_eq!(
            q.to_xpath(),
            "//mat-tab-header//div[@role=\"tab\"][normalize-space(.)=\"Orders\"]"
        );
        assert_eq!(q.parent().map(|p| p.tag()), Some("mat-tab-header"));
    }

    #[test]
    fn test_nested_composition_keeps_every_ancestor() {
        let q = Query::by_tag("mat-card").find(Query::by_tag("mat-tab-header").find("div"));
        assert_eq!(q.to_xpath(), "//mat-card//mat-tab-header//div");

        let mixed = Query::by_tag("nav").child(Query::by_tag("ul").child("li").find("a"));
        assert_eq!(mixed.to_xpath(), "//nav/ul/li//a");
        assert_eq!(
            mixed.parent().and_then(|p| p.parent()).map(|p| p.tag()),
            Some("ul")
        );
    }

    #[test]
    fn test_child_axis_css() {
        let q = Query::by_tag("ul")
            .with_attr("class", "menu")
            .child(Query::by_tag("li"));
        assert_eq!(q.to_xpath(), "//ul[@class=\"menu\"]/li");
        assert_eq!(q.to_css().as_deref(), Some("ul[class=\"menu\"] > li"));
    }

    #[test]
    fn test_text_with_quotes_is_escaped() {
        let q = Query::any().containing_text("O'Brien \"Jr\"");
        assert_eq!(
            q.to_xpath(),
            "//*[contains(., concat(\"O'Brien \", '\"', \"Jr\", '\"'))]"
        );
    }

    #[test]
    fn test_css_escape() {
        let q = Query::by_tag("input").with_attr("placeholder", "say \"hi\"");
        assert_eq!(
            q.to_css().as_deref(),
            Some("input[placeholder=\"say \\\"hi\\\"\"]")
        );
    }

    #[test]
    fn test_positioned_parent() {
        let q = Query::by_tag("mat-card").at(2).find("button");
        assert_eq!(q.to_xpath(), "(//mat-card)[2]//button");
        assert_eq!(q.to_css(), None);
    }
}
