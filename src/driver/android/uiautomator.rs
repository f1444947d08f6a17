//! uiautomator dump parsing and locator matching
//!
//! The dump is flattened in document order; each node keeps the index of its
//! parent so scoped queries can be evaluated without an XPath engine.

use crate::locator::xpath::normalize_space;
use crate::locator::{Axis, Locator, Query, TextMatch};
use anyhow::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::sync::OnceLock;

/// Decode HTML entities left in attribute values, including numeric ones
fn decode_html_entities(s: &str) -> String {
    static NUMERIC: OnceLock<Regex> = OnceLock::new();
    let numeric = NUMERIC
        .get_or_init(|| Regex::new(r"&#(x[0-9A-Fa-f]+|\d+);").expect("valid entity regex"));

    let result = s
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");

    numeric
        .replace_all(&result, |caps: &regex::Captures| {
            let raw = &caps[1];
            let code = match raw.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => raw.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string()
}

/// Represents a UI element from the view hierarchy
#[derive(Debug, Clone, Default)]
pub struct UiElement {
    pub class: String,
    pub text: String,
    pub resource_id: String,
    pub content_desc: String,
    pub hint: String,
    pub bounds: Bounds,
    pub clickable: bool,
    pub enabled: bool,
    pub checked: bool,
    /// Index of the enclosing node in the flattened list
    pub parent: Option<usize>,
}

impl UiElement {
    /// Visible text, falling back to the content description
    pub fn label(&self) -> &str {
        if self.text.is_empty() {
            &self.content_desc
        } else {
            &self.text
        }
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "text" => Some(self.text.clone()),
            "resource-id" | "id" => Some(self.resource_id.clone()),
            "content-desc" => Some(self.content_desc.clone()),
            "hint" | "placeholder" => Some(self.hint.clone()),
            "class" => Some(self.class.clone()),
            "clickable" => Some(self.clickable.to_string()),
            "enabled" => Some(self.enabled.to_string()),
            "checked" => Some(self.checked.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    /// Get the center point of the bounds
    pub fn center(&self) -> (i32, i32) {
        let x = (self.left + self.right) / 2;
        let y = (self.top + self.bottom) / 2;
        (x, y)
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Parse bounds from string like "[0,0][1080,1920]"
    pub fn from_string(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split("][").collect();
        if parts.len() != 2 {
            return None;
        }

        let left_top = parts[0].trim_start_matches('[');
        let right_bottom = parts[1].trim_end_matches(']');

        let lt: Vec<i32> = left_top.split(',').filter_map(|s| s.parse().ok()).collect();
        let rb: Vec<i32> = right_bottom
            .split(',')
            .filter_map(|s| s.parse().ok())
            .collect();

        if lt.len() == 2 && rb.len() == 2 {
            Some(Bounds {
                left: lt[0],
                top: lt[1],
                right: rb[0],
                bottom: rb[1],
            })
        } else {
            None
        }
    }
}

fn node_from(e: &BytesStart, parent: Option<usize>) -> UiElement {
    let mut element = UiElement {
        enabled: true,
        parent,
        ..Default::default()
    };

    for attr in e.attributes().filter_map(|a| a.ok()) {
        let key = String::from_utf8_lossy(attr.key.as_ref());
        let value = String::from_utf8_lossy(&attr.value);

        match key.as_ref() {
            "class" => element.class = value.to_string(),
            "text" => element.text = decode_html_entities(&value),
            "resource-id" => element.resource_id = value.to_string(),
            "content-desc" => element.content_desc = decode_html_entities(&value),
            "hint" => element.hint = decode_html_entities(&value),
            "bounds" => {
                if let Some(b) = Bounds::from_string(&value) {
                    element.bounds = b;
                }
            }
            "clickable" => element.clickable = value == "true",
            "enabled" => element.enabled = value == "true",
            "checked" => element.checked = value == "true",
            _ => {}
        }
    }

    element
}

/// Parse UI hierarchy XML from uiautomator dump
pub fn parse_hierarchy(xml: &str) -> Result<Vec<UiElement>> {
    let mut elements: Vec<UiElement> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"node" => {
                elements.push(node_from(e, open.last().copied()));
                open.push(elements.len() - 1);
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"node" => {
                elements.push(node_from(e, open.last().copied()));
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"node" => {
                open.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => anyhow::bail!("Invalid hierarchy XML at {}: {}", reader.buffer_position(), e),
            _ => {}
        }
        buf.clear();
    }

    Ok(elements)
}

fn normalize_text(s: &str) -> String {
    normalize_space(&s.replace('\u{00A0}', " "))
}

fn matches_id(element: &UiElement, id: &str) -> bool {
    element.resource_id == id || element.resource_id.ends_with(&format!("/{}", id))
}

fn matches_tag(element: &UiElement, tag: &str) -> bool {
    tag.is_empty()
        || tag == "*"
        || element.class == tag
        || element.class.ends_with(&format!(".{}", tag))
}

fn matches_text(element: &UiElement, text: &TextMatch) -> bool {
    let own = element.label();
    match text {
        TextMatch::Exact(t) => own == t,
        TextMatch::Normalized(t) => normalize_text(own) == normalize_text(t),
        TextMatch::Contains(t) => own.contains(t.as_str()),
    }
}

fn matches_step(element: &UiElement, query: &Query) -> bool {
    matches_tag(element, query.tag())
        && query.attrs().iter().all(|(name, value)| match name.as_str() {
            "resource-id" | "id" => matches_id(element, value),
            _ => element.attribute(name).as_deref() == Some(value.as_str()),
        })
        && query.text().map_or(true, |t| matches_text(element, t))
}

pub fn has_ancestor_in(elements: &[UiElement], index: usize, parents: &[usize]) -> bool {
    let mut current = elements[index].parent;
    while let Some(p) = current {
        if parents.contains(&p) {
            return true;
        }
        current = elements[p].parent;
    }
    false
}

/// Indices of the elements a query selects, in document order
pub fn select(elements: &[UiElement], query: &Query) -> Vec<usize> {
    let mut selected: Vec<usize> = (0..elements.len())
        .filter(|&i| matches_step(&elements[i], query))
        .collect();

    if let (Some(parent), Some(axis)) = (query.parent(), query.axis()) {
        let parents = select(elements, parent);
        selected.retain(|&i| match axis {
            Axis::Child => elements[i].parent.map_or(false, |p| parents.contains(&p)),
            Axis::Descendant => has_ancestor_in(elements, i, &parents),
        });
    }

    match query.position() {
        Some(n) => selected.into_iter().nth(n.saturating_sub(1)).into_iter().collect(),
        None => selected,
    }
}

/// Indices of the elements a locator selects on a device screen
pub fn find_indices(elements: &[UiElement], locator: &Locator) -> Result<Vec<usize>> {
    let all = 0..elements.len();
    let found = match locator {
        Locator::Semantic(text) => {
            let wanted = normalize_text(text);
            all.filter(|&i| {
                let e = &elements[i];
                normalize_text(&e.text) == wanted
                    || normalize_text(&e.content_desc) == wanted
                    || normalize_text(&e.hint) == wanted
                    || matches_id(e, text)
            })
            .collect()
        }
        Locator::Id(id) => all.filter(|&i| matches_id(&elements[i], id)).collect(),
        Locator::AccessibilityId(desc) => all
            .filter(|&i| elements[i].content_desc == *desc)
            .collect(),
        Locator::Query(q) => select(elements, q),
        Locator::Css(_) | Locator::XPath(_) => {
            anyhow::bail!("Locator {} is not supported on Android", locator)
        }
    };
    Ok(found)
}

/// Like [`find_indices`], restricted to descendants of `context` when given
pub fn find_in_context(
    elements: &[UiElement],
    locator: &Locator,
    context: Option<&Locator>,
) -> Result<Vec<usize>> {
    let found = find_indices(elements, locator)?;
    match context {
        Some(ctx) => {
            let scopes = find_indices(elements, ctx)?;
            Ok(found
                .into_iter()
                .filter(|&i| has_ancestor_in(elements, i, &scopes))
                .collect())
        }
        None => Ok(found),
    }
}

/// Elements a locator selects on a device screen
pub fn find_all<'a>(elements: &'a [UiElement], locator: &Locator) -> Result<Vec<&'a UiElement>> {
    Ok(find_indices(elements, locator)?
        .into_iter()
        .map(|i| &elements[i])
        .collect())
}

/// Indices of elements whose visible text contains `text`
pub fn find_text(elements: &[UiElement], text: &str) -> Vec<usize> {
    let wanted = normalize_text(text);
    (0..elements.len())
        .filter(|&i| normalize_text(elements[i].label()).contains(&wanted))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<hierarchy rotation="0">
  <node index="0" text="" class="android.widget.FrameLayout" resource-id="" bounds="[0,0][1080,2400]">
    <node index="0" text="" class="android.widget.LinearLayout" resource-id="com.android.dialer:id/dialpad" bounds="[0,1200][1080,2400]">
      <node index="0" text="1" class="android.widget.TextView" resource-id="com.android.dialer:id/one" clickable="true" bounds="[0,1200][360,1400]" />
      <node index="1" text="Call" class="android.widget.Button" resource-id="com.android.dialer:id/dialpad_voice_call_button" content-desc="dial" clickable="true" bounds="[400,2200][680,2380]" />
    </node>
    <node index="1" text="Tom &amp; Jerry" class="android.widget.TextView" resource-id="" bounds="[0,0][1080,100]" />
  </node>
</hierarchy>"#;

    #[test]
    fn test_parse_keeps_parent_links() {
        let elements = parse_hierarchy(DUMP).unwrap();
        assert_eq!(elements.len(), 5);
        assert_eq!(elements[0].parent, None);
        assert_eq!(elements[1].parent, Some(0));
        assert_eq!(elements[2].parent, Some(1));
        assert_eq!(elements[3].parent, Some(1));
        assert_eq!(elements[4].parent, Some(0));
        assert_eq!(elements[4].text, "Tom & Jerry");
        assert_eq!(elements[3].bounds.center(), (540, 2290));
    }

    #[test]
    fn test_find_by_semantic_and_id() {
        let elements = parse_hierarchy(DUMP).unwrap();
        let call = find_all(&elements, &Locator::semantic("Call")).unwrap();
        assert_eq!(call.len(), 1);
        let by_id = find_all(&elements, &Locator::id("dialpad_voice_call_button")).unwrap();
        assert_eq!(by_id[0].text, "Call");
        let by_desc = find_all(&elements, &Locator::accessibility_id("dial")).unwrap();
        assert_eq!(by_desc.len(), 1);
    }

    #[test]
    fn test_scoped_query() {
        let elements = parse_hierarchy(DUMP).unwrap();
        let q = Query::by_tag("LinearLayout")
            .with_attr("resource-id", "dialpad")
            .child("TextView");
        let found = find_all(&elements, &q.into()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "1");

        let all_text = Query::any().find(Query::by_tag("TextView"));
        assert_eq!(select(&elements, &all_text).len(), 2);
        assert_eq!(select(&elements, &all_text.at(2)), vec![4]);
    }

    #[test]
    fn test_context_restricts_matches() {
        let elements = parse_hierarchy(DUMP).unwrap();
        let dialpad = Locator::id("dialpad");
        let inside =
            find_in_context(&elements, &Locator::semantic("1"), Some(&dialpad)).unwrap();
        assert_eq!(inside, vec![2]);
        let outside =
            find_in_context(&elements, &Locator::semantic("Tom & Jerry"), Some(&dialpad)).unwrap();
        assert!(outside.is_empty());
        assert_eq!(find_text(&elements, "Jerry"), vec![4]);
    }

    #[test]
    fn test_raw_xpath_unsupported() {
        let elements = parse_hierarchy(DUMP).unwrap();
        assert!(find_all(&elements, &Locator::xpath("//node")).is_err());
    }

    #[test]
    fn test_bounds_parse() {
        let b = Bounds::from_string("[10,20][30,40]").unwrap();
        assert_eq!(b.center(), (20, 30));
        assert!(Bounds::from_string("garbage").is_none());
    }
}
