//! Escaped XPath fragments for predicates the query builder does not cover.

/// Quote `value` as an XPath 1.0 string literal.
///
/// XPath has no escape sequences, so a value holding both quote kinds is
/// split and rebuilt with `concat()`.
pub fn literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    if !value.contains('\'') {
        return format!("'{}'", value);
    }

    let mut pieces = Vec::new();
    for (i, part) in value.split('"').enumerate() {
        if i > 0 {
            pieces.push("'\"'".to_string());
        }
        if !part.is_empty() {
            pieces.push(format!("\"{}\"", part));
        }
    }
    format!("concat({})", pieces.join(", "))
}

/// `//tag[contains(text(), "...")]`
pub fn contains_text(tag: &str, text: &str) -> String {
    format!("//{}[contains(text(), {})]", tag_or_any(tag), literal(text))
}

/// `//tag[contains(@class, "...")]`
pub fn has_class(tag: &str, class: &str) -> String {
    format!("//{}[contains(@class, {})]", tag_or_any(tag), literal(class))
}

/// `//tag[normalize-space(.)="..."]`
pub fn normalized_text(tag: &str, text: &str) -> String {
    format!(
        "//{}[normalize-space(.)={}]",
        tag_or_any(tag),
        literal(&normalize_space(text))
    )
}

/// Collapse whitespace runs the way XPath `normalize-space()` does.
pub fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn tag_or_any(tag: &str) -> &str {
    if tag.is_empty() {
        "*"
    } else {
        tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_plain() {
        assert_eq!(literal("Email"), "\"Email\"");
    }

    #[test]
    fn test_literal_with_double_quote() {
        assert_eq!(literal("say \"hi\""), "'say \"hi\"'");
    }

    #[test]
    fn test_literal_with_both_quotes() {
        assert_eq!(
            literal("it's \"x\""),
            "concat(\"it's \", '\"', \"x\", '\"')"
        );
    }

    #[test]
    fn test_contains_text() {
        assert_eq!(
            contains_text("span", "Request"),
            "//span[contains(text(), \"Request\")]"
        );
        assert_eq!(
            has_class("div", "mat-tab-label-content"),
            "//div[contains(@class, \"mat-tab-label-content\")]"
        );
    }

    #[test]
    fn test_normalize_space() {
        assert_eq!(normalize_space("  Save \n  draft "), "Save draft");
        assert_eq!(
            normalized_text("", " Save  draft"),
            "//*[normalize-space(.)=\"Save draft\"]"
        );
    }
}
