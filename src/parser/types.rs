use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Settings placed above the `---` separator of a YAML scenario file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FileHeader {
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub env: HashMap<String, String>,
    /// Base URL for relative `I am on page` paths
    pub url: Option<String>,
    /// Device serial used by the mobile steps
    pub device: Option<String>,
    /// CSV file, relative to the scenario file; each row runs the scenarios once
    pub data: Option<String>,
    #[serde(alias = "defaultWait")]
    pub default_wait_secs: Option<u64>,
}

/// Gherkin keyword in front of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keyword {
    Given,
    When,
    Then,
    And,
    But,
    #[serde(rename = "*")]
    Star,
}

impl Keyword {
    pub const ALL: [Keyword; 6] = [
        Keyword::Given,
        Keyword::When,
        Keyword::Then,
        Keyword::And,
        Keyword::But,
        Keyword::Star,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Given => "Given",
            Keyword::When => "When",
            Keyword::Then => "Then",
            Keyword::And => "And",
            Keyword::But => "But",
            Keyword::Star => "*",
        }
    }

    /// Split a leading keyword off a step line
    pub fn split(line: &str) -> (Option<Keyword>, &str) {
        let trimmed = line.trim_start();
        for keyword in Keyword::ALL {
            if let Some(rest) = trimmed.strip_prefix(keyword.as_str()) {
                if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                    return (Some(keyword), rest.trim());
                }
            }
        }
        (None, trimmed.trim_end())
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepLine {
    pub keyword: Option<Keyword>,
    /// Step text without its keyword
    pub text: String,
    /// 1-based line in the source file (item index for YAML lists)
    pub line: usize,
}

impl StepLine {
    pub fn parse(raw: &str, line: usize) -> Self {
        let (keyword, text) = Keyword::split(raw);
        Self {
            keyword,
            text: text.to_string(),
            line,
        }
    }

    /// Replace `<column>` placeholders with outline example values
    pub fn with_example(&self, row: &HashMap<String, String>) -> Self {
        let mut text = self.text.clone();
        for (column, value) in row {
            text = text.replace(&format!("<{}>", column), value);
        }
        Self {
            keyword: self.keyword,
            text,
            line: self.line,
        }
    }
}

impl fmt::Display for StepLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.keyword {
            Some(k) => write!(f, "{} {}", k, self.text),
            None => f.write_str(&self.text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub tags: Vec<String>,
    pub steps: Vec<StepLine>,
    pub line: usize,
}

impl Scenario {
    /// True when no filter is given or the scenario carries one of the tags
    pub fn matches_tags(&self, filter: &[String]) -> bool {
        filter.is_empty()
            || filter
                .iter()
                .any(|t| self.tags.iter().any(|own| own.trim_start_matches('@') == t.trim_start_matches('@')))
    }
}

/// One parsed `.feature` or YAML scenario file
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioFile {
    pub path: PathBuf,
    pub feature: String,
    pub header: FileHeader,
    /// Steps run before every scenario of the file
    pub background: Vec<StepLine>,
    pub scenarios: Vec<Scenario>,
}

impl ScenarioFile {
    pub fn step_count(&self) -> usize {
        self.scenarios
            .iter()
            .map(|s| s.steps.len() + self.background.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_split() {
        assert_eq!(
            Keyword::split("Given I am on page \"/\""),
            (Some(Keyword::Given), "I am on page \"/\"")
        );
        assert_eq!(Keyword::split("  * I wait for 1 second"), (Some(Keyword::Star), "I wait for 1 second"));
        // a word that merely starts with a keyword is not one
        assert_eq!(Keyword::split("Andromeda loads"), (None, "Andromeda loads"));
        assert_eq!(Keyword::split("I report \"x\""), (None, "I report \"x\""));
    }

    #[test]
    fn test_example_substitution() {
        let step = StepLine::parse("When I fill field \"Email\" with value \"<email>\"", 4);
        let row = HashMap::from([("email".to_string(), "a@b.c".to_string())]);
        let filled = step.with_example(&row);
        assert_eq!(filled.text, "I fill field \"Email\" with value \"a@b.c\"");
        assert_eq!(filled.to_string(), "When I fill field \"Email\" with value \"a@b.c\"");
    }

    #[test]
    fn test_tag_filter() {
        let scenario = Scenario {
            name: "s".into(),
            tags: vec!["@smoke".into(), "@mobile".into()],
            steps: vec![],
            line: 1,
        };
        assert!(scenario.matches_tags(&[]));
        assert!(scenario.matches_tags(&["smoke".to_string()]));
        assert!(!scenario.matches_tags(&["web".to_string()]));
    }
}
