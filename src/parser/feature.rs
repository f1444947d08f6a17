//! Line-based reader for `.feature` files.
//!
//! Supports `Feature`, `Background`, `Scenario`, `Scenario Outline` with
//! `Examples` tables, `@tag` lines and `#` comments. Step data tables and
//! doc strings are rejected.

use super::types::{FileHeader, Scenario, ScenarioFile, StepLine};
use crate::error::ParseError;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

pub fn parse_feature_file(path: &Path) -> Result<ScenarioFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    parse_feature_content(&content, path)
}

#[derive(Default)]
struct Outline {
    scenario: Scenario,
    /// Set once an `Examples:` heading is seen
    has_examples: bool,
    /// Header of the Examples block being read
    columns: Vec<String>,
    rows: Vec<HashMap<String, String>>,
}

enum Section {
    Preamble,
    Background,
    Scenario,
    Examples,
}

pub fn parse_feature_content(content: &str, source_path: &Path) -> Result<ScenarioFile> {
    let path_str = source_path.display().to_string();
    let syntax = |line: usize, message: &str| -> anyhow::Error {
        ParseError::Syntax {
            path: path_str.clone(),
            line,
            message: message.to_string(),
        }
        .into()
    };

    let mut feature = None;
    let mut feature_tags: Vec<String> = Vec::new();
    let mut pending_tags: Vec<String> = Vec::new();
    let mut background = Vec::new();
    let mut outlines: Vec<Outline> = Vec::new();
    let mut section = Section::Preamble;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('@') {
            pending_tags.extend(line.split_whitespace().map(str::to_string));
            continue;
        }

        if let Some(name) = line.strip_prefix("Feature:") {
            if feature.is_some() {
                return Err(syntax(line_no, "only one Feature per file"));
            }
            feature = Some(name.trim().to_string());
            feature_tags = std::mem::take(&mut pending_tags);
            continue;
        }

        if line.starts_with("Background:") {
            section = Section::Background;
            continue;
        }

        let heading = ["Scenario Outline:", "Scenario Template:", "Scenario:", "Example:"]
            .iter()
            .find_map(|h| line.strip_prefix(h));
        if let Some(name) = heading {
            let mut tags = feature_tags.clone();
            tags.append(&mut pending_tags);
            outlines.push(Outline {
                scenario: Scenario {
                    name: name.trim().to_string(),
                    tags,
                    steps: Vec::new(),
                    line: line_no,
                },
                ..Default::default()
            });
            section = Section::Scenario;
            continue;
        }

        if line.starts_with("Examples:") || line.starts_with("Scenarios:") {
            let Some(outline) = outlines.last_mut() else {
                return Err(syntax(line_no, "Examples outside of a Scenario Outline"));
            };
            // every block brings its own header row
            outline.has_examples = true;
            outline.columns.clear();
            section = Section::Examples;
            continue;
        }

        if line.starts_with('|') {
            let cells: Vec<String> = line
                .trim_matches('|')
                .split('|')
                .map(|c| c.trim().to_string())
                .collect();
            match (&section, outlines.last_mut()) {
                (Section::Examples, Some(outline)) => {
                    if outline.columns.is_empty() {
                        outline.columns = cells;
                    } else if cells.len() != outline.columns.len() {
                        return Err(syntax(line_no, "example row width does not match its header"));
                    } else {
                        outline
                            .rows
                            .push(outline.columns.iter().cloned().zip(cells).collect());
                    }
                }
                _ => return Err(syntax(line_no, "step data tables are not supported")),
            }
            continue;
        }

        if line.starts_with("\"\"\"") || line.starts_with("```") {
            return Err(syntax(line_no, "doc strings are not supported"));
        }

        let step = StepLine::parse(line, line_no);
        match (&section, step.keyword) {
            (Section::Background, Some(_)) => background.push(step),
            (Section::Scenario, Some(_)) => {
                if let Some(outline) = outlines.last_mut() {
                    outline.scenario.steps.push(step);
                }
            }
            (Section::Examples, Some(_)) => {
                return Err(syntax(line_no, "step after Examples; start a new Scenario first"))
            }
            // free-text description under a heading
            (_, None) => {}
            (Section::Preamble, Some(_)) => {
                return Err(syntax(line_no, "step outside of a Scenario or Background"))
            }
        }
    }

    let mut scenarios = Vec::new();
    for outline in outlines {
        if !outline.has_examples {
            scenarios.push(outline.scenario);
            continue;
        }
        if outline.rows.is_empty() {
            return Err(syntax(outline.scenario.line, "Examples table has no rows"));
        }
        for (n, row) in outline.rows.iter().enumerate() {
            scenarios.push(Scenario {
                name: format!("{} (example {})", outline.scenario.name, n + 1),
                tags: outline.scenario.tags.clone(),
                steps: outline
                    .scenario
                    .steps
                    .iter()
                    .map(|s| s.with_example(row))
                    .collect(),
                line: outline.scenario.line,
            });
        }
    }

    if scenarios.is_empty() {
        return Err(ParseError::Empty { path: path_str }.into());
    }

    let feature = feature.unwrap_or_else(|| {
        source_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    });

    Ok(ScenarioFile {
        path: source_path.to_path_buf(),
        header: FileHeader {
            name: Some(feature.clone()),
            tags: feature_tags,
            ..Default::default()
        },
        feature,
        background,
        scenarios,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::Keyword;

    const FEATURE: &str = r#"
# G2 requests
@web
Feature: Service requests
  Agents create requests from the left menu.

  Background:
    Given I am on page "/login"
    And I fill field "Email" with value "agent@example.com"

  @smoke
  Scenario: Create a request
    When I navigate to "Requests" in left menu
    Then I should see "New request"

  Scenario Outline: Pick a slot
    When I fill field for "Name" at position 1 with value "<name>"
    Then I should see "<name>"

    Examples:
      | name  |
      | Alice |
      | Bob   |
"#;

    #[test]
    fn test_parse_feature() {
        let file = parse_feature_content(FEATURE, Path::new("requests.feature")).unwrap();
        assert_eq!(file.feature, "Service requests");
        assert_eq!(file.background.len(), 2);
        assert_eq!(file.background[1].keyword, Some(Keyword::And));
        assert_eq!(file.scenarios.len(), 3);

        let first = &file.scenarios[0];
        assert_eq!(first.tags, vec!["@web", "@smoke"]);
        assert_eq!(first.steps[0].text, "I navigate to \"Requests\" in left menu");
        assert_eq!(first.line, 12);

        let bob = &file.scenarios[2];
        assert_eq!(bob.name, "Pick a slot (example 2)");
        assert_eq!(bob.tags, vec!["@web"]);
        assert_eq!(bob.steps[1].text, "I should see \"Bob\"");
    }

    #[test]
    fn test_each_examples_block_has_its_own_header() {
        let src = "Feature: x\nScenario Outline: dial\n  When I call \"<n>\"\n\n  Examples: first\n    | n |\n    | 1 |\n\n  Examples: second\n    | n |\n    | 2 |\n";
        let file = parse_feature_content(src, Path::new("x.feature")).unwrap();

        let steps: Vec<&str> = file.scenarios.iter().map(|s| s.steps[0].text.as_str()).collect();
        assert_eq!(steps, vec!["I call \"1\"", "I call \"2\""]);
        assert_eq!(file.scenarios[1].name, "dial (example 2)");
    }

    #[test]
    fn test_examples_block_without_rows_is_rejected() {
        let src = "Feature: x\nScenario Outline: dial\n  When I call \"<n>\"\n  Examples:\n";
        let err = parse_feature_content(src, Path::new("x.feature")).unwrap_err();
        assert!(err.to_string().contains("no rows"));
    }

    #[test]
    fn test_step_outside_scenario_is_rejected() {
        let err = parse_feature_content("Feature: x\nGiven I wait for 1 second\n", Path::new("x.feature"))
            .unwrap_err();
        assert!(err.to_string().contains("x.feature:2"));
    }

    #[test]
    fn test_data_tables_rejected() {
        let src = "Feature: x\nScenario: y\n  Given I report \"a\"\n  | a | b |\n";
        assert!(parse_feature_content(src, Path::new("x.feature")).is_err());
    }

    #[test]
    fn test_no_scenarios() {
        let err = parse_feature_content("Feature: empty\n", Path::new("e.feature")).unwrap_err();
        assert!(err.to_string().contains("no scenarios"));
    }
}
