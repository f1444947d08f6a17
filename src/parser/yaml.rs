use super::types::{FileHeader, Scenario, ScenarioFile, StepLine};
use crate::error::ParseError;
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::path::Path;

/// Parse a YAML scenario file
pub fn parse_test_file(path: &Path) -> Result<ScenarioFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    parse_yaml_content(&content, path)
}

/// Parse YAML content into a scenario file.
///
/// Two layouts are accepted: a header mapping, a `---` line and the step
/// list, or the step list alone. List items are either step strings, which
/// form one scenario named after the header or file, or mappings with
/// `scenario`, optional `tags` and `steps`.
pub fn parse_yaml_content(content: &str, source_path: &Path) -> Result<ScenarioFile> {
    let (header_yaml, steps_yaml) = split_header(content);

    let header: FileHeader = match header_yaml {
        Some(h) if !h.trim().is_empty() => serde_yaml::from_str(h)
            .with_context(|| format!("Invalid header in {}", source_path.display()))?,
        _ => FileHeader::default(),
    };

    let default_name = header.name.clone().unwrap_or_else(|| {
        source_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "scenario".to_string())
    });

    let items: Vec<Value> = serde_yaml::from_str(steps_yaml)
        .with_context(|| format!("Step list in {} is not a YAML list", source_path.display()))?;

    let mut loose = Vec::new();
    let mut scenarios = Vec::new();

    for (i, item) in items.iter().enumerate() {
        match item {
            Value::String(s) => loose.push(StepLine::parse(s, i + 1)),
            Value::Mapping(_) => scenarios.push(parse_scenario_item(item, i + 1, source_path)?),
            other => {
                return Err(ParseError::Syntax {
                    path: source_path.display().to_string(),
                    line: i + 1,
                    message: format!("expected a step string or scenario mapping, got {:?}", other),
                }
                .into())
            }
        }
    }

    if !loose.is_empty() {
        scenarios.insert(
            0,
            Scenario {
                name: default_name.clone(),
                tags: header.tags.clone(),
                steps: loose,
                line: 1,
            },
        );
    }

    if scenarios.is_empty() {
        return Err(ParseError::Empty {
            path: source_path.display().to_string(),
        }
        .into());
    }

    Ok(ScenarioFile {
        path: source_path.to_path_buf(),
        feature: default_name,
        header,
        background: Vec::new(),
        scenarios,
    })
}

/// Header is everything above the first line that is exactly `---`
fn split_header(content: &str) -> (Option<&str>, &str) {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return (Some(&content[..offset]), &content[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, content)
}

fn parse_scenario_item(item: &Value, index: usize, source_path: &Path) -> Result<Scenario> {
    let syntax = |message: String| ParseError::Syntax {
        path: source_path.display().to_string(),
        line: index,
        message,
    };

    let name = item
        .get("scenario")
        .and_then(Value::as_str)
        .ok_or_else(|| syntax("scenario mapping needs a `scenario` name".to_string()))?;

    let tags = match item.get("tags") {
        Some(Value::Sequence(seq)) => seq
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s.split(',').map(|t| t.trim().to_string()).collect(),
        _ => Vec::new(),
    };

    let steps = item
        .get("steps")
        .and_then(Value::as_sequence)
        .ok_or_else(|| syntax(format!("scenario '{}' has no `steps` list", name)))?
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str()
                .map(|s| StepLine::parse(s, i + 1))
                .ok_or_else(|| syntax(format!("step {} of '{}' is not a string", i + 1, name)))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Scenario {
        name: name.to_string(),
        tags,
        steps,
        line: index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::Keyword;

    #[test]
    fn test_parse_header_and_steps() {
        let yaml = r#"
name: Login
tags: [smoke]
url: https://g2.example.com
env:
  USER: admin
---
- Given I am on page "/login"
- I fill field "Email" with value "${USER}"
- Then I should see "Dashboard"
"#;
        let file = parse_yaml_content(yaml, Path::new("login.yaml")).unwrap();
        assert_eq!(file.feature, "Login");
        assert_eq!(file.header.url.as_deref(), Some("https://g2.example.com"));
        assert_eq!(file.header.env.get("USER").map(String::as_str), Some("admin"));
        assert_eq!(file.scenarios.len(), 1);

        let scenario = &file.scenarios[0];
        assert_eq!(scenario.tags, vec!["smoke"]);
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(scenario.steps[0].keyword, Some(Keyword::Given));
        assert_eq!(scenario.steps[1].keyword, None);
        assert_eq!(scenario.steps[2].text, "I should see \"Dashboard\"");
    }

    #[test]
    fn test_list_only_uses_file_stem() {
        let file = parse_yaml_content("- I wait for 1 second\n", Path::new("flows/quick.yml")).unwrap();
        assert_eq!(file.feature, "quick");
        assert_eq!(file.header, FileHeader::default());
    }

    #[test]
    fn test_named_scenarios() {
        let yaml = r#"
- scenario: Answer
  tags: "@mobile, @calls"
  steps:
    - I pick up the incoming call
- scenario: Decline
  steps:
    - I reject the incoming call
"#;
        let file = parse_yaml_content(yaml, Path::new("calls.yaml")).unwrap();
        assert_eq!(file.scenarios.len(), 2);
        assert_eq!(file.scenarios[0].tags, vec!["@mobile", "@calls"]);
        assert_eq!(file.scenarios[1].name, "Decline");
    }

    #[test]
    fn test_dashes_inside_values_are_not_separators() {
        let yaml = "- I fill field \"Note\" with value \"a---b\"\n";
        let file = parse_yaml_content(yaml, Path::new("n.yaml")).unwrap();
        assert!(file.scenarios[0].steps[0].text.contains("a---b"));
    }

    #[test]
    fn test_empty_list_is_an_error() {
        let err = parse_yaml_content("name: x\n---\n[]\n", Path::new("e.yaml")).unwrap_err();
        assert!(err.to_string().contains("no scenarios"));
    }
}
