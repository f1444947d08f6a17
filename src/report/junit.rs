use super::types::TestResults;
use crate::runner::state::{ScenarioReport, ScenarioStatus, StepStatus};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

fn seconds(ms: u64) -> String {
    (ms as f64 / 1000.0).to_string()
}

struct Counts {
    tests: usize,
    failures: usize,
    skipped: usize,
    duration_ms: u64,
}

fn count(scenarios: &[&ScenarioReport]) -> Counts {
    Counts {
        tests: scenarios.len(),
        failures: scenarios
            .iter()
            .filter(|s| s.status == ScenarioStatus::Failed)
            .count(),
        skipped: scenarios
            .iter()
            .filter(|s| s.status == ScenarioStatus::Skipped)
            .count(),
        duration_ms: scenarios
            .iter()
            .map(|s| s.total_duration_ms.unwrap_or(0))
            .sum(),
    }
}

fn push_counts(start: &mut BytesStart, counts: &Counts) {
    start.push_attribute(("tests", counts.tests.to_string().as_str()));
    start.push_attribute(("failures", counts.failures.to_string().as_str()));
    start.push_attribute(("skipped", counts.skipped.to_string().as_str()));
    start.push_attribute(("time", seconds(counts.duration_ms).as_str()));
}

/// JUnit XML with one testsuite per feature and one testcase per scenario
pub fn generate_junit_xml(results: &TestResults) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    // features in first-seen order
    let mut features: Vec<(&str, Vec<&ScenarioReport>)> = Vec::new();
    for scenario in &results.scenarios {
        match features.iter_mut().find(|(f, _)| *f == scenario.feature) {
            Some((_, list)) => list.push(scenario),
            None => features.push((scenario.feature.as_str(), vec![scenario])),
        }
    }

    let all: Vec<&ScenarioReport> = results.scenarios.iter().collect();
    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "g2-bdd-run"));
    push_counts(&mut suites_start, &count(&all));
    writer.write_event(Event::Start(suites_start))?;

    for (id, (feature, scenarios)) in features.iter().enumerate() {
        let mut suite_start = BytesStart::new("testsuite");
        suite_start.push_attribute(("name", *feature));
        suite_start.push_attribute(("id", id.to_string().as_str()));
        push_counts(&mut suite_start, &count(scenarios));
        suite_start.push_attribute(("timestamp", results.generated_at.as_str()));
        writer.write_event(Event::Start(suite_start))?;

        for scenario in scenarios {
            write_test_case(&mut writer, scenario)?;
        }

        writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(writer: &mut Writer<W>, scenario: &ScenarioReport) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    let classname = scenario.path.replace('/', ".");

    case_start.push_attribute(("name", scenario.name.as_str()));
    case_start.push_attribute(("classname", classname.as_str()));
    case_start.push_attribute(("time", seconds(scenario.total_duration_ms.unwrap_or(0)).as_str()));
    writer.write_event(Event::Start(case_start))?;

    match scenario.status {
        ScenarioStatus::Failed => {
            let message = scenario.error.as_deref().unwrap_or("Unknown error");
            let mut fail_start = BytesStart::new("failure");
            fail_start.push_attribute(("message", message));
            fail_start.push_attribute(("type", "StepFailure"));
            writer.write_event(Event::Start(fail_start))?;

            let failed_step = scenario
                .steps
                .iter()
                .find(|s| matches!(s.status, StepStatus::Failed { .. }));
            let body = match failed_step {
                Some(step) => format!("line {}: {}\n{}", step.line, step.text, message),
                None => message.to_string(),
            };
            writer.write_event(Event::Text(BytesText::new(&body)))?;
            writer.write_event(Event::End(BytesEnd::new("failure")))?;
        }
        ScenarioStatus::Skipped => {
            writer.write_event(Event::Empty(BytesStart::new("skipped")))?;
        }
        _ => {}
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write `junit.xml` into `output_dir`
pub fn write_report(results: &TestResults, output_dir: &Path) -> Result<()> {
    let xml = generate_junit_xml(results)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    println!("    Generated JUnit report: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::state::{StepReport, TestSummary};

    fn scenario(feature: &str, name: &str, status: ScenarioStatus, error: Option<&str>) -> ScenarioReport {
        ScenarioReport {
            name: name.to_string(),
            feature: feature.to_string(),
            path: "features/requests.feature".to_string(),
            tags: vec![],
            status,
            steps: vec![StepReport {
                index: 0,
                text: "Then I should see \"Saved\"".to_string(),
                line: 7,
                background: false,
                status: match error {
                    Some(e) => StepStatus::Failed { error: e.to_string() },
                    None => StepStatus::Passed,
                },
                duration_ms: Some(10),
            }],
            total_duration_ms: Some(1500),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_generate_junit_xml() {
        let results = TestResults {
            session_id: "test-session".to_string(),
            backend: "dry-run".to_string(),
            scenarios: vec![
                scenario("Requests", "Create", ScenarioStatus::Passed, None),
                scenario("Requests", "Edit", ScenarioStatus::Failed, Some("Element not found: \"Saved\"")),
                scenario("Calls", "Answer", ScenarioStatus::Skipped, None),
            ],
            summary: TestSummary::default(),
            generated_at: "2026-01-01 12:00:00".to_string(),
        };

        let xml = generate_junit_xml(&results).unwrap();

        assert!(xml.contains(r#"<testsuites name="g2-bdd-run" tests="3" failures="1" skipped="1""#));
        assert!(xml.contains(r#"<testsuite name="Requests" id="0" tests="2" failures="1""#));
        assert!(xml.contains(r#"<testsuite name="Calls" id="1" tests="1" failures="0" skipped="1""#));
        assert!(xml.contains(r#"<testcase name="Edit" classname="features.requests.feature""#));
        assert!(xml.contains(r#"message="Element not found: &quot;Saved&quot;""#));
        assert!(xml.contains("line 7:"));
        assert!(xml.contains("<skipped/>"));
    }
}
