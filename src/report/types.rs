use crate::runner::state::{summarize, ScenarioReport, SessionReport, TestSummary};
use serde::{Deserialize, Serialize};

/// Test results for report generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    pub session_id: String,
    #[serde(default)]
    pub backend: String,
    pub scenarios: Vec<ScenarioReport>,
    pub summary: TestSummary,
    pub generated_at: String,
}

impl TestResults {
    pub fn from_session(report: SessionReport) -> Self {
        Self {
            session_id: report.session_id,
            backend: report.backend,
            scenarios: report.scenarios,
            summary: report.summary,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Combine the sessions of a multi-device run
    pub fn merge(session_id: &str, sessions: Vec<SessionReport>) -> Self {
        let backend = sessions
            .first()
            .map(|s| s.backend.clone())
            .unwrap_or_default();
        let duration = sessions
            .iter()
            .filter_map(|s| s.summary.total_duration_ms)
            .max();
        let scenarios: Vec<ScenarioReport> =
            sessions.into_iter().flat_map(|s| s.scenarios).collect();

        Self {
            session_id: session_id.to_string(),
            backend,
            summary: summarize(session_id, &scenarios, duration),
            scenarios,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
