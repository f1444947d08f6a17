use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Step execution status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Passed,
    Failed { error: String },
    Skipped { reason: String },
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Passed | StepStatus::Failed { .. } | StepStatus::Skipped { .. }
        )
    }
}

/// State for a single step execution
#[derive(Debug, Clone)]
pub struct StepState {
    pub index: usize,
    /// Step line as written, keyword included
    pub text: String,
    pub line: usize,
    pub background: bool,
    pub status: StepStatus,
    pub started_at: Option<Instant>,
    pub duration_ms: Option<u64>,
}

impl StepState {
    pub fn new(index: usize, text: &str, line: usize, background: bool) -> Self {
        Self {
            index,
            text: text.to_string(),
            line,
            background,
            status: StepStatus::Pending,
            started_at: None,
            duration_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn pass(&mut self) {
        self.finish(StepStatus::Passed);
    }

    pub fn fail(&mut self, error: String) {
        self.finish(StepStatus::Failed { error });
    }

    pub fn skip(&mut self, reason: String) {
        self.status = StepStatus::Skipped { reason };
    }

    fn finish(&mut self, status: StepStatus) {
        self.status = status;
        if let Some(start) = self.started_at {
            self.duration_ms = Some(start.elapsed().as_millis() as u64);
        }
    }

    pub fn to_report(&self) -> StepReport {
        StepReport {
            index: self.index,
            text: self.text.clone(),
            line: self.line,
            background: self.background,
            status: self.status.clone(),
            duration_ms: self.duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub index: usize,
    pub text: String,
    pub line: usize,
    #[serde(default)]
    pub background: bool,
    pub status: StepStatus,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScenarioStatus {
    Pending,
    Running,
    Passed,
    Failed,
    /// Filtered out by tags
    Skipped,
}

/// State for one scenario run (one per data row)
#[derive(Debug, Clone)]
pub struct ScenarioState {
    pub name: String,
    pub feature: String,
    pub path: String,
    pub tags: Vec<String>,
    pub status: ScenarioStatus,
    pub steps: Vec<StepState>,
    pub current_index: usize,
    pub started_at: Option<Instant>,
    pub total_duration_ms: Option<u64>,
    pub error: Option<String>,
}

impl ScenarioState {
    pub fn new(name: &str, feature: &str, path: &str, tags: Vec<String>, steps: Vec<StepState>) -> Self {
        Self {
            name: name.to_string(),
            feature: feature.to_string(),
            path: path.to_string(),
            tags,
            status: ScenarioStatus::Pending,
            steps,
            current_index: 0,
            started_at: None,
            total_duration_ms: None,
            error: None,
        }
    }

    pub fn start(&mut self) {
        self.status = ScenarioStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn current_step(&mut self) -> Option<&mut StepState> {
        self.steps.get_mut(self.current_index)
    }

    pub fn advance(&mut self) -> bool {
        self.current_index += 1;
        self.current_index < self.steps.len()
    }

    pub fn finish(&mut self) {
        if let Some(start) = self.started_at {
            self.total_duration_ms = Some(start.elapsed().as_millis() as u64);
        }

        let failed = self
            .steps
            .iter()
            .find_map(|s| match s.status {
                StepStatus::Failed { ref error } => Some(error.clone()),
                _ => None,
            });

        self.status = match failed {
            Some(error) => {
                self.error = Some(error);
                ScenarioStatus::Failed
            }
            None => ScenarioStatus::Passed,
        };
    }

    /// Mark every step after the current one as skipped
    pub fn skip_remaining(&mut self, reason: &str) {
        let from = (self.current_index + 1).min(self.steps.len());
        for step in &mut self.steps[from..] {
            if matches!(step.status, StepStatus::Pending) {
                step.skip(reason.to_string());
            }
        }
    }

    /// Mark the whole scenario as not run
    pub fn skip_all(&mut self, reason: &str) {
        for step in &mut self.steps {
            step.skip(reason.to_string());
        }
        self.status = ScenarioStatus::Skipped;
    }

    pub fn is_failed(&self) -> bool {
        self.status == ScenarioStatus::Failed
    }

    pub fn to_report(&self) -> ScenarioReport {
        ScenarioReport {
            name: self.name.clone(),
            feature: self.feature.clone(),
            path: self.path.clone(),
            tags: self.tags.clone(),
            status: self.status.clone(),
            steps: self.steps.iter().map(|s| s.to_report()).collect(),
            total_duration_ms: self.total_duration_ms,
            error: self.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub name: String,
    pub feature: String,
    pub path: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: ScenarioStatus,
    pub steps: Vec<StepReport>,
    pub total_duration_ms: Option<u64>,
    pub error: Option<String>,
}

/// Global test session state
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub backend: String,
    pub scenarios: Vec<ScenarioState>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl SessionState {
    pub fn new(session_id: &str, backend: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            backend: backend.to_string(),
            scenarios: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub fn add_scenario(&mut self, scenario: ScenarioState) {
        self.scenarios.push(scenario);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
    }

    pub fn has_failures(&self) -> bool {
        self.scenarios.iter().any(|s| s.is_failed())
    }

    pub fn summary(&self) -> TestSummary {
        let total_duration_ms = self.started_at.map(|start| {
            self.finished_at
                .unwrap_or_else(Instant::now)
                .duration_since(start)
                .as_millis() as u64
        });
        summarize(&self.session_id, &self.to_scenario_reports(), total_duration_ms)
    }

    fn to_scenario_reports(&self) -> Vec<ScenarioReport> {
        self.scenarios.iter().map(|s| s.to_report()).collect()
    }

    pub fn to_report(&self) -> SessionReport {
        SessionReport {
            session_id: self.session_id.clone(),
            backend: self.backend.clone(),
            scenarios: self.to_scenario_reports(),
            summary: self.summary(),
        }
    }
}

/// Count scenarios and steps of a finished run
pub fn summarize(session_id: &str, scenarios: &[ScenarioReport], total_duration_ms: Option<u64>) -> TestSummary {
    let mut summary = TestSummary {
        session_id: session_id.to_string(),
        total_scenarios: scenarios.len() as u32,
        total_duration_ms,
        ..Default::default()
    };

    for scenario in scenarios {
        match scenario.status {
            ScenarioStatus::Passed => summary.passed_scenarios += 1,
            ScenarioStatus::Failed => summary.failed_scenarios += 1,
            _ => {}
        }
        for step in &scenario.steps {
            summary.total_steps += 1;
            match step.status {
                StepStatus::Passed => summary.passed += 1,
                StepStatus::Failed { .. } => summary.failed += 1,
                StepStatus::Skipped { .. } => summary.skipped += 1,
                _ => {}
            }
        }
    }
    summary
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub session_id: String,
    pub total_scenarios: u32,
    pub passed_scenarios: u32,
    pub failed_scenarios: u32,
    pub total_steps: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub total_duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_id: String,
    #[serde(default)]
    pub backend: String,
    pub scenarios: Vec<ScenarioReport>,
    pub summary: TestSummary,
}
