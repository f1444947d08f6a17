use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use super::context::ScenarioContext;
use super::events::{EventEmitter, TestEvent};
use super::state::{ScenarioState, SessionReport, SessionState, StepState, StepStatus};
use crate::data::DataValue;
use crate::driver::Actor;
use crate::parser::parse_file;
use crate::parser::types::{Scenario, ScenarioFile, StepLine};
use crate::report::types::TestResults;
use crate::steps::{StepRegistry, World};
use crate::utils::config::Config;

/// Options shared by every file an executor runs
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    pub output_dir: Option<PathBuf>,
    pub device: Option<String>,
    /// Only scenarios carrying one of these tags run
    pub tags: Vec<String>,
    /// Keep running scenarios after one fails
    pub continue_on_failure: bool,
    pub report: bool,
}

pub struct ScenarioExecutor {
    actor: Arc<dyn Actor>,
    registry: Arc<StepRegistry>,
    config: Arc<Config>,
    session: SessionState,
    emitter: EventEmitter,
    options: ExecutorOptions,
    /// Set once a scenario fails without `continue_on_failure`
    halted: bool,
}

impl ScenarioExecutor {
    pub fn new(
        actor: Arc<dyn Actor>,
        registry: Arc<StepRegistry>,
        config: Arc<Config>,
        emitter: EventEmitter,
        options: ExecutorOptions,
    ) -> Self {
        let session = SessionState::new(&Uuid::new_v4().to_string(), actor.backend_name());
        Self {
            actor,
            registry,
            config,
            session,
            emitter,
            options,
            halted: false,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn start(&mut self) {
        self.session.start();
        self.emitter.emit(TestEvent::SessionStarted {
            session_id: self.session.session_id.clone(),
            backend: self.session.backend.clone(),
        });
    }

    /// Parse and run one scenario file
    pub async fn run_file(&mut self, path: &Path) -> Result<()> {
        let file = parse_file(path)?;
        self.run_parsed(&file).await
    }

    pub async fn run_parsed(&mut self, file: &ScenarioFile) -> Result<()> {
        let base_dir = file
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut file_ctx = ScenarioContext::new(
            self.config.clone(),
            &base_dir,
            self.options.output_dir.as_deref(),
            self.options.device.clone(),
        );
        file_ctx.update_from_header(&file.header);

        let iterations = match file.header.data {
            Some(ref data_file) => {
                let rows = load_data_rows(&file_ctx.resolve_path(data_file))?;
                self.emitter.emit(TestEvent::Log {
                    message: format!("{} Loaded {} data rows from {}", "ℹ".blue(), rows.len(), data_file),
                });
                rows
            }
            None => vec![HashMap::new()],
        };

        for (iter_idx, row) in iterations.iter().enumerate() {
            let mut row_ctx = file_ctx.clone();
            row_ctx.seed(row.iter().map(|(k, v)| (k.clone(), DataValue::from(v.as_str()))));

            for scenario in &file.scenarios {
                let name = if iterations.len() > 1 {
                    format!("{} [{}]", scenario.name, iter_idx + 1)
                } else {
                    scenario.name.clone()
                };
                let ctx = row_ctx.for_scenario(&name);
                self.run_scenario(file, scenario, &name, ctx).await;
            }
        }

        Ok(())
    }

    /// Run several files in order. A file that cannot be parsed or whose
    /// data rows cannot be loaded is recorded as a failed scenario and the
    /// run moves on to the next file.
    pub async fn run_files(&mut self, files: &[PathBuf]) {
        for file in files {
            if let Err(e) = self.run_file(file).await {
                self.record_file_error(file, &e);
            }
        }
    }

    fn record_file_error(&mut self, path: &Path, error: &anyhow::Error) {
        let message = format!("{:#}", error);
        log::error!("Could not load {}: {}", path.display(), message);

        let display = path.display().to_string();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| display.clone());
        let feature = path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| display.clone());

        let mut step = StepState::new(0, &format!("load {}", display), 0, false);
        step.start();
        step.fail(message);
        let mut state = ScenarioState::new(&name, &feature, &display, Vec::new(), vec![step]);
        state.start();
        state.finish();

        if !self.options.continue_on_failure {
            self.halted = true;
        }
        self.emitter.emit(TestEvent::ScenarioFinished {
            name,
            status: state.status.clone(),
            duration_ms: state.total_duration_ms,
        });
        self.session.add_scenario(state);
    }

    fn plan(file: &ScenarioFile, scenario: &Scenario) -> Vec<(StepLine, bool)> {
        file.background
            .iter()
            .map(|s| (s.clone(), true))
            .chain(scenario.steps.iter().map(|s| (s.clone(), false)))
            .collect()
    }

    async fn run_scenario(
        &mut self,
        file: &ScenarioFile,
        scenario: &Scenario,
        name: &str,
        ctx: ScenarioContext,
    ) {
        let plan = Self::plan(file, scenario);
        let step_states = plan
            .iter()
            .enumerate()
            .map(|(i, (step, background))| StepState::new(i, &step.to_string(), step.line, *background))
            .collect();
        let mut state = ScenarioState::new(
            name,
            &file.feature,
            &file.path.display().to_string(),
            scenario.tags.clone(),
            step_states,
        );

        let skip_reason = if !scenario.matches_tags(&self.options.tags) {
            Some("tag filter")
        } else if self.halted {
            Some("run stopped after a failed scenario")
        } else {
            None
        };
        if let Some(reason) = skip_reason {
            log::debug!("Skipping scenario '{}': {}", name, reason);
            state.skip_all(reason);
            self.emitter.emit(TestEvent::ScenarioFinished {
                name: name.to_string(),
                status: state.status.clone(),
                duration_ms: None,
            });
            self.session.add_scenario(state);
            return;
        }

        self.emitter.emit(TestEvent::ScenarioStarted {
            feature: file.feature.clone(),
            name: name.to_string(),
            step_count: plan.len(),
        });
        state.start();

        let mut world = World::new(self.actor.clone(), ctx);

        for (i, (step, _)) in plan.iter().enumerate() {
            state.current_index = i;
            let Some(step_state) = state.current_step() else {
                break;
            };
            step_state.start();
            self.emitter.emit(TestEvent::StepStarted {
                index: i,
                text: step_state.text.clone(),
            });

            match self.registry.dispatch(&step.text, &mut world).await {
                Ok(()) => {
                    step_state.pass();
                    self.emitter.emit(TestEvent::StepPassed {
                        index: i,
                        duration_ms: step_state.duration_ms.unwrap_or(0),
                    });
                }
                Err(e) => {
                    let error_msg = format!("{:#}", e);
                    log::debug!("Step {} of '{}' failed: {}", i + 1, name, error_msg);
                    step_state.fail(error_msg.clone());
                    self.emitter.emit(TestEvent::StepFailed {
                        index: i,
                        error: error_msg,
                        duration_ms: step_state.duration_ms.unwrap_or(0),
                    });

                    state.skip_remaining("previous step failed");
                    for skipped in &state.steps[i + 1..] {
                        if let StepStatus::Skipped { ref reason } = skipped.status {
                            self.emitter.emit(TestEvent::StepSkipped {
                                index: skipped.index,
                                text: skipped.text.clone(),
                                reason: reason.clone(),
                            });
                        }
                    }
                    break;
                }
            }
        }

        state.finish();
        if state.is_failed() && !self.options.continue_on_failure {
            self.halted = true;
        }

        self.emitter.emit(TestEvent::ScenarioFinished {
            name: name.to_string(),
            status: state.status.clone(),
            duration_ms: state.total_duration_ms,
        });
        self.session.add_scenario(state);
    }

    /// Finish the session; writes `test-results.json` and `junit.xml` when
    /// reporting is on
    pub async fn finish(&mut self) -> Result<SessionReport> {
        self.session.finish();
        let report = self.session.to_report();

        self.emitter.emit(TestEvent::SessionFinished {
            summary: report.summary.clone(),
        });

        if self.options.report {
            let output_dir = self.output_dir();
            std::fs::create_dir_all(&output_dir).with_context(|| {
                format!("Failed to create output directory {}", output_dir.display())
            })?;

            let results = TestResults::from_session(report.clone());
            let report_path = output_dir.join("test-results.json");
            crate::report::json::generate(&results, Some(&report_path))?;
            crate::report::junit::write_report(&results, &output_dir)?;
        }

        Ok(report)
    }

    fn output_dir(&self) -> PathBuf {
        let mut dir = self
            .options
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("output"));
        if let Some(ref device) = self.options.device {
            dir.push(device.replace(':', "_"));
        }
        dir
    }
}

/// Rows of a CSV data file, keyed by header
pub fn load_data_rows(path: &Path) -> Result<Vec<HashMap<String, String>>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open data file {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: HashMap<String, String> = result.context("Failed to parse CSV record")?;
        rows.push(record);
    }
    if rows.is_empty() {
        anyhow::bail!("Data file {} has no rows", path.display());
    }
    Ok(rows)
}
