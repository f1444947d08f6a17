use super::state::{ScenarioStatus, TestSummary};
use tokio::sync::broadcast;

/// Execution events for real-time console output
#[derive(Debug, Clone)]
pub enum TestEvent {
    // Session events
    SessionStarted {
        session_id: String,
        backend: String,
    },
    SessionFinished {
        summary: TestSummary,
    },

    // Scenario events
    ScenarioStarted {
        feature: String,
        name: String,
        step_count: usize,
    },
    ScenarioFinished {
        name: String,
        status: ScenarioStatus,
        duration_ms: Option<u64>,
    },

    // Step events
    StepStarted {
        index: usize,
        text: String,
    },
    StepPassed {
        index: usize,
        duration_ms: u64,
    },
    StepFailed {
        index: usize,
        error: String,
        duration_ms: u64,
    },
    StepSkipped {
        index: usize,
        text: String,
        reason: String,
    },

    // `I report "..."` and other coordinated output
    Log {
        message: String,
    },
}

/// Event emitter for broadcasting test events
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<TestEvent>) {
        let (sender, receiver) = broadcast::channel(256);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

impl Clone for EventEmitter {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        use colored::Colorize;
        use std::io::IsTerminal;

        let interactive = std::io::stdout().is_terminal();
        let mut spinner: Option<ProgressBar> = None;
        let mut step_text = String::new();

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("Console output skipped {} events", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                TestEvent::SessionStarted { session_id, backend } => {
                    println!(
                        "\n{} Test session started: {} ({})",
                        "▶".green().bold(),
                        session_id.cyan(),
                        backend
                    );
                }

                TestEvent::SessionFinished { summary } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("\n{} Test session finished", "■".blue().bold());
                    println!(
                        "  Scenarios: {} ({} passed, {} failed)",
                        summary.total_scenarios,
                        summary.passed_scenarios.to_string().green(),
                        summary.failed_scenarios.to_string().red()
                    );
                    println!(
                        "  Steps: {} passed, {} failed, {} skipped",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.skipped.to_string().yellow()
                    );
                    if let Some(duration) = summary.total_duration_ms {
                        println!("  Duration: {}ms", duration);
                    }
                }

                TestEvent::ScenarioStarted {
                    feature,
                    name,
                    step_count,
                } => {
                    println!(
                        "\n  {} {}: {} ({} steps)",
                        "→".blue(),
                        feature.dimmed(),
                        name.white().bold(),
                        step_count
                    );
                }

                TestEvent::ScenarioFinished {
                    name,
                    status,
                    duration_ms,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    let status_str = match status {
                        ScenarioStatus::Passed => "PASSED".green().bold(),
                        ScenarioStatus::Failed => "FAILED".red().bold(),
                        ScenarioStatus::Skipped => "SKIPPED".yellow().bold(),
                        _ => "UNKNOWN".white().bold(),
                    };
                    match duration_ms {
                        Some(ms) => println!("  {} {} [{}] {}ms", "←".blue(), name, status_str, ms),
                        None => println!("  {} {} [{}]", "←".blue(), name, status_str),
                    }
                }

                TestEvent::StepStarted { index, text } => {
                    step_text = format!("[{}] {} ", index + 1, text.dimmed());
                    if interactive {
                        let pb = ProgressBar::new_spinner();
                        pb.set_draw_target(ProgressDrawTarget::stdout());
                        let style = ProgressStyle::default_spinner()
                            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                            .template("    {spinner} {msg}")
                            .unwrap_or_else(|_| ProgressStyle::default_spinner());
                        pb.set_style(style);
                        pb.set_message(step_text.clone());
                        pb.enable_steady_tick(StdDuration::from_millis(100));
                        spinner = Some(pb);
                    }
                }

                TestEvent::StepPassed { duration_ms, .. } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("    {} {}({}ms)", "✓".green(), step_text, duration_ms);
                }

                TestEvent::StepFailed {
                    error, duration_ms, ..
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("    {} {}({}ms)", "✗".red(), step_text, duration_ms);
                    println!("      {}", error.red());
                }

                TestEvent::StepSkipped {
                    index, text, reason, ..
                } => {
                    println!(
                        "    {} [{}] {} ({})",
                        "○".yellow(),
                        index + 1,
                        text.dimmed(),
                        reason.dimmed()
                    );
                }

                TestEvent::Log { message } => match spinner {
                    Some(ref pb) => pb.println(format!("      {}", message)),
                    None => println!("      {}", message),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emitter_broadcasts_to_subscribers() {
        let (emitter, mut first) = EventEmitter::new();
        let mut second = emitter.subscribe();

        emitter.emit(TestEvent::Log {
            message: "hello".into(),
        });

        for rx in [&mut first, &mut second] {
            match rx.recv().await.unwrap() {
                TestEvent::Log { message } => assert_eq!(message, "hello"),
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_emit_without_listeners_is_silent() {
        let emitter = EventEmitter::default();
        emitter.emit(TestEvent::StepStarted {
            index: 0,
            text: "I wait for 1 second".into(),
        });
    }
}
