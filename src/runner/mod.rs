pub mod context;
pub mod events;
pub mod executor;
pub mod state;

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::driver::android::{AndroidConfig, AndroidDriver};
use crate::driver::dry_run::DryRunDriver;
use crate::driver::switch::HelperSwitch;
use crate::driver::web::{BrowserType, WebDriver, WebDriverConfig};
use crate::driver::Actor;
use crate::report::types::TestResults;
use crate::steps::{default_registry, StepRegistry};
use crate::utils::config::Config;

pub use events::*;
pub use executor::{ExecutorOptions, ScenarioExecutor};
pub use state::*;

/// Backend a run drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    DryRun,
    Web,
    Android,
    /// Browser and handset together, switched by helper name
    Hybrid,
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_matches('"').trim_matches('\'').to_lowercase().as_str() {
            "dry-run" | "dryrun" | "dry_run" => Ok(Platform::DryRun),
            "web" => Ok(Platform::Web),
            "android" => Ok(Platform::Android),
            "hybrid" => Ok(Platform::Hybrid),
            other => anyhow::bail!(
                "Unknown platform: {} (expected dry-run, web, android or hybrid)",
                other
            ),
        }
    }
}

impl Platform {
    fn uses_device(&self) -> bool {
        matches!(self, Platform::Android | Platform::Hybrid)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub path: PathBuf,
    pub platform: Platform,
    /// Device serials; connected devices are used when empty
    pub devices: Vec<String>,
    pub output: PathBuf,
    pub parallel: bool,
    pub continue_on_failure: bool,
    pub report: bool,
    pub tags: Vec<String>,
}

fn web_config(config: &Config) -> Result<WebDriverConfig> {
    Ok(WebDriverConfig {
        browser_type: BrowserType::from_str(&config.web.browser)?,
        headless: config.web.headless,
        base_url: config.web.base_url.clone(),
        viewport_width: config.web.viewport_width,
        viewport_height: config.web.viewport_height,
        action_timeout_ms: config.action_timeout_ms,
    })
}

fn android_config(config: &Config) -> AndroidConfig {
    AndroidConfig {
        action_timeout_ms: config.action_timeout_ms,
        ..Default::default()
    }
}

/// Build the actor for one device
pub async fn build_actor(
    platform: Platform,
    device: Option<&str>,
    config: &Config,
) -> Result<Arc<dyn Actor>> {
    let serial = device.map(str::to_string);
    let actor: Arc<dyn Actor> = match platform {
        Platform::DryRun => Arc::new(DryRunDriver::new()),
        Platform::Web => Arc::new(WebDriver::new(web_config(config)?).await?),
        Platform::Android => Arc::new(AndroidDriver::new(serial, android_config(config))),
        Platform::Hybrid => {
            let web = WebDriver::new(web_config(config)?).await?;
            let android = AndroidDriver::new(serial, android_config(config));
            Arc::new(
                HelperSwitch::new()
                    .with_helper(&config.mobile.web_helper, Box::new(web))
                    .with_helper(&config.mobile.helper, Box::new(android)),
            )
        }
    };
    Ok(actor)
}

async fn resolve_devices(platform: Platform, devices: &[String]) -> Result<Vec<Option<String>>> {
    if !devices.is_empty() {
        return Ok(devices.iter().cloned().map(Some).collect());
    }
    if !platform.uses_device() {
        return Ok(vec![None]);
    }

    let connected: Vec<Option<String>> = crate::driver::android::adb::get_devices()
        .await?
        .into_iter()
        .filter(|d| d.is_ready())
        .map(|d| Some(d.serial))
        .collect();
    if connected.is_empty() {
        anyhow::bail!("No Android devices connected");
    }
    Ok(connected)
}

/// Run scenario files from a file or directory and collect the results
pub async fn run_tests(options: RunOptions, config: Config) -> Result<TestResults> {
    let config = Arc::new(config);
    let registry = Arc::new(default_registry()?);

    // 1. Resolve devices
    let devices = resolve_devices(options.platform, &options.devices).await?;

    // 2. Collect all scenario files
    let all_files = crate::parser::discover(&options.path);
    if all_files.is_empty() {
        println!("{} No scenario files found.", "ℹ".blue());
        return Ok(TestResults::merge(&Uuid::new_v4().to_string(), Vec::new()));
    }

    let (emitter, receiver) = EventEmitter::new();
    let listener = tokio::spawn(ConsoleEventListener::listen(receiver));

    // 3. Execution
    let sessions = if options.parallel && devices.len() > 1 {
        println!(
            "{} Parallel execution enabled across {} devices",
            "🚀".yellow(),
            devices.len()
        );

        let chunk_size = all_files.len().div_ceil(devices.len());
        let mut handles = Vec::new();

        for (device, files) in devices.iter().cloned().zip(all_files.chunks(chunk_size)) {
            let files = files.to_vec();
            let options = options.clone();
            let config = config.clone();
            let registry = registry.clone();
            let emitter = emitter.clone();

            handles.push(tokio::spawn(async move {
                run_on_device(&files, device, &options, config, registry, emitter).await
            }));
        }

        let mut sessions = Vec::new();
        let mut failures = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Ok(session)) => sessions.push(session),
                Ok(Err(e)) => {
                    eprintln!("{} Device run failed: {:#}", "✗".red(), e);
                    failures.push(e);
                }
                Err(e) => {
                    eprintln!("{} Device task panicked: {}", "✗".red(), e);
                    failures.push(e.into());
                }
            }
        }
        if sessions.is_empty() {
            if let Some(e) = failures.into_iter().next() {
                return Err(e);
            }
        }
        println!("{} All parallel test tasks finished.", "✅".green());
        sessions
    } else {
        let primary = devices.into_iter().next().flatten();
        vec![run_on_device(&all_files, primary, &options, config, registry, emitter.clone()).await?]
    };

    drop(emitter);
    listener.await.ok();

    Ok(TestResults::merge(&Uuid::new_v4().to_string(), sessions))
}

/// Run a set of files on a specific device
async fn run_on_device(
    files: &[PathBuf],
    device: Option<String>,
    options: &RunOptions,
    config: Arc<Config>,
    registry: Arc<StepRegistry>,
    emitter: EventEmitter,
) -> Result<SessionReport> {
    let actor = build_actor(options.platform, device.as_deref(), &config).await?;

    let mut executor = ScenarioExecutor::new(
        actor.clone(),
        registry,
        config,
        emitter,
        ExecutorOptions {
            output_dir: Some(options.output.clone()),
            device,
            tags: options.tags.clone(),
            continue_on_failure: options.continue_on_failure,
            report: options.report,
        },
    );

    executor.start();
    executor.run_files(files).await;

    let report = executor.finish().await;
    if let Err(e) = actor.close().await {
        log::warn!("Failed to close {} backend: {}", actor.backend_name(), e);
    }
    report
}

/// Print the step catalogue
pub fn print_catalogue() -> Result<()> {
    let registry = default_registry()?;
    println!("{} {} step definitions:", "ℹ".blue(), registry.len());
    for pattern in registry.catalogue() {
        println!("  {}", pattern);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse() {
        assert_eq!("dry-run".parse::<Platform>().unwrap(), Platform::DryRun);
        assert_eq!("\"web\"".parse::<Platform>().unwrap(), Platform::Web);
        assert_eq!("Hybrid".parse::<Platform>().unwrap(), Platform::Hybrid);
        assert!("ios".parse::<Platform>().is_err());
    }

    #[tokio::test]
    async fn test_dry_run_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.feature"),
            "Feature: A\nScenario: one\n  Given I am on page \"/\"\n  Then I should see \"Home\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("b.yaml"), "- I report \"hello\"\n").unwrap();

        let options = RunOptions {
            path: dir.path().to_path_buf(),
            platform: Platform::DryRun,
            devices: vec![],
            output: dir.path().join("out"),
            parallel: false,
            continue_on_failure: false,
            report: true,
            tags: vec![],
        };
        let results = run_tests(options, Config::default()).await.unwrap();

        assert_eq!(results.summary.total_scenarios, 2);
        assert_eq!(results.summary.passed_scenarios, 2);
        assert_eq!(results.backend, "dry-run");
        assert!(dir.path().join("out/junit.xml").exists());
    }

    #[tokio::test]
    async fn test_malformed_file_does_not_discard_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.yaml"), "- I report \"first\"\n").unwrap();
        std::fs::write(dir.path().join("b.feature"), "Feature: Empty\n").unwrap();
        std::fs::write(dir.path().join("c.yaml"), "- I report \"last\"\n").unwrap();

        let options = RunOptions {
            path: dir.path().to_path_buf(),
            platform: Platform::DryRun,
            devices: vec!["one".into(), "two".into()],
            output: dir.path().join("out"),
            parallel: true,
            continue_on_failure: true,
            report: true,
            tags: vec![],
        };
        let results = run_tests(options, Config::default()).await.unwrap();

        assert_eq!(results.summary.total_scenarios, 3);
        assert_eq!(results.summary.failed_scenarios, 1);
        assert_eq!(results.summary.passed_scenarios, 2);
    }

    #[tokio::test]
    async fn test_parallel_dry_run_splits_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a", "b", "c"] {
            std::fs::write(
                dir.path().join(format!("{}.yaml", name)),
                format!("- I report \"{}\"\n", name),
            )
            .unwrap();
        }

        let options = RunOptions {
            path: dir.path().to_path_buf(),
            platform: Platform::DryRun,
            devices: vec!["one".into(), "two".into()],
            output: dir.path().join("out"),
            parallel: true,
            continue_on_failure: true,
            report: true,
            tags: vec![],
        };
        let results = run_tests(options, Config::default()).await.unwrap();

        assert_eq!(results.summary.total_scenarios, 3);
        assert!(dir.path().join("out/one/test-results.json").exists());
        assert!(dir.path().join("out/two/test-results.json").exists());
    }
}
