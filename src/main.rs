use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use g2_bdd_tester::steps::slot::{format_slot, SlotWindow};
use g2_bdd_tester::utils::config::parse_hhmm;
use g2_bdd_tester::{driver, next_available_slot, report, runner, Config, Platform, RunOptions};

#[derive(Parser)]
#[command(name = "g2-bdd")]
#[command(version = "0.1.0")]
#[command(about = "BDD step runner for G2 web and mobile scenarios", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenario file(s) or directory
    Run {
        /// Path to a .feature/.yaml file or a directory
        path: PathBuf,

        /// Target platform (dry-run, web, android, hybrid)
        #[arg(short, long, default_value = "web")]
        platform: String,

        /// Device serial(s). Can be specified multiple times.
        #[arg(short, long)]
        device: Vec<String>,

        /// Run files in parallel across multiple devices
        #[arg(long, default_value = "false")]
        parallel: bool,

        /// Output directory for reports
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Keep running scenarios after one fails
        #[arg(long, default_value = "false")]
        continue_on_failure: bool,

        /// Write test-results.json and junit.xml
        #[arg(long, default_value = "false")]
        report: bool,

        /// Filter scenarios by tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the registered step phrases
    Steps,

    /// Print the next available booking slot
    Slot {
        /// Reference time (HH:MM), defaults to now
        #[arg(long)]
        at: Option<String>,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Generate report from test results
    Report {
        /// Path to test-results.json
        results: PathBuf,

        /// Output format (json, junit)
        #[arg(short, long, default_value = "junit")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List connected devices
    Devices {
        /// Target platform
        #[arg(short, long, default_value = "android")]
        platform: String,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(p) => Config::load(p)?,
        None => Config::default(),
    }
    .with_env_overrides();
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            path,
            platform,
            device,
            parallel,
            output,
            continue_on_failure,
            report,
            tags,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let platform: Platform = platform.parse()?;

            println!(
                "{} Running scenarios from: {}",
                "▶".green().bold(),
                path.display()
            );
            println!("  Platform: {}", format!("{:?}", platform).cyan());
            if !device.is_empty() {
                println!("  Devices: {}", device.join(", ").cyan());
            }
            if parallel {
                println!("  Parallel: {}", "Enabled".yellow());
            }
            if let Some(ref tags_list) = tags {
                println!("  Tags: {}", tags_list.join(", ").yellow());
            }
            println!("  Output: {}", output.display().to_string().cyan());
            if report {
                println!("  Reports: {}", "Enabled".green());
            }

            let options = RunOptions {
                path,
                platform,
                devices: device,
                output,
                parallel,
                continue_on_failure: continue_on_failure || config.continue_on_failure,
                report,
                tags: tags.unwrap_or_default(),
            };

            let results = runner::run_tests(options, config).await?;
            if results.summary.failed_scenarios > 0 {
                std::process::exit(1);
            }
        }

        Commands::Steps => {
            runner::print_catalogue()?;
        }

        Commands::Slot { at, config } => {
            let config = load_config(config.as_deref())?;
            let window = SlotWindow::from_settings(&config.slots)?;
            let now = match at {
                Some(value) => parse_hhmm(&value)?,
                None => chrono::Local::now().time(),
            };

            match next_available_slot(now, &window) {
                Ok(slot) => println!("{}", format_slot(slot)),
                Err(e) => {
                    eprintln!("{} {}", "✗".red(), e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref())?;
        }

        Commands::Devices { platform } => {
            println!(
                "{} Listing {} devices...",
                "🔍".to_string().blue(),
                platform.cyan()
            );
            driver::list_devices(&platform).await?;
        }
    }

    Ok(())
}
