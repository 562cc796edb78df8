//! Command-line interface for the Nexus toolkit.
//!
//! Three subcommands, one per tool:
//! - `organize`: sort a directory's files into category folders
//! - `monitor`: print CPU and RAM load on an interval
//! - `weather`: fetch a one-line weather report for a city

use crate::config::JanitorConfig;
use crate::monitor::{DEFAULT_INTERVAL_MS, ResourceSampler};
use crate::organizer::{CollisionPolicy, OrganizeReport, Organizer, SkipReason};
use crate::output::OutputFormatter;
use crate::weather::{DEFAULT_BASE_URL, WeatherClient};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "nexus", version, about = "Nexus system toolkit")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Move the files of a directory into category folders by extension
    Organize(OrganizeArgs),
    /// Show live CPU and RAM load
    Monitor(MonitorArgs),
    /// Fetch the current weather for a city
    Weather(WeatherArgs),
}

#[derive(Debug, Clone, Args)]
pub struct OrganizeArgs {
    /// Directory whose files should be organized
    pub dir: PathBuf,

    /// Configuration file (defaults to .nexusrc.toml, then ~/.config/nexus/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// What to do when the destination name is taken (overrides the config file)
    #[arg(long, value_enum)]
    pub on_collision: Option<CollisionPolicy>,

    /// Show what would be moved without touching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct MonitorArgs {
    /// Milliseconds between samples
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval: u64,

    /// Stop after this many samples (default: run until interrupted)
    #[arg(short = 'n', long)]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct WeatherArgs {
    /// City name; several words are joined with spaces
    #[arg(required = true, num_args = 1..)]
    pub city: Vec<String>,

    /// Weather service base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,
}

/// Runs the parsed command line. The exit code is a failure if any file
/// could not be organized.
pub fn run_cli(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Organize(args) => {
            let report = organize_directory(&args)?;
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Monitor(args) => {
            run_monitor(&args);
            Ok(ExitCode::SUCCESS)
        }
        Command::Weather(args) => {
            run_weather(&args)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Loads configuration, organizes `args.dir` and prints the outcome.
///
/// # Errors
///
/// Fails if the configuration cannot be loaded or compiled, or if the
/// directory is not a valid scan root. Per-file failures are part of the
/// returned report.
pub fn organize_directory(args: &OrganizeArgs) -> anyhow::Result<OrganizeReport> {
    let config = JanitorConfig::load(args.config.as_deref())
        .context("Error loading configuration")?;
    let table = config
        .category_table()
        .context("Error building category table")?;
    let filters = config
        .compile_filters()
        .context("Error compiling filters")?;
    let policy = args.on_collision.unwrap_or(config.on_collision);

    let organizer = Organizer::new(table)
        .filters(filters)
        .collision_policy(policy)
        .dry_run(args.dry_run);

    if args.json {
        let report = organizer.organize(&args.dir)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report);
    }

    if args.dry_run {
        OutputFormatter::dry_run_notice(&format!("Analyzing {}", args.dir.display()));
    } else {
        OutputFormatter::info(&format!("Organizing contents of: {}", args.dir.display()));
    }

    let files = organizer.scan(&args.dir)?;
    let pb = OutputFormatter::create_progress_bar(files.len() as u64);
    let progress = pb.clone();
    let organizer = organizer.on_progress(move |name| {
        progress.set_message(name.to_string());
        progress.inc(1);
    });

    let report = organizer.organize_files(&args.dir, &files);
    pb.finish_and_clear();

    OutputFormatter::organize_details(&report);
    OutputFormatter::summary_table(&report.category_counts(), report.moved_count());

    let unmatched = report.skipped_with(SkipReason::Unmatched).count();
    if unmatched > 0 {
        OutputFormatter::plain(&format!(
            "{} file(s) left in place (no matching category)",
            unmatched
        ));
    }

    if report.dry_run {
        OutputFormatter::dry_run_notice(&format!(
            "Would clean {} files. Nothing was modified.",
            report.moved_count()
        ));
    } else {
        OutputFormatter::success(&format!("Cleaned {} files!", report.moved_count()));
    }

    if !report.is_success() {
        OutputFormatter::warning(&format!(
            "{} file(s) could not be organized. Please review the errors above.",
            report.failed.len()
        ));
    }

    Ok(report)
}

/// Prints load samples until `args.count` is reached.
pub fn run_monitor(args: &MonitorArgs) {
    OutputFormatter::header("Hardware Diagnostics");
    let mut sampler = ResourceSampler::new();
    sampler.run(Duration::from_millis(args.interval), args.count, |sample| {
        OutputFormatter::resource_sample(sample);
        true
    });
}

/// Fetches and prints the weather for `args.city`.
pub fn run_weather(args: &WeatherArgs) -> anyhow::Result<()> {
    let city = args.city.join(" ");
    let client = WeatherClient::with_base_url(&args.base_url, Duration::from_secs(args.timeout))?;

    OutputFormatter::info(&format!("Fetching {} data...", city));
    let report = client.fetch(&city)?;
    OutputFormatter::weather_report(&report);
    Ok(())
}
