//! Output formatting and styling module.
//!
//! Every line the CLI prints goes through [`OutputFormatter`], so styling can
//! change in one place. Diagnostics go through `tracing` instead.

use crate::monitor::ResourceSample;
use crate::organizer::{FailureKind, OrganizeReport, SkipReason};
use crate::weather::WeatherReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

/// Width of the load bars drawn by the resource monitor.
const LOAD_BAR_WIDTH: usize = 40;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for a pass over `total` files.
    ///
    /// ```no_run
    /// use nexus_toolkit::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints every file outcome of an organize pass.
    pub fn organize_details(report: &OrganizeReport) {
        let verb = if report.dry_run { "Would move" } else { "Moved" };
        for moved in &report.moved {
            let destination = moved
                .destination
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Self::success(&format!(
                "{} {} → {}/{}",
                verb, moved.file_name, moved.category, destination
            ));
        }

        for skipped in report.skipped_with(SkipReason::Collision) {
            Self::warning(&format!(
                "Skipped {}: destination already exists",
                skipped.file_name
            ));
        }
        for skipped in report.skipped_with(SkipReason::Vanished) {
            Self::warning(&format!(
                "Skipped {}: file disappeared during the scan",
                skipped.file_name
            ));
        }

        for failed in &report.failed {
            let label = match failed.kind {
                FailureKind::Collision => "name collision",
                FailureKind::CreateDir => "cannot create folder",
                FailureKind::Move => "move failed",
            };
            Self::error(&format!(
                "{} ({}): {}",
                failed.file_name, label, failed.message
            ));
        }
    }

    /// Prints a summary table with file statistics by category.
    ///
    /// ```no_run
    /// use nexus_toolkit::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("Docs".to_string(), 15);
    /// counts.insert("Images".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(category_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let max_category_len = category_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 10));

        for (category, count) in category_counts {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural_files(*count),
                width = max_category_len
            );
        }

        println!("{}", "-".repeat(max_category_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural_files(total_files),
            width = max_category_len
        );
    }

    /// Prints one resource sample as two load bars.
    pub fn resource_sample(sample: &ResourceSample) {
        println!(
            "{}",
            sample.taken_at.format("%Y-%m-%d | %H:%M:%S").to_string().dimmed()
        );
        println!("{}", load_line("CPU Load", sample.cpu_percent));
        println!("{}", load_line("RAM Load", sample.ram_percent));
    }

    /// Prints a weather report, one field per line.
    pub fn weather_report(report: &WeatherReport) {
        println!("📍 Location: {}", report.location.bold());
        println!();
        println!("☁️ Condition: {}", report.condition);
        println!("🌡️ Temp: {}", report.temperature);
        println!("💧 Humidity: {}", report.humidity);
        println!("🌬️ Wind: {}", report.wind);
        println!("🧥 Feels Like: {}", report.feels_like);
    }
}

fn plural_files(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

/// Renders `CPU Load: 42.0% [████░░░]`, coloured by severity.
fn load_line(label: &str, percent: f32) -> String {
    let bar = render_bar(percent, LOAD_BAR_WIDTH);
    let bar = if percent >= 90.0 {
        bar.red()
    } else if percent >= 70.0 {
        bar.yellow()
    } else {
        bar.green()
    };
    format!("{}: {:>5.1}% [{}]", label, percent, bar)
}

fn render_bar(percent: f32, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f32).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
