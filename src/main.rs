use clap::Parser;
use nexus_toolkit::cli::{Cli, run_cli};
use nexus_toolkit::output::OutputFormatter;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run_cli(cli) {
        Ok(code) => code,
        Err(e) => {
            OutputFormatter::error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
/// `RUST_LOG` wins over `-v` when set.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
