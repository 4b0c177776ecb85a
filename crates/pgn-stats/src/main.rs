use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use pgn_stats::report::Report;
use pgn_stats::{run, Cli};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let report = match run(&cli) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    match print_report(&report, cli.json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(3)
        }
    }
}

fn print_report(report: &Report, json: bool) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        report.write_json(&mut out).context("Failed to write JSON report")?;
    } else {
        report.write_text(&mut out).context("Failed to write report")?;
    }
    out.flush().context("Failed to flush report")?;
    Ok(())
}
