//! Replay tool entry point.

use clap::Parser;
use fieldcanvas_replay::{ReplayScript, replay};
use std::path::PathBuf;
use std::process::ExitCode;

/// Replay a scripted drag gesture and print the resulting scene as JSON.
#[derive(Debug, Parser)]
#[command(name = "fieldcanvas-replay", version, about)]
struct Cli {
    /// Path to the JSON replay script.
    script: PathBuf,
    /// Pretty-print the report.
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    log::info!("Replaying {}", cli.script.display());

    let report = match ReplayScript::load(&cli.script).and_then(replay) {
        Ok(report) => report,
        Err(e) => {
            log::error!("Replay failed: {}", e);
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match json {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
