//! Engine runner binary.
//!
//! Loads a protocol (a JSON array of commands), executes it against the
//! configured backend, and prints the run summary as JSON on stdout.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use aria_common::command::{CommandIntent, CommandParams};
use aria_common::config::{EngineConfig, load_config};
use aria_engine::engine::ProtocolEngine;
use aria_engine::state::RunStatus;

#[derive(Debug, Parser)]
#[command(name = "aria_engine", about = "ARIA protocol execution engine", version)]
struct Args {
    /// Protocol file: a JSON array of commands.
    protocol: PathBuf,

    /// Engine configuration (TOML). Runs fully virtual when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Give up on a run that has not settled after this many seconds.
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(args: &Args) {
    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("aria_engine={default_level}")));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::virtual_config(),
    };
    info!(
        robot_type = ?config.robot_type,
        api_version = %config.api_version,
        virtual_pipettes = config.use_virtual_pipettes,
        "starting engine"
    );

    let text = std::fs::read_to_string(&args.protocol)?;
    let protocol: Vec<CommandParams> = serde_json::from_str(&text)?;
    info!(commands = protocol.len(), "protocol loaded");

    let mut engine = ProtocolEngine::new(config);
    for params in protocol {
        engine.add_command(params, CommandIntent::Protocol)?;
    }
    engine.play()?;

    let deadline = std::time::Instant::now() + Duration::from_secs(args.timeout_secs);
    loop {
        if engine.wait_for_all_settled(Duration::from_millis(100)) {
            engine.finish(None)?;
            break;
        }
        let status = engine.get_run_status();
        if status == RunStatus::Paused {
            let failure = engine
                .get_all_commands()
                .iter()
                .find_map(|command| command.error.clone());
            match failure {
                // A failed protocol command paused the run for recovery;
                // the CLI has no operator, so close the run with that
                // error.
                Some(failure) => {
                    engine.finish(Some(failure))?;
                    break;
                }
                // waitForResume: nobody to wait for, resume immediately.
                None => engine.play()?,
            }
        }
        if status.is_terminal() {
            break;
        }
        if std::time::Instant::now() >= deadline {
            error!("run did not settle in time; stopping");
            engine.stop()?;
            break;
        }
    }
    engine.join()?;

    let summary = engine.summary();
    info!(status = ?summary.status, commands = summary.commands.len(), "run closed");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
