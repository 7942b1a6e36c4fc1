//! Command-line front end.
//!
//! `fleetflow solve --request req.json [--config fleet.toml]` prints the
//! solution as JSON. `fleetflow demo` prints the built-in demo request, or
//! solves it with `--solve`. No network collaborators are wired in, so
//! costs are geodesic or preference-based and paths are straight lines.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use fleetflow::config::FleetConfig;
use fleetflow::models::{Method, OptimizationRequest};
use fleetflow::providers::Unavailable;
use fleetflow::service::{FleetOptimizer, SessionState};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fleetflow", version, about = "Fleet route optimization")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Solves a JSON optimization request.
    Solve {
        /// Path to the request JSON.
        #[arg(long)]
        request: PathBuf,
        #[command(flatten)]
        opts: SolveOpts,
    },
    /// Prints the demo request, or solves it.
    Demo {
        /// Solve the demo instead of printing it.
        #[arg(long)]
        solve: bool,
        #[command(flatten)]
        opts: SolveOpts,
    },
}

#[derive(Debug, clap::Args)]
struct SolveOpts {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the method named in the request.
    #[arg(long, value_enum)]
    method: Option<MethodArg>,
    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    Classical,
    Quantum,
}

impl From<MethodArg> for Method {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Classical => Method::Classical,
            MethodArg::Quantum => Method::Quantum,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fleetflow=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::Solve { request, opts } => {
            let text = std::fs::read_to_string(&request)?;
            let request: OptimizationRequest = serde_json::from_str(&text)?;
            solve(request, &opts)
        }
        Command::Demo { solve: true, opts } => solve(OptimizationRequest::demo(), &opts),
        Command::Demo { solve: false, opts } => {
            print_json(&OptimizationRequest::demo(), opts.pretty)
        }
    }
}

fn solve(mut request: OptimizationRequest, opts: &SolveOpts) -> Result<(), Box<dyn Error>> {
    let config = match &opts.config {
        Some(path) => FleetConfig::load(path)?,
        None => FleetConfig::default(),
    };
    if let Some(method) = opts.method {
        request.method = method.into();
    }

    let state = Arc::new(SessionState::new(config.scheduler.subscriber_buffer));
    let optimizer = FleetOptimizer::new(config, Unavailable, Unavailable, state);

    let runtime = tokio::runtime::Runtime::new()?;
    let solution = runtime.block_on(optimizer.optimize(&request))?;
    print_json(solution.as_ref(), opts.pretty)
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), Box<dyn Error>> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}
