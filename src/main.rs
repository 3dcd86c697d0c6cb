use clap::{Parser, Subcommand};
use localexec::apply::{self, ApplyReport};
use localexec::config::{self, schema::AppConfig};
use localexec::invoker::ShellInvoker;
use localexec::resource::LocalExec;
use localexec::store::StateFile;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// localexec: run local commands as declaratively managed resources
#[derive(Parser)]
#[command(name = "localexec", version, about)]
struct Cli {
    /// Path to the resource declarations (TOML).
    #[arg(short, long, default_value = "localexec.toml")]
    config: PathBuf,

    /// Path to the state file (JSON).
    #[arg(short, long, default_value = "localexec.state.json")]
    state: PathBuf,

    /// Enable JSON log output.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show what apply would do.
    Plan,
    /// Create, rerun, update and destroy resources to match the config.
    Apply,
    /// Destroy every resource in state.
    Destroy,
    /// Print the state file.
    Show,
    /// Validate config and exit.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries plans and state.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("localexec=info"));

    if cli.json {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Command::Check => {
            let config = config::load(&cli.config)?;
            println!("config OK: {} resources", config.resources.len());
        }
        Command::Plan => {
            let config = config::load(&cli.config)?;
            let state = StateFile::load(&cli.state)?;
            let changes = apply::plan(&config, &state);
            for change in &changes {
                println!("{} {}", change.plan, change.name);
            }
            let runs = changes.iter().filter(|c| c.plan.runs_command()).count();
            println!("{runs} of {} resources will run their command", changes.len());
        }
        Command::Show => {
            let state = StateFile::load(&cli.state)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Command::Apply => {
            let config = config::load(&cli.config)?;
            let mut state = StateFile::load(&cli.state)?;
            let controller = controller(&config);
            info!("applying {} resources", config.resources.len());
            let report = apply::apply(&controller, &config, &mut state).await;
            finish(&report, &state, &cli.state)?;
        }
        Command::Destroy => {
            // Destroy commands run with the recorded settings; the config only
            // supplies the global interpreter and timeout, if it exists.
            let config = if cli.config.exists() {
                config::load(&cli.config)?
            } else {
                AppConfig::default()
            };
            let mut state = StateFile::load(&cli.state)?;
            let controller = controller(&config);
            info!("destroying {} resources", state.resources.len());
            let report = apply::destroy_all(&controller, &mut state).await;
            finish(&report, &state, &cli.state)?;
        }
    }

    Ok(())
}

/// Controller whose in-flight commands are killed on Ctrl-C.
fn controller(config: &AppConfig) -> LocalExec {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("received SIGINT, killing running commands");
            trigger.cancel();
        }
    });
    LocalExec::from_settings(ShellInvoker, &config.settings).with_cancellation(cancel)
}

/// Save state, print the summary and turn any failure into a nonzero exit.
fn finish(report: &ApplyReport, state: &StateFile, path: &Path) -> anyhow::Result<()> {
    state.save(path)?;

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(()) => println!("{} {}: ok", outcome.plan, outcome.name),
            Err(e) => println!("{} {}: FAILED: {e}", outcome.plan, outcome.name),
        }
    }

    let failed = report.failures().count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} resources failed", report.outcomes.len());
    }
    Ok(())
}
