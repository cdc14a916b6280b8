//! `dashgrid` command-line entry point.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dashgrid::control::WIDGET_SOURCE_HEADING;
use dashgrid::widgets::BuiltinPlugins;
use dashgrid::{ConfigLoader, CrosstermEvents, Driver, PluginSource, Screen};

/// A terminal dashboard of independently refreshed widgets.
#[derive(Debug, Parser)]
#[command(name = "dashgrid", version, about)]
struct Cli {
    /// Config directory (default: the platform config dir + `dashgrid`)
    #[arg(long, global = true, env = "DASHGRID_CONFIG_DIR", value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Write logs here instead of `<config dir>/dashgrid.log`
    #[arg(long, value_name = "FILE", conflicts_with = "no_log")]
    log_file: Option<PathBuf>,

    /// Disable logging
    #[arg(long)]
    no_log: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a default config directory
    Init {
        /// Overwrite files that already exist
        #[arg(long)]
        force: bool,
    },
    /// Print the names of the available plugins
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("dashgrid: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let dir = match cli.config_dir {
        Some(dir) => dir,
        None => ConfigLoader::default_dir()
            .context("cannot locate a config directory; pass --config-dir")?,
    };

    match cli.command {
        Some(Command::Init { force }) => {
            for path in dashgrid::init::write_default_config(&dir, force)? {
                println!("wrote {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::List) => Ok(list(&dir)),
        None => {
            if !cli.no_log {
                let path = cli.log_file.unwrap_or_else(|| dir.join("dashgrid.log"));
                if let Err(e) = init_logging(&path) {
                    eprintln!("dashgrid: logging disabled: {e:#}");
                }
            }
            let mut driver = Driver::new(&BuiltinPlugins, ConfigLoader::new(dir)).handle_signals(true);
            let exit = driver
                .run(
                    |base| Screen::acquire(base.mouse),
                    || CrosstermEvents,
                    &mut io::stdout(),
                )
                .await;
            Ok(exit.into())
        }
    }
}

fn list(dir: &Path) -> ExitCode {
    let builtin = BuiltinPlugins.builtin();
    for name in builtin.names() {
        println!("{name}");
    }
    match BuiltinPlugins.custom(&ConfigLoader::new(dir)) {
        Ok(custom) => {
            for name in custom.names() {
                if builtin.contains(name) {
                    println!("{name} (custom, overrides builtin)");
                } else {
                    println!("{name} (custom)");
                }
            }
            ExitCode::SUCCESS
        }
        Err(problems) => {
            eprint!("{}", problems.report(WIDGET_SOURCE_HEADING));
            ExitCode::FAILURE
        }
    }
}

/// The screen belongs to the dashboard, so logs go to a file.
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("DASHGRID_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing the log subscriber: {e}"))?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dashgrid starting");
    Ok(())
}
