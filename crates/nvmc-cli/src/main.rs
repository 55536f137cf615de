mod completion;
mod dispatch;
mod render;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::completion::CliCompletionShell;
use crate::dispatch::run_cli;

const LOG_ENV: &str = "NVMC_LOG";

#[derive(Parser, Debug)]
#[command(name = "nvmc", version)]
#[command(about = "Install and switch between Node.js runtime versions", long_about = None)]
struct Cli {
    /// Base URL of the Node.js distribution server.
    #[arg(long, global = true, value_name = "URL")]
    download_url: Option<String>,
    /// Root directory for nvmc state. Defaults to NVMC_HOME, then ~/.nvmc.
    #[arg(long, global = true, value_name = "DIR")]
    home: Option<PathBuf>,
    /// Log pipeline detail to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download, verify and install a Node.js version.
    Install {
        version: String,
        /// Activate the version once installed.
        #[arg(long = "use")]
        activate: bool,
        #[arg(long = "skip-checksum-validation")]
        skip_checksum: bool,
        /// Replace the version if it is already installed.
        #[arg(long = "override-existing-install", visible_alias = "force")]
        force: bool,
    },
    /// Point the activation link at an installed version.
    Use { version: String },
    /// Show installed versions, oldest first.
    #[command(visible_alias = "ls")]
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print the active version.
    Current,
    Uninstall { version: String },
    /// Write a shell completion script to stdout. Detected from $SHELL when omitted.
    Completions {
        #[arg(value_enum)]
        shell: Option<CliCompletionShell>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run_cli(cli)
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
