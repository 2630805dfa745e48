mod catalogs;
mod completion;
mod config;
mod flows;
mod render;

#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::completion::write_completions_script;
use crate::config::Config;
use crate::flows::{
    run_doctor, run_install, run_list, run_status, run_uninstall, run_update,
};
use crate::render::current_output_style;

#[derive(Parser, Debug)]
#[command(name = "stagehand")]
#[command(about = "Batch workstation provisioning from an installer library and package catalogs", long_about = None)]
struct Cli {
    /// Root of the installer library tree (env: STAGEHAND_LIBRARY).
    #[arg(long, global = true)]
    library_root: Option<PathBuf>,
    /// Package catalog JSON file (env: STAGEHAND_CATALOG).
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    /// Uninstall catalog JSON file (env: STAGEHAND_UNINSTALL_CATALOG).
    #[arg(long, global = true)]
    uninstall_catalog: Option<PathBuf>,
    /// Disable styled output and progress bars.
    #[arg(long, global = true)]
    plain: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show catalog entries with an installed marker.
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// Install programs from the library, or from the package manager with --managed.
    Install {
        names: Vec<String>,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        managed: bool,
    },
    /// Uninstall entries from the uninstall catalog.
    Uninstall {
        names: Vec<String>,
        #[arg(long)]
        all: bool,
    },
    /// Update catalog packages through the package manager.
    Update {
        names: Vec<String>,
        #[arg(long)]
        all: bool,
    },
    /// Report whether a program looks installed.
    Status { name: String },
    /// Show the resolved configuration and input health.
    Doctor,
    Completions { shell: Shell },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run_cli(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_cli(cli: Cli) -> Result<bool> {
    let style = current_output_style(cli.plain);
    let config = Config::resolve(cli.library_root, cli.catalog, cli.uninstall_catalog);

    match cli.command {
        Commands::List { category } => {
            run_list(&config, style, category.as_deref())?;
            Ok(true)
        }
        Commands::Install {
            names,
            all,
            category,
            managed,
        } => run_install(&config, style, &names, all, category.as_deref(), managed),
        Commands::Uninstall { names, all } => run_uninstall(&config, style, &names, all),
        Commands::Update { names, all } => run_update(&config, style, &names, all),
        Commands::Status { name } => {
            run_status(style, &name)?;
            Ok(true)
        }
        Commands::Doctor => {
            run_doctor(&config, style)?;
            Ok(true)
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            let mut stdout = std::io::stdout();
            write_completions_script(shell, &mut command, &mut stdout)?;
            Ok(true)
        }
    }
}
