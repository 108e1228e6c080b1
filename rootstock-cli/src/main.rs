//! Rootstock CLI - acquire pristine Linux rootfs archives.
//!
//! This binary provides a command-line interface to the rootstock library.

mod commands;
mod error;

use clap::{Parser, Subcommand};

use commands::{AcquireArgs, AddArgs};
use error::CliError;

#[derive(Parser)]
#[command(name = "rootstock")]
#[command(about = "Acquire pristine Linux distribution rootfs archives", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List distributions in the catalog
    List,
    /// Show details of one distribution
    Info {
        /// Distribution name
        name: String,
    },
    /// Register a distribution in the catalog
    Add(AddArgs),
    /// Download, verify, and normalize a distribution
    Acquire(AcquireArgs),
    /// Remove an acquired artifact (and, with --purge, the record)
    Remove {
        /// Distribution name
        name: String,
        /// Also drop the catalog record
        #[arg(long)]
        purge: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // File + console logging; the guard flushes the file writer on exit.
    // Best effort: a read-only working directory must not block the CLI.
    let _logging = rootstock::logging::init_logging(
        rootstock::logging::default_log_dir(),
        rootstock::logging::default_log_file(),
    )
    .ok();

    let result = match cli.command {
        Commands::List => commands::run_list(),
        Commands::Info { name } => commands::run_info(&name),
        Commands::Add(args) => commands::run_add(args),
        Commands::Acquire(args) => commands::run_acquire(args),
        Commands::Remove { name, purge } => commands::run_remove(&name, purge),
    };

    if let Err(err) = result {
        err.exit();
    }
}
