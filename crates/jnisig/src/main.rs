//! jnisig - JNI signature recovery for Android native libraries
//!
//! Usage:
//!   jnisig import <binary>            Create an analysis session from an ELF
//!   jnisig run <session>              Apply JNI signatures and fix dispatch stubs
//!   jnisig functions <session>        List functions and their recovered types
//!   jnisig parse <header>             Check that a header parses

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;
mod prompt;
mod session;

use commands::{ParseArgs, RunArgs};
use session::FunctionFilter;

#[derive(Parser)]
#[command(name = "jnisig")]
#[command(about = "JNI signature recovery for Android native libraries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log more detail (repeat for trace output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a session from the function symbols of an ELF binary
    Import {
        /// Path to the native library
        binary: PathBuf,
        /// Session file to write (default: <binary>.jnisig)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Replace an existing session file
        #[arg(long)]
        force: bool,
    },
    /// Apply JNI signatures to a session and fix dispatch stubs
    Run(RunArgs),
    /// List functions in a session
    Functions {
        session: PathBuf,
        /// Only functions with a recovered type
        #[arg(long)]
        typed: bool,
        /// Only functions waiting for re-analysis
        #[arg(long)]
        pending: bool,
        /// Mark pending functions as analyzed after listing
        #[arg(long)]
        clear_pending: bool,
    },
    /// List user types in a session, or show one
    Types {
        session: PathBuf,
        /// Type name to show
        name: Option<String>,
    },
    /// Show session information
    Info { session: PathBuf },
    /// Parse a header, optionally extended with method prototypes
    Parse(ParseArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(logging::level_for(cli.verbose, cli.quiet))?;

    match cli.command {
        Commands::Import {
            binary,
            output,
            force,
        } => commands::handle_import_command(&binary, output, force),
        Commands::Run(args) => commands::handle_run_command(args),
        Commands::Functions {
            session,
            typed,
            pending,
            clear_pending,
        } => commands::handle_functions_command(
            &session,
            FunctionFilter { typed, pending },
            clear_pending,
        ),
        Commands::Types { session, name } => {
            commands::handle_types_command(&session, name.as_deref())
        }
        Commands::Info { session } => commands::handle_info_command(&session),
        Commands::Parse(args) => commands::handle_parse_command(args),
    }
}
