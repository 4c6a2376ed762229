//! Command handlers for the jnisig CLI.
//!
//! Each submodule handles one group of subcommands.

pub mod import;
pub mod inspect;
pub mod parse;
pub mod run;

pub use import::handle_import_command;
pub use inspect::{handle_functions_command, handle_info_command, handle_types_command};
pub use parse::{handle_parse_command, ParseArgs};
pub use run::{handle_run_command, RunArgs};
