//! Command implementations for the CSB processor CLI
//!
//! Each command is implemented in its own module:
//! - `process`: batch conversion of a folder of logger files
//! - `list`: the loader, writer and depth-kind registries
//! - `check_metadata`: pre-flight check of a metadata file

pub mod check_metadata;
pub mod list;
pub mod process;
pub mod shared;

pub use shared::ProcessingStats;

use crate::Result;
use crate::cli::args::Commands;
use tokio_util::sync::CancellationToken;

/// Dispatch a subcommand; `cancel` stops a batch from starting new files
pub async fn run(command: Commands, cancel: CancellationToken) -> Result<ProcessingStats> {
    match command {
        Commands::Process(process_args) => process::run_process(process_args, cancel).await,
        Commands::List => Ok(list::run_list()),
        Commands::CheckMetadata(check_args) => check_metadata::run_check_metadata(check_args),
    }
}
