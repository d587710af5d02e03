use anyhow::Context;
use clap::Parser;
use csb_processor::cli::args::{Args, Commands};
use csb_processor::cli::commands::{self, ProcessingStats};
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    let Some(command) = args.get_command() else {
        show_help_and_commands();
        process::exit(0);
    };

    match run(command) {
        Ok(stats) if stats.all_succeeded() => process::exit(0),
        Ok(_) => process::exit(1),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Run a command on a fresh runtime, cancelling the batch on Ctrl-C
fn run(command: Commands) -> anyhow::Result<ProcessingStats> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

    runtime.block_on(async {
        let cancellation_token = CancellationToken::new();

        // Files already running finish; nothing new is started
        let signal_token = cancellation_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nReceived CTRL+C, finishing files in progress...");
                signal_token.cancel();
            }
        });

        let stats = commands::run(command, cancellation_token).await?;
        Ok(stats)
    })
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("CSB Processor - Marine Logger to Crowd-Sourced Bathymetry Converter");
    println!("===================================================================");
    println!();
    println!("Convert raw marine logger recordings (YDVR, WIBL, TeamSurv, generic ASCII)");
    println!("into geo-referenced depth observations with submission metadata.");
    println!();
    println!("USAGE:");
    println!("    csb-processor <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    process          Convert a folder of logger files (main command)");
    println!("    list             Show available loaders, writers and depth kinds");
    println!("    check-metadata   Check a metadata file for mandatory fields");
    println!("    help             Show this help message or help for specific commands");
    println!();
    println!("EXAMPLES:");
    println!("    # Convert WIBL files to DCDB GeoJSON:");
    println!("    csb-processor process --input logs --output out --loader wibl \\");
    println!("                          --writer geojson --depth Depth --metadata vessel.json");
    println!();
    println!("    # Preview a YDVR conversion without writing anything:");
    println!("    csb-processor process -i logs -l ydvr -w csv -d Depth --dry-run");
    println!();
    println!("For detailed help on any command, use:");
    println!("    csb-processor <COMMAND> --help");
}
