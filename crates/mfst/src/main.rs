//! mfst CLI - file-backed manifest storage.
//!
//! Provides commands for:
//! - `watch`: Print object changes under the storage root
//! - `get`, `list`: Read stored objects
//! - `apply`, `patch`, `delete`: Modify stored objects

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ApplyArgs, DeleteArgs, GetArgs, ListArgs, PatchArgs, WatchArgs};
use output::Output;

/// mfst - file-backed manifest storage.
#[derive(Parser)]
#[command(name = "mfst", version, about)]
struct Cli {
    /// Enable verbose output (info-level logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the storage root and print object changes.
    Watch(WatchArgs),
    /// Print one object.
    Get(GetArgs),
    /// List objects of one type.
    List(ListArgs),
    /// Create or replace an object from a manifest file.
    Apply(ApplyArgs),
    /// Merge a JSON overlay into an object.
    Patch(PatchArgs),
    /// Delete an object.
    Delete(DeleteArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Watch(args) => args.execute(),
        Commands::Get(args) => args.execute(),
        Commands::List(args) => args.execute(),
        Commands::Apply(args) => args.execute(),
        Commands::Patch(args) => args.execute(),
        Commands::Delete(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::parse_from(["mfst", "list", "v1", "ConfigMap", "--verbose"]);

        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::List(_)));
    }
}
