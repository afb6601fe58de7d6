mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, clean, diff, filter, init, refresh, ApplyArgs, CleanArgs, DiffArgs, FilterArgs,
    InitArgs, RefreshArgs,
};

/// Binder CLI - report template tooling
#[derive(Parser, Debug)]
#[command(name = "binder")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default binder.config.json
    Init(InitArgs),

    /// Resolve a template against the resolver service
    Refresh(RefreshArgs),

    /// Keep only sections matching the job's method codes
    Filter(FilterArgs),

    /// Strip derived fields from a template
    Clean(CleanArgs),

    /// Compare two templates; exits with 1 when they differ
    Diff(DiffArgs),

    /// Replay a list of edits on a template
    Apply(ApplyArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let mut exit_code = 0;
    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Refresh(args) => refresh(args, &cwd).await,
        Command::Filter(args) => filter(args),
        Command::Clean(args) => clean(args),
        Command::Diff(args) => diff(args).map(|same| {
            if !same {
                exit_code = 1;
            }
        }),
        Command::Apply(args) => apply(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
    std::process::exit(exit_code);
}
