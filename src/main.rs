//! bundlepin - operator bundle image pinning
//!
//! Rewrites the ClusterServiceVersion of an operator bundle so that every
//! container image it references is pinned to a registry digest.

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod artifacts;
mod bundle;
mod cli;
mod commands;
mod error;
mod operations;
mod progress;
mod reference;
mod related;
mod replacer;
mod resolver;
mod scanner;

use cli::{Cli, Commands, PinningSubcommand};

fn init_tracing(verbose: bool) {
    let filter = if verbose { "bundlepin=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Pinning(args) => match args.command {
            PinningSubcommand::Pin(args) => commands::pin::run(args),
            PinningSubcommand::Extract(args) => commands::extract::run(args),
            PinningSubcommand::Resolve(args) => commands::resolve::run(args),
            PinningSubcommand::Replace(args) => commands::replace::run(args),
        },
        Commands::Version => commands::version::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
