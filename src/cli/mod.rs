//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for each command's argument types:
//! - pinning: `pinning pin|extract|resolve|replace` arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};

pub mod pinning;

pub use pinning::{ExtractArgs, PinArgs, PinningArgs, PinningSubcommand, ReplaceArgs, ResolveArgs};

/// bundlepin - operator bundle image pinning
///
/// Pin the container images referenced by an operator bundle to registry digests.
#[derive(Parser, Debug)]
#[command(
    name = "bundlepin",
    author,
    version,
    color = clap::ColorChoice::Auto,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Pin operator bundle image references to registry digests",
    long_about = "bundlepin rewrites the ClusterServiceVersion of an operator bundle so that every \
                  container image it references is pinned to a registry digest, and records the \
                  images in spec.relatedImages.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  bundlepin pinning pin ./manifests                     \x1b[90m# Pin in place\x1b[0m\n   \
                  bundlepin pinning extract ./manifests -o images.json  \x1b[90m# List references\x1b[0m\n   \
                  bundlepin pinning resolve images.json                 \x1b[90m# Look up digests\x1b[0m\n   \
                  bundlepin pinning replace ./manifests map.json        \x1b[90m# Apply a map\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pin, extract, resolve and replace image references
    Pinning(PinningArgs),

    /// Show version information
    Version,
}
