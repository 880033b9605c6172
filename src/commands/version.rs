//! Version command implementation

use clap::ValueEnum;

use crate::error::Result;
use crate::resolver::{DEFAULT_CONCURRENCY, ResolverKind};

/// Run version command
pub fn run() -> Result<()> {
    println!("bundlepin {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Lookup defaults:");
    println!("  Resolver: {}", default_resolver());
    println!("  Concurrency: {DEFAULT_CONCURRENCY}");

    Ok(())
}

fn default_resolver() -> String {
    ResolverKind::default()
        .to_possible_value()
        .map_or_else(|| format!("{:?}", ResolverKind::default()), |value| {
            value.get_name().to_string()
        })
}
