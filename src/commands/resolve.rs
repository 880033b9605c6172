//! Resolve command implementation

use crate::cli::ResolveArgs;
use crate::commands::helpers::{read_input, write_output};
use crate::error::Result;
use crate::operations::{ResolveOperation, parse_reference_list};
use crate::resolver::{Resolver, ResolverConfig};

/// Run resolve command
pub fn run(args: ResolveArgs) -> Result<()> {
    let references = parse_reference_list(&read_input(&args.images_file)?)?;

    let config = ResolverConfig::from(&args.resolver);
    let inspector = config.inspector()?;
    let resolver = Resolver::new(inspector.as_ref(), config.concurrency).with_progress(true);

    let mapping = ResolveOperation::new(&resolver).execute(&references)?;
    write_output(&args.output, &mapping)
}
