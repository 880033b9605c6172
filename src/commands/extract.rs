//! Extract command implementation

use crate::bundle::{Bundle, ensure_dir};
use crate::cli::ExtractArgs;
use crate::commands::helpers::write_output;
use crate::error::Result;
use crate::operations::ExtractOperation;

/// Run extract command
pub fn run(args: ExtractArgs) -> Result<()> {
    ensure_dir(&args.manifest_dir)?;
    let bundle = Bundle::load(&args.manifest_dir)?;

    let references = ExtractOperation::new(&bundle).execute()?;
    write_output(&args.output, &references)
}
