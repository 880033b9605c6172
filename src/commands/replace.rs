//! Replace command implementation

use console::Style;

use crate::bundle::{Bundle, ensure_dir};
use crate::cli::ReplaceArgs;
use crate::error::Result;
use crate::operations::{ReplaceOperation, ReplaceOptions, load_replacements};

/// Run replace command
pub fn run(args: ReplaceArgs) -> Result<()> {
    ensure_dir(&args.manifest_dir)?;
    let bundle = Bundle::load(&args.manifest_dir)?;
    let mapping = load_replacements(&args.replacements_file)?;

    let outcome = ReplaceOperation::new(
        &mapping,
        ReplaceOptions {
            dry_run: args.dry_run,
            related_images: !args.no_related_images,
        },
    )
    .execute(&bundle)?;

    let verb = if args.dry_run { "Would replace" } else { "Replaced" };
    println!(
        "{} {} references in {}",
        verb,
        outcome.rewrite.replaced,
        Style::new().bold().apply_to(bundle.path.display())
    );
    if outcome.rewrite.inserted > 0 {
        for image in &outcome.related_images {
            println!(
                "  {} {}",
                Style::new().bold().yellow().apply_to(&image.name),
                image.image
            );
        }
    }
    for key in &outcome.unmatched {
        println!("  {} {}", Style::new().dim().apply_to("unused:"), key);
    }
    if !outcome.persisted && !args.dry_run {
        println!("No changes.");
    }

    Ok(())
}
