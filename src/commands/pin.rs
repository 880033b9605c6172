//! Pin command implementation
//!
//! Loads the bundle, guards the two output artifacts, runs [`PinOperation`]
//! and prints a summary.

use console::Style;

use crate::artifacts::OutputArtifacts;
use crate::bundle::{Bundle, ensure_dir};
use crate::cli::PinArgs;
use crate::error::Result;
use crate::operations::{PinOperation, PinOptions, PinOutcome};
use crate::resolver::{Resolver, ResolverConfig};
use crate::scanner::scan;

/// Run pin command
pub fn run(args: PinArgs) -> Result<()> {
    ensure_dir(&args.manifest_dir)?;
    let bundle = Bundle::load(&args.manifest_dir)?;
    // Shape errors are reported before any artifact is created
    scan(&bundle.document)?;

    let artifacts = OutputArtifacts::create(&[
        args.output_extract.as_path(),
        args.output_replace.as_path(),
    ])?;

    let config = ResolverConfig::from(&args.resolver);
    let inspector = config.inspector()?;
    let resolver = Resolver::new(inspector.as_ref(), config.concurrency).with_progress(true);

    let outcome = PinOperation::new(
        &resolver,
        PinOptions {
            dry_run: args.dry_run,
        },
    )
    .execute(&bundle)?;

    if outcome.skipped {
        println!(
            "{} already lists relatedImages, nothing to pin.",
            bundle.path.display()
        );
        artifacts.commit();
        return Ok(());
    }

    artifacts.write_json(&args.output_extract, &outcome.records)?;
    artifacts.write_json(&args.output_replace, &outcome.replacements)?;
    artifacts.commit();

    print_summary(&bundle, &outcome, args.dry_run);
    Ok(())
}

fn print_summary(bundle: &Bundle, outcome: &PinOutcome, dry_run: bool) {
    let verb = if dry_run { "Would pin" } else { "Pinned" };
    let rewritten = outcome.rewrite.as_ref().map_or(0, |rewrite| rewrite.replaced);
    println!(
        "{} {} images ({} references) in {}",
        verb,
        outcome.replacements.len(),
        rewritten,
        Style::new().bold().apply_to(bundle.path.display())
    );
    for image in &outcome.related_images {
        println!(
            "  {} {}",
            Style::new().bold().yellow().apply_to(&image.name),
            image.image
        );
    }
    if !outcome.persisted && !dry_run {
        println!("No changes.");
    }
}
