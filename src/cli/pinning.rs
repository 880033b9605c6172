use std::path::PathBuf;

use clap::builder::TypedValueParser;
use clap::{Args, Parser, Subcommand};

use crate::resolver::{DEFAULT_CONCURRENCY, ResolverConfig, ResolverKind};

/// Arguments for the pinning command group
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Pin every image of a bundle in place:\n    bundlepin pinning pin ./manifests\n\n\
                  Do the same in three steps:\n    \
                  bundlepin pinning extract ./manifests -o images.json\n    \
                  bundlepin pinning resolve images.json -o replacements.json\n    \
                  bundlepin pinning replace ./manifests replacements.json")]
pub struct PinningArgs {
    #[command(subcommand)]
    pub command: PinningSubcommand,
}

/// Pinning subcommands
#[derive(Subcommand, Debug)]
pub enum PinningSubcommand {
    /// Resolve every image of a bundle and pin it in place
    Pin(PinArgs),

    /// List the distinct image references of a bundle
    Extract(ExtractArgs),

    /// Resolve a JSON list of image references to digests
    Resolve(ResolveArgs),

    /// Apply a JSON replacement map to a bundle
    Replace(ReplaceArgs),
}

/// Registry lookup options shared by `pin` and `resolve`
#[derive(Args, Debug, Clone)]
pub struct ResolverArgs {
    /// Registry credentials file passed to skopeo
    #[arg(long, short = 'a', env = "BUNDLEPIN_AUTHFILE")]
    pub authfile: Option<PathBuf>,

    /// Program used to look up digests
    #[arg(long, value_enum, default_value_t = ResolverKind::Skopeo, env = "BUNDLEPIN_RESOLVER")]
    pub resolver: ResolverKind,

    /// Path of the resolver program (required for `script`)
    #[arg(long, env = "BUNDLEPIN_RESOLVER_PATH")]
    pub resolver_path: Option<PathBuf>,

    /// Number of parallel registry lookups
    #[arg(
        long,
        default_value_t = DEFAULT_CONCURRENCY,
        value_parser = clap::value_parser!(u16).range(1..).map(usize::from),
        env = "BUNDLEPIN_CONCURRENCY"
    )]
    pub concurrency: usize,
}

impl From<&ResolverArgs> for ResolverConfig {
    fn from(args: &ResolverArgs) -> Self {
        Self {
            kind: args.resolver,
            path: args.resolver_path.clone(),
            authfile: args.authfile.clone(),
            concurrency: args.concurrency,
        }
    }
}

/// Arguments for the pin command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Pin a bundle with skopeo:\n    bundlepin pinning pin ./manifests\n\n\
                  Use registry credentials:\n    bundlepin pinning pin ./manifests --authfile auth.json\n\n\
                  Preview without touching the bundle:\n    bundlepin pinning pin ./manifests --dry-run")]
pub struct PinArgs {
    /// Directory holding the bundle manifests
    pub manifest_dir: PathBuf,

    #[command(flatten)]
    pub resolver: ResolverArgs,

    /// Where to write the occurrence record
    #[arg(long, default_value = "references.json")]
    pub output_extract: PathBuf,

    /// Where to write the identity key to digest map
    #[arg(long, default_value = "replacements.json")]
    pub output_replace: PathBuf,

    /// Resolve and report, but do not rewrite the bundle
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the extract command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Print references:\n    bundlepin pinning extract ./manifests\n\n\
                  Write them to a file:\n    bundlepin pinning extract ./manifests -o images.json")]
pub struct ExtractArgs {
    /// Directory holding the bundle manifests
    pub manifest_dir: PathBuf,

    /// Output file, `-` for stdout
    #[arg(long, short = 'o', default_value = "-")]
    pub output: String,
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Resolve a list of references:\n    bundlepin pinning resolve images.json\n\n\
                  Read from stdin:\n    bundlepin pinning extract ./manifests | bundlepin pinning resolve -")]
pub struct ResolveArgs {
    /// JSON array of image references, `-` for stdin
    pub images_file: String,

    #[command(flatten)]
    pub resolver: ResolverArgs,

    /// Output file, `-` for stdout
    #[arg(long, short = 'o', default_value = "-")]
    pub output: String,
}

/// Arguments for the replace command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Apply a replacement map:\n    bundlepin pinning replace ./manifests replacements.json\n\n\
                  Leave spec.relatedImages alone:\n    bundlepin pinning replace ./manifests replacements.json --no-related-images")]
pub struct ReplaceArgs {
    /// Directory holding the bundle manifests
    pub manifest_dir: PathBuf,

    /// JSON object mapping image references to replacements
    pub replacements_file: PathBuf,

    /// Do not add spec.relatedImages when the bundle has none
    #[arg(long)]
    pub no_related_images: bool,

    /// Report, but do not rewrite the bundle
    #[arg(long)]
    pub dry_run: bool,
}
