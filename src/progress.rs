//! Progress bar display for digest resolution

use console::Term;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress display for registry lookups
pub struct ProgressDisplay {
    lookups_pb: ProgressBar,
}

impl ProgressDisplay {
    /// Create a progress display for `total_lookups` references
    ///
    /// The bar is hidden unless stderr is a terminal.
    pub fn new(total_lookups: u64) -> Self {
        let lookups_pb = if Term::stderr().is_term() {
            ProgressBar::new(total_lookups)
        } else {
            ProgressBar::hidden()
        };

        let style = ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        lookups_pb.set_style(style);

        Self { lookups_pb }
    }

    /// A display that never draws
    pub fn hidden() -> Self {
        Self {
            lookups_pb: ProgressBar::hidden(),
        }
    }

    /// Show the reference being looked up
    pub fn update(&self, reference: &str) {
        // Truncate long references for display
        let display = if reference.len() > 60 {
            let cut = reference.len() - 57;
            let cut = (cut..reference.len())
                .find(|i| reference.is_char_boundary(*i))
                .unwrap_or(cut);
            format!("...{}", &reference[cut..])
        } else {
            reference.to_string()
        };
        self.lookups_pb.set_message(display);
    }

    /// Count one finished lookup
    pub fn inc(&self) {
        self.lookups_pb.inc(1);
    }

    pub fn finish(&self) {
        self.lookups_pb.finish_and_clear();
    }

    /// Abandon on error
    pub fn abandon(&self) {
        self.lookups_pb.abandon();
    }
}
