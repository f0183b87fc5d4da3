//! Progress bar for batch runs.

use indicatif::{ProgressBar, ProgressStyle};

/// A bar sized to the number of files, driven by completed fractions.
pub struct BatchProgress {
    bar: ProgressBar,
    total: u64,
}

impl BatchProgress {
    pub fn new(total: usize) -> anyhow::Result<Self> {
        let total = total as u64;
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("█▓░"),
        );
        bar.set_message("processing");
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        Ok(Self { bar, total })
    }

    /// Record progress as a fraction of the batch in (0, 1].
    pub fn set_fraction(&self, fraction: f64) {
        self.bar.set_position(position(fraction, self.total));
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

fn position(fraction: f64, total: u64) -> u64 {
    ((fraction.clamp(0.0, 1.0) * total as f64).round() as u64).min(total)
}
