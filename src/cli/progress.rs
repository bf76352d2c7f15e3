//! CLI-specific progress handling for butterfly-place
//!
//! Provides the progress bar shown while walking a network.

use std::sync::Arc;

use butterfly_place::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

/// Creates a progress bar counting edges
pub fn create_progress_bar(total_edges: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_edges);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} edges ({percent}%) ETA: {eta}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

/// Progress manager for placement runs
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_edges: u64, message: &str) -> Self {
        let pb = create_progress_bar(total_edges);

        // Print initial message to stderr
        eprintln!("{}", message);

        Self { pb }
    }

    /// Callback driving the bar from traversal progress reports
    pub fn callback(&self) -> ProgressCallback {
        let pb = self.pb.clone();
        Arc::new(move |done, total| {
            if pb.length().unwrap_or(0) != total {
                pb.set_length(total);
            }
            pb.set_position(done);
            if done >= total {
                pb.finish_with_message("✅ Placement completed!");
            }
        })
    }
}
