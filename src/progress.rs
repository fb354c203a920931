//! Progress bar for the registry walk

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Longest entry label shown next to the bar
const MAX_LABEL_LEN: usize = 50;

/// Progress display over registry entries. Draws to stderr, which indicatif
/// leaves blank when stderr is not a terminal.
pub struct ProgressDisplay {
    entry_pb: ProgressBar,
}

fn truncate_label(label: &str) -> String {
    let count = label.chars().count();
    if count <= MAX_LABEL_LEN {
        return label.to_string();
    }
    let tail: String = label.chars().skip(count - (MAX_LABEL_LEN - 3)).collect();
    format!("...{tail}")
}

impl ProgressDisplay {
    /// Create a progress display with total entry count
    pub fn new(total_entries: u64) -> Self {
        let entry_pb = ProgressBar::with_draw_target(Some(total_entries), ProgressDrawTarget::stderr());
        if let Ok(style) = ProgressStyle::default_bar().template("[{bar:40.cyan/blue}] {pos}/{len} {msg}") {
            entry_pb.set_style(style.progress_chars("#>-"));
        }
        Self { entry_pb }
    }

    /// Show the entry currently being processed
    pub fn start_entry(&self, label: &str) {
        self.entry_pb.set_message(truncate_label(label));
    }

    pub fn inc(&self) {
        self.entry_pb.inc(1);
    }

    pub fn finish(&self) {
        self.entry_pb.finish_and_clear();
    }

    /// Abandon on error, leaving the bar where it stopped
    pub fn abandon(&self) {
        self.entry_pb.abandon();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_label_unchanged() {
        assert_eq!(truncate_label("plugins/foo.yaml"), "plugins/foo.yaml");
    }

    #[test]
    fn test_long_label_keeps_tail() {
        let label = format!("{}/plugins/foo.yaml", "x".repeat(80));
        let truncated = truncate_label(&label);
        assert_eq!(truncated.chars().count(), MAX_LABEL_LEN);
        assert!(truncated.starts_with("..."));
        assert!(truncated.ends_with("plugins/foo.yaml"));
    }

    #[test]
    fn test_progress_counts() {
        let progress = ProgressDisplay::new(2);
        progress.start_entry("a.yaml");
        progress.inc();
        assert_eq!(progress.entry_pb.position(), 1);
        progress.finish();
    }
}
