//! Terminal rendering of the upload page: the progress bar goes to stderr,
//! the result area to stdout.

use std::{
    io::Write,
    sync::{Mutex, PoisonError},
};

use upload_client::{ResultNode, UploadView};

const BAR_CELLS: usize = 30;

#[derive(Default)]
pub struct TerminalView {
    /// Suppresses all output; used with `--json`.
    quiet: bool,
    progress_shown: Mutex<bool>,
}

impl TerminalView {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            progress_shown: Mutex::new(false),
        }
    }
}

/// Renders `label` inside a fixed-width bar filled to `width` (e.g. `"40%"`).
pub fn render_bar(width: &str, label: &str) -> String {
    let percent = width
        .trim_end_matches('%')
        .parse::<f64>()
        .unwrap_or(0.0)
        .clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * BAR_CELLS as f64).round() as usize;
    format!(
        "[{}{}] {label}",
        "#".repeat(filled),
        "-".repeat(BAR_CELLS - filled)
    )
}

impl UploadView for TerminalView {
    fn set_progress_visible(&self, visible: bool) {
        let mut shown = self.progress_shown.lock().unwrap_or_else(PoisonError::into_inner);
        if *shown && !visible && !self.quiet {
            eprintln!();
        }
        *shown = visible;
    }

    fn set_progress_fill(&self, width: &str, label: &str) {
        if self.quiet {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", render_bar(width, label));
        let _ = stderr.flush();
    }

    fn replace_result(&self, nodes: Vec<ResultNode>) {
        if self.quiet {
            return;
        }
        for node in nodes {
            match node {
                ResultNode::Paragraph(text) => println!("{text}"),
                ResultNode::Image { id, src } => println!("[{id}] {src}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(
            render_bar("0%", "0%"),
            format!("[{}] 0%", "-".repeat(BAR_CELLS))
        );
        assert_eq!(
            render_bar("50%", "50%"),
            format!("[{}{}] 50%", "#".repeat(15), "-".repeat(15))
        );
        assert_eq!(
            render_bar("100%", "100%"),
            format!("[{}] 100%", "#".repeat(BAR_CELLS))
        );
    }

    #[test]
    fn bar_tolerates_unparseable_width() {
        assert!(render_bar("n/a", "?").starts_with("[---"));
    }
}
