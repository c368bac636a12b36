//! Terminal feedback shared by the pcs crates.

use std::io::Write;

use console::Style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Report a step of `pcs check` or `pcs solve`, e.g. `    Solving lodash`.
///
/// Status lines go to stderr so that stdout carries only the conflict report
/// and the solutions.
pub fn status(label: &str, message: &str) {
    print_status(Style::new().green().bold(), label, message);
}

/// Like [`status`] with a yellow label, e.g. `    Skipping --dump-cnf needs a SAT solver`.
pub fn status_warn(label: &str, message: &str) {
    print_status(Style::new().yellow().bold(), label, message);
}

fn print_status(style: Style, label: &str, message: &str) {
    let _ = writeln!(std::io::stderr(), "{:>12} {message}", style.apply_to(label));
}

/// Create a progress bar with the given length and message for determinate progress.
///
/// Draws to stderr and stays hidden when stderr is not a terminal, so library
/// callers and tests produce no output.
pub fn progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len}") {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.set_message(message.to_string());
    pb
}
