//! Spinner/progress-bar helpers for long-running CLI strategies, adapted
//! from the donor's `cli/output/progress.rs`. Narrowed to the one shape
//! `run_strategy` needs: a steady-tick spinner that runs for the duration
//! of `orchestrator.execute()` and reports success/failure with color.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Start a spinner with the given message; ticks every 80ms until
/// [`finish_ok`] or [`finish_err`] is called.
pub fn start(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template(SPINNER_TEMPLATE)
            .expect("static spinner template is valid")
            .tick_chars(SPINNER_CHARS),
    );
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Finish the spinner with a green checkmark.
pub fn finish_ok(spinner: &ProgressBar, message: impl Into<String>) {
    spinner.finish_with_message(format!("{} {}", style("\u{2713}").green(), message.into()));
}

/// Finish the spinner with a red cross.
pub fn finish_err(spinner: &ProgressBar, message: impl Into<String>) {
    spinner.finish_with_message(format!("{} {}", style("\u{2717}").red(), message.into()));
}
