use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Creates and configures a new progress spinner with consistent styling
///
/// Returns a ProgressBar configured with:
/// - Braille spinner characters
/// - Green spinner color
/// - Message template
/// - 100ms tick interval
///
/// Callers set the message as work progresses and clear the spinner with
/// `finish_and_clear` before printing results, so the table or JSON output
/// is not interleaved with spinner frames.
pub fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
