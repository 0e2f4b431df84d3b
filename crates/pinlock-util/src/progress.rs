use std::io::Write;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

/// Which colour a status label is printed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Work that changes something: resolving, writing.
    Action,
    Info,
    Warn,
}

impl Tone {
    fn style(self) -> Style {
        let label = Style::new().for_stderr().bold();
        match self {
            Tone::Action => label.green(),
            Tone::Info => label.cyan(),
            Tone::Warn => label.yellow(),
        }
    }
}

/// Render a status line with `label` right-aligned in a 12-column gutter.
/// Colour is dropped when stderr is not a terminal.
pub fn status_line(tone: Tone, label: &str, message: &str) -> String {
    format!("{:>12} {message}", tone.style().apply_to(label))
}

fn print_status(tone: Tone, label: &str, message: &str) {
    let _ = writeln!(std::io::stderr(), "{}", status_line(tone, label, message));
}

/// `   Resolving 3 requirements from requirements.in`
pub fn status(label: &str, message: &str) {
    print_status(Tone::Action, label, message);
}

pub fn status_info(label: &str, message: &str) {
    print_status(Tone::Info, label, message);
}

pub fn status_warn(label: &str, message: &str) {
    print_status(Tone::Warn, label, message);
}

/// Create an animated spinner for indeterminate progress such as a resolution run.
///
/// Hidden when stderr is not a terminal so piped output stays clean.
pub fn spinner(message: &str) -> ProgressBar {
    if !console::Term::stderr().is_term() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
