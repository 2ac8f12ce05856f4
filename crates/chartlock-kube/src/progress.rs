//! Progress feedback while an external fetch or deploy is outstanding
//!
//! A [`ProgressGuard`] wraps one long-running call: it starts the reporter on
//! creation and always finishes it, on success, on failure, or when dropped
//! by an early return.

use std::sync::Mutex;
use std::time::Duration;

use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};

/// Receiver of progress events
pub trait ProgressReporter: Send + Sync {
    fn start(&self, message: &str);

    fn tick(&self);

    /// Stop the indicator and print the final line. Any background ticking
    /// has stopped when this returns.
    fn finish(&self, success: bool, message: &str);
}

/// Spinner on an interactive stderr, plain lines otherwise
pub struct SpinnerReporter {
    interactive: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl SpinnerReporter {
    pub fn new() -> Self {
        Self::with_interactive(Term::stderr().is_term())
    }

    pub fn with_interactive(interactive: bool) -> Self {
        Self {
            interactive,
            bar: Mutex::new(None),
        }
    }
}

impl Default for SpinnerReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for SpinnerReporter {
    fn start(&self, message: &str) {
        if !self.interactive {
            eprintln!("{} {}...", style("→").cyan(), message);
            return;
        }

        let bar = ProgressBar::new_spinner();
        let spinner_style = ProgressStyle::with_template("{msg} [{spinner:.cyan}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["\\", "|", "/", "-", ""]);
        bar.set_style(spinner_style);
        bar.set_message(style(message).yellow().to_string());
        bar.enable_steady_tick(Duration::from_millis(200));

        if let Ok(mut slot) = self.bar.lock() {
            if let Some(previous) = slot.replace(bar) {
                previous.finish_and_clear();
            }
        }
    }

    fn tick(&self) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.tick();
            }
        }
    }

    fn finish(&self, success: bool, message: &str) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.disable_steady_tick();
                bar.finish_and_clear();
            }
        }

        let glyph = if success {
            style("✓").green().bold()
        } else {
            style("✗").red().bold()
        };
        eprintln!("{} {}", glyph, message);
    }
}

/// Reporter that prints nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn start(&self, _message: &str) {}

    fn tick(&self) {}

    fn finish(&self, _success: bool, _message: &str) {}
}

/// Scoped use of a reporter; finishes it exactly once
pub struct ProgressGuard<'a> {
    reporter: &'a dyn ProgressReporter,
    failure_message: String,
    finished: bool,
}

impl<'a> ProgressGuard<'a> {
    /// Start `reporter`; if the guard is dropped unfinished it reports
    /// `failure_message` as a failure
    pub fn start(
        reporter: &'a dyn ProgressReporter,
        message: &str,
        failure_message: impl Into<String>,
    ) -> Self {
        reporter.start(message);
        Self {
            reporter,
            failure_message: failure_message.into(),
            finished: false,
        }
    }

    pub fn tick(&self) {
        self.reporter.tick();
    }

    pub fn succeed(mut self, message: &str) {
        self.finished = true;
        self.reporter.finish(true, message);
    }

    pub fn fail(mut self) {
        self.finished = true;
        self.reporter.finish(false, &self.failure_message);
    }
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.reporter.finish(false, &self.failure_message);
        }
    }
}
