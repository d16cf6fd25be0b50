use std::fmt::Display;
use std::io::Write;
use std::sync::PoisonError;

use colored::Colorize;

use crate::context::TestEventContext;
use crate::options::{ListenerSettings, SharedWriter};

/// Writes the lines of one test event to its output stream.
pub struct Reporter<'a> {
    stream: SharedWriter,
    settings: &'a ListenerSettings,
    label: String,
}

impl<'a> Reporter<'a> {
    pub fn new(stream: SharedWriter, settings: &'a ListenerSettings, context: &TestEventContext) -> Self {
        Self {
            stream,
            settings,
            label: format!(
                "[{} {}]: 'it {}'",
                context.http_method,
                context.route,
                context.description.trim()
            ),
        }
    }

    pub fn group(&self, group: &str) {
        self.write_line(format_args!("{}{group}", self.settings.group_prefix));
    }

    pub fn succeed(&self, elapsed_ms: u128) {
        self.write_line(format_args!(
            "{} {} {} ({elapsed_ms}ms)",
            self.settings.item_prefix,
            "✔".green(),
            self.label
        ));
    }

    pub fn fail(&self, elapsed_ms: u128, error: &dyn Display) {
        self.write_line(format_args!(
            "{} {} [FAILED] {} ({elapsed_ms}ms): '{error}'",
            self.settings.item_prefix,
            "✖".red(),
            self.label
        ));
    }

    pub fn skip(&self) {
        self.write_line(format_args!(
            "{} {} [SKIPPED] {}",
            self.settings.item_prefix,
            "ℹ".blue(),
            self.label
        ));
    }

    fn write_line(&self, line: std::fmt::Arguments<'_>) {
        let mut stream = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        let written = stream
            .write_fmt(format_args!("{line}{}", self.settings.eol))
            .and_then(|()| stream.flush());
        if let Err(err) = written {
            tracing::warn!(error = %err, "failed to write test output");
        }
    }
}
