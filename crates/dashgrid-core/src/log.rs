//! Ordered, deduplicated warnings and errors collected during a run.
//!
//! [`LogMessages`] is threaded explicitly through startup and the frame loop.
//! Config validation, scheduler failures and widget errors all append to it;
//! the driver prints it when the process exits.

use std::fmt;

/// Severity of a [`LogMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    /// Something looks off but the dashboard can keep running.
    Warning,
    /// Something failed.
    Error,
}

impl LogLevel {
    /// Short label used when printing.
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// A single (text, severity) entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogMessage {
    /// Human-readable text.
    pub text: String,
    /// Severity.
    pub level: LogLevel,
}

impl LogMessage {
    /// Create a message with the given severity.
    pub fn new(text: impl Into<String>, level: LogLevel) -> Self {
        Self {
            text: text.into(),
            level,
        }
    }

    /// Create an error-level message.
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, LogLevel::Error)
    }

    /// Create a warning-level message.
    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(text, LogLevel::Warning)
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level.label(), self.text)
    }
}

/// An insertion-ordered sequence of [`LogMessage`]s without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogMessages {
    messages: Vec<LogMessage>,
}

impl LogMessages {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `message` unless an equal message is already present.
    ///
    /// Returns `true` if the message was new.
    pub fn add(&mut self, message: LogMessage) -> bool {
        if self.messages.contains(&message) {
            return false;
        }
        match message.level {
            LogLevel::Warning => tracing::warn!(text = %message.text, "log message recorded"),
            LogLevel::Error => tracing::error!(text = %message.text, "log message recorded"),
        }
        self.messages.push(message);
        true
    }

    /// Shorthand for adding an error-level message.
    pub fn error(&mut self, text: impl Into<String>) -> bool {
        self.add(LogMessage::error(text))
    }

    /// Shorthand for adding a warning-level message.
    pub fn warning(&mut self, text: impl Into<String>) -> bool {
        self.add(LogMessage::warning(text))
    }

    /// Fold every message of `other` into `self`, keeping the dedupe contract.
    pub fn extend(&mut self, other: impl IntoIterator<Item = LogMessage>) {
        for message in other {
            self.add(message);
        }
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of recorded messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether any error-level message was recorded.
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.level == LogLevel::Error)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, LogMessage> {
        self.messages.iter()
    }

    /// Render the collection under a heading, one message per line.
    pub fn report(&self, heading: &str) -> String {
        let mut out = String::from(heading);
        if !out.ends_with('\n') {
            out.push('\n');
        }
        for message in &self.messages {
            out.push_str(&format!("  {message}\n"));
        }
        out
    }

    /// Print [`report`](LogMessages::report) to stdout. Does nothing when empty.
    pub fn print(&self, heading: &str) {
        if !self.is_empty() {
            print!("{}", self.report(heading));
        }
    }
}

impl fmt::Display for LogMessages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let texts: Vec<String> = self.messages.iter().map(ToString::to_string).collect();
        f.write_str(&texts.join("; "))
    }
}

impl IntoIterator for LogMessages {
    type Item = LogMessage;
    type IntoIter = std::vec::IntoIter<LogMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl<'a> IntoIterator for &'a LogMessages {
    type Item = &'a LogMessage;
    type IntoIter = std::slice::Iter<'a, LogMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl FromIterator<LogMessage> for LogMessages {
    fn from_iter<I: IntoIterator<Item = LogMessage>>(iter: I) -> Self {
        let mut messages = LogMessages::new();
        messages.extend(iter);
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_deduplicates_by_equality() {
        let mut log = LogMessages::new();
        assert!(log.error("boom"));
        assert!(!log.error("boom"));
        assert!(log.warning("boom"));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn keeps_insertion_order() {
        let mut log = LogMessages::new();
        log.warning("first");
        log.error("second");
        log.warning("third");
        let texts: Vec<&str> = log.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn extend_folds_without_duplicates() {
        let mut log = LogMessages::new();
        log.error("a");
        let other: LogMessages = vec![LogMessage::error("a"), LogMessage::error("b")]
            .into_iter()
            .collect();
        log.extend(other);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let mut log = LogMessages::new();
        log.warning("careful");
        assert!(!log.has_errors());
        log.error("broken");
        assert!(log.has_errors());
    }

    #[test]
    fn report_lists_messages_under_heading() {
        let mut log = LogMessages::new();
        log.error("missing title");
        let report = log.report("Config errors:");
        assert_eq!(report, "Config errors:\n  ERROR: missing title\n");
    }
}
