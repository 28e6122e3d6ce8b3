//! Alert sinks.
//!
//! A sink receives alerts after debouncing and presents them. Sinks hold no
//! state the engine depends on.

use crate::core::alert::{AlertIntent, Severity};
use std::io::Write;

/// Receives debounced alerts.
pub trait AlertSink {
    fn deliver(&mut self, alert: &AlertIntent);
}

/// Writes alerts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn deliver(&mut self, alert: &AlertIntent) {
        match alert.severity {
            Severity::Critical | Severity::Warning => tracing::warn!(
                kind = %alert.kind,
                "{}: {}",
                alert.title,
                alert.message
            ),
            Severity::Info => tracing::info!(kind = %alert.kind, "{}: {}", alert.title, alert.message),
        }
    }
}

/// Writes each alert as one JSON line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> AlertSink for JsonLinesSink<W> {
    fn deliver(&mut self, alert: &AlertIntent) {
        let result = serde_json::to_string(alert)
            .map_err(std::io::Error::other)
            .and_then(|line| writeln!(self.writer, "{line}"))
            .and_then(|_| self.writer.flush());
        if let Err(e) = result {
            tracing::warn!("Could not write alert: {}", e);
        }
    }
}

/// Collects alerts in memory.
impl AlertSink for Vec<AlertIntent> {
    fn deliver(&mut self, alert: &AlertIntent) {
        self.push(alert.clone());
    }
}

/// Delivers to both sinks in order.
impl<A: AlertSink, B: AlertSink> AlertSink for (A, B) {
    fn deliver(&mut self, alert: &AlertIntent) {
        self.0.deliver(alert);
        self.1.deliver(alert);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_lines_output() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.deliver(&AlertIntent::no_face(42));
        sink.deliver(&AlertIntent::bad_posture(43));

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: AlertIntent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, AlertIntent::no_face(42));
    }

    #[test]
    fn test_pair_delivers_to_both() {
        let mut sink = (Vec::new(), Vec::new());
        sink.deliver(&AlertIntent::posture_warning(1));
        assert_eq!(sink.0.len(), 1);
        assert_eq!(sink.1.len(), 1);
    }
}
