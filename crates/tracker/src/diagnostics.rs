//! Operator-facing reports: boxed text for stack anomalies and crash reports
//! for failed updates.

use std::backtrace::Backtrace;
use std::fmt::{self, Display};
use std::panic::Location;

use crate::error::TrackerError;
use crate::phase::PhaseState;

#[derive(Debug, Clone)]
enum Line {
    Text(String),
    Centred(String),
    Rule,
}

/// Builds a fixed-width boxed block of text.
///
/// ```text
/// /**********************************/
/// /*          Completing Phase      */
/// /**********************************/
/// /* Completing phase : Tick::...   */
/// ```
#[derive(Debug, Clone)]
pub struct PrettyPrinter {
    width: usize,
    lines: Vec<Line>,
}

impl PrettyPrinter {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(10),
            lines: Vec::new(),
        }
    }

    pub fn add(&mut self, text: impl Into<String>) -> &mut Self {
        self.lines.push(Line::Text(text.into()));
        self
    }

    /// Centre the most recently added line.
    pub fn centre(&mut self) -> &mut Self {
        if let Some(Line::Text(text)) = self.lines.pop() {
            self.lines.push(Line::Centred(text));
        }
        self
    }

    pub fn hr(&mut self) -> &mut Self {
        self.lines.push(Line::Rule);
        self
    }

    pub fn kv(&mut self, key: &str, value: impl Display) -> &mut Self {
        self.add(format!("  {key} : {value}"))
    }

    /// A `key : a, b, c` line wrapped onto continuation lines at the box width.
    pub fn add_wrapped<T: Display>(&mut self, key: &str, items: &[T]) -> &mut Self {
        let prefix = format!("  {key} : ");
        let indent = " ".repeat(prefix.len());
        let inner = self.inner_width();
        let mut current = prefix;
        let mut first = true;
        for item in items {
            let piece = if first {
                item.to_string()
            } else {
                format!(", {item}")
            };
            if !first && current.len() + piece.len() > inner {
                self.lines.push(Line::Text(current));
                current = format!("{indent}{}", piece.trim_start_matches(", "));
            } else {
                current.push_str(&piece);
            }
            first = false;
        }
        self.lines.push(Line::Text(current));
        self
    }

    pub fn add_location(&mut self, location: &Location<'_>) -> &mut Self {
        self.kv("Call site", location)
    }

    pub fn add_backtrace(&mut self, backtrace: &Backtrace) -> &mut Self {
        self.add("  Stack trace :");
        for frame in backtrace.to_string().lines() {
            self.add(format!("    {}", frame.trim()));
        }
        self
    }

    fn inner_width(&self) -> usize {
        self.width - 4
    }

    pub fn render(&self) -> String {
        let inner = self.inner_width();
        let border = format!("/{}/", "*".repeat(self.width - 2));
        let mut out = String::new();
        out.push_str(&border);
        out.push('\n');
        for line in &self.lines {
            match line {
                Line::Rule => out.push_str(&border),
                Line::Centred(text) => {
                    out.push_str(&format!("/*{:^inner$}*/", text));
                }
                Line::Text(text) => {
                    out.push_str(&format!("/*{:<inner$}*/", text));
                }
            }
            out.push('\n');
        }
        out.push_str(&border);
        out
    }
}

impl Display for PrettyPrinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Report for a push or pop made while the stack is suspiciously deep.
pub(crate) fn runaway_report(
    action: &str,
    verb: &str,
    state: PhaseState,
    current: &[PhaseState],
    location: &Location<'_>,
    backtrace: Option<&Backtrace>,
) -> PrettyPrinter {
    let mut printer = PrettyPrinter::new(72);
    printer.add(action).centre().hr();
    printer.add("Detecting a runaway phase! A phase may not be completing.");
    printer.kv(&format!("{verb} phase"), state.phase());
    printer.kv(&format!("{verb} state"), state);
    printer.add_wrapped("Current phases", current);
    printer.add_location(location);
    if let Some(trace) = backtrace {
        printer.add_backtrace(trace);
    }
    printer
}

/// Report for a push the current state does not accept.
pub(crate) fn incompatible_report(
    current: PhaseState,
    entering: PhaseState,
    stack: &[PhaseState],
    location: &Location<'_>,
    backtrace: Option<&Backtrace>,
) -> PrettyPrinter {
    let mut printer = PrettyPrinter::new(72);
    printer.add("Switching Phase").centre().hr();
    printer.add("Phase incompatibility detected! Attempting to switch to an invalid phase!");
    printer.kv("Current phase", current.phase());
    printer.kv("Current state", current);
    printer.kv("Entering incompatible phase", entering.phase());
    printer.kv("Entering incompatible state", entering);
    printer.add_wrapped("Current phases", stack);
    printer.add_location(location);
    if let Some(trace) = backtrace {
        printer.add_backtrace(trace);
    }
    printer
}

/// A named group of details inside a [`CrashReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub name: String,
    pub details: Vec<(String, String)>,
}

impl ReportSection {
    pub fn detail(&mut self, key: impl Into<String>, value: impl Display) -> &mut Self {
        self.details.push((key.into(), value.to_string()));
        self
    }
}

/// A fatal failure wrapped with where it happened and what was active.
#[derive(Debug, thiserror::Error)]
#[error("{title}: {cause}")]
pub struct CrashReport {
    title: String,
    sections: Vec<ReportSection>,
    #[source]
    cause: TrackerError,
}

impl CrashReport {
    pub fn new(title: impl Into<String>, cause: TrackerError) -> Self {
        Self {
            title: title.into(),
            sections: Vec::new(),
            cause,
        }
    }

    pub fn section(&mut self, name: impl Into<String>) -> &mut ReportSection {
        self.sections.push(ReportSection {
            name: name.into(),
            details: Vec::new(),
        });
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn sections(&self) -> &[ReportSection] {
        &self.sections
    }

    pub fn cause(&self) -> &TrackerError {
        &self.cause
    }

    /// Look up one detail value by section and key.
    pub fn detail(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .filter(|s| s.name == section)
            .flat_map(|s| s.details.iter())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Render the report, including nested reports from the cause chain.
    pub fn render(&self) -> String {
        let mut printer = PrettyPrinter::new(72);
        printer.add(self.title.clone()).centre().hr();
        for section in &self.sections {
            printer.add(format!("-- {} --", section.name));
            for (key, value) in &section.details {
                printer.kv(key, value);
            }
        }
        printer.kv("Caused by", &self.cause);
        let mut out = printer.render();
        if let TrackerError::Reported(inner) = &self.cause {
            out.push('\n');
            out.push_str(&inner.render());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_boxes_every_line_to_width() {
        let mut printer = PrettyPrinter::new(40);
        printer.add("Title").centre().hr();
        printer.kv("Key", "value");
        let text = printer.render();
        for line in text.lines() {
            assert_eq!(line.chars().count(), 40, "line {line:?}");
        }
        assert!(text.contains("Key : value"));
    }

    #[test]
    fn wrapped_list_splits_long_lines() {
        let items: Vec<String> = (0..20).map(|i| format!("State{i}")).collect();
        let mut printer = PrettyPrinter::new(40);
        printer.add_wrapped("Phases", &items);
        let text = printer.render();
        assert!(text.lines().count() > 3);
        assert!(text.contains("State0"));
        assert!(text.contains("State19"));
    }

    #[test]
    fn crash_report_details_and_source() {
        let mut report = CrashReport::new("Exception while updating neighbours", TrackerError::EmptyStack);
        report
            .section("Block being updated")
            .detail("Block location", "(0, 64, 0)");
        assert_eq!(
            report.detail("Block being updated", "Block location"),
            Some("(0, 64, 0)")
        );
        assert!(matches!(report.cause(), TrackerError::EmptyStack));
        let rendered = report.render();
        assert!(rendered.contains("Exception while updating neighbours"));
        assert!(std::error::Error::source(&report).is_some());
    }
}
