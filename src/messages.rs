//! Messages collected during a run and shown once at the end.

use colored::Colorize;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct Messages {
    timings: Vec<(String, Duration)>,
    skipped: Vec<(String, String)>,
}

impl Messages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_timing(&mut self, name: &str, elapsed: Duration) {
        self.timings.push((name.to_string(), elapsed));
    }

    pub fn record_skip(&mut self, name: &str, reason: &str) {
        self.skipped.push((name.to_string(), reason.to_string()));
    }

    /// Render the summary lines, without printing them
    pub fn render(&self, display_times: bool) -> Vec<String> {
        let mut lines = Vec::new();

        if !self.skipped.is_empty() {
            lines.push(format!(
                "{} Skipped {} formula{}:",
                "⚠".yellow(),
                self.skipped.len(),
                if self.skipped.len() == 1 { "" } else { "e" }
            ));
            for (name, reason) in &self.skipped {
                lines.push(format!("  {} ({})", name.bold(), reason.dimmed()));
            }
        }

        if display_times && !self.timings.is_empty() {
            lines.push(format!("{} Timing", "==>".blue().bold()));
            let width = self.timings.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
            for (name, elapsed) in &self.timings {
                lines.push(format!(
                    "{:width$}: {:.3}s",
                    name,
                    elapsed.as_secs_f64(),
                    width = width
                ));
            }
        }

        lines
    }

    pub fn display(&self, display_times: bool) {
        for line in self.render(display_times) {
            println!("{}", line);
        }
    }
}
