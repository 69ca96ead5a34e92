//! Outcome collection and the printed summary

use std::time::Duration;

use colored::Colorize;

/// Result of one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    name: String,
    passed: bool,
    message: String,
    duration: Duration,
}

impl TestOutcome {
    pub fn new(
        name: impl Into<String>,
        passed: bool,
        message: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            passed,
            message: message.into(),
            duration,
        }
    }

    pub fn pass(name: impl Into<String>, message: impl Into<String>, duration: Duration) -> Self {
        Self::new(name, true, message, duration)
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>, duration: Duration) -> Self {
        Self::new(name, false, message, duration)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// `NAME (1.23s)`, without the marker
    pub fn headline(&self) -> String {
        if self.duration.is_zero() {
            self.name.clone()
        } else {
            format!("{} ({:.2}s)", self.name, self.duration.as_secs_f64())
        }
    }
}

/// Pass/fail tally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl Summary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Append-only collection of outcomes in invocation order
#[derive(Debug, Default)]
pub struct Reporter {
    outcomes: Vec<TestOutcome>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: TestOutcome) {
        tracing::debug!(
            "Recorded {} ({})",
            outcome.name(),
            if outcome.passed() { "pass" } else { "fail" }
        );
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    pub fn summary(&self) -> Summary {
        let passed = self.outcomes.iter().filter(|o| o.passed()).count();
        Summary {
            total: self.outcomes.len(),
            passed,
            failed: self.outcomes.len() - passed,
        }
    }

    /// Print one line per outcome followed by the tally
    pub fn print_results(&self) {
        let rule = "=".repeat(50);
        println!("{}", rule);
        println!("{}", "Integration Test Results".bold());
        println!("{}", rule);

        for outcome in &self.outcomes {
            let marker = if outcome.passed() {
                "✓ PASS".green().bold()
            } else {
                "✗ FAIL".red().bold()
            };
            println!("{} {}", marker, outcome.headline());
            if !outcome.message().is_empty() {
                println!("    {}", outcome.message().dimmed());
            }
        }

        let summary = self.summary();
        println!("{}", "-".repeat(50));
        println!("{}", tally_line(&summary));

        if summary.all_passed() {
            println!("{}", "All integration tests passed!".green().bold());
        } else {
            println!(
                "{}",
                format!(
                    "{} test(s) failed. Please review the results above.",
                    summary.failed
                )
                .yellow()
                .bold()
            );
        }
    }
}

pub fn tally_line(summary: &Summary) -> String {
    format!(
        "Total: {}, Passed: {}, Failed: {}",
        summary.total, summary.passed, summary.failed
    )
}
