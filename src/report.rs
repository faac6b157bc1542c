//! Reports describing how a combinator run ended.

use crate::combinator::Accumulator;
use crate::deferred::{Deferred, DeferredState};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Outcome of running one combinator over a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Policy name, e.g. `first_success`.
    pub combinator: String,
    /// Scheduling strategy used (loops only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduling: Option<String>,
    /// Final state of the combinator's deferred.
    pub status: DeferredState,
    /// Success value, for combinators that succeed with a single value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Failure error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Every success observed, in completion order.
    pub successes: Vec<String>,
    /// Every failure observed, in completion order.
    pub failures: Vec<String>,
    /// Generator invocations (loops only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_calls: Option<usize>,
    /// Reactor ticks executed.
    pub ticks: u64,
}

impl Report {
    /// Build a report from a finished (or stuck) combinator.
    ///
    /// `describe` turns the combinator's success output into the reported
    /// value; return `None` for outputs that are already covered by the
    /// success and failure lists.
    pub fn from_combinator<O>(
        combinator: &str,
        deferred: &Deferred<O, String>,
        results: Accumulator<String, String>,
        describe: impl FnOnce(O) -> Option<String>,
    ) -> Self
    where
        O: Clone + 'static,
    {
        let (value, error) = match deferred.outcome() {
            Some(Ok(output)) => (describe(output), None),
            Some(Err(error)) => (None, Some(error)),
            None => (None, None),
        };
        let (successes, failures) = results.into_parts();

        Self {
            combinator: combinator.to_string(),
            scheduling: None,
            status: deferred.state(),
            value,
            error,
            successes,
            failures,
            generator_calls: None,
            ticks: 0,
        }
    }

    /// Record the scheduling strategy.
    #[must_use]
    pub fn with_scheduling(mut self, scheduling: impl Into<String>) -> Self {
        self.scheduling = Some(scheduling.into());
        self
    }

    /// Record the generator call count.
    #[must_use]
    pub fn with_generator_calls(mut self, calls: usize) -> Self {
        self.generator_calls = Some(calls);
        self
    }

    /// Record the reactor tick count.
    #[must_use]
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Coloured multi-line summary for terminals.
    #[must_use]
    pub fn render_text(&self) -> String {
        let status = match self.status {
            DeferredState::Succeeded => self.status.to_string().green().bold(),
            DeferredState::Failed => self.status.to_string().red().bold(),
            DeferredState::Pending => self.status.to_string().yellow().bold(),
        };

        let mut out = format!("{} {}", self.combinator.bold(), status);
        if let Some(value) = &self.value {
            let _ = write!(out, ": {value}");
        }
        if let Some(error) = &self.error {
            let _ = write!(out, ": {}", error.red());
        }
        out.push('\n');

        let _ = writeln!(out, "  successes: [{}]", self.successes.join(", "));
        let _ = writeln!(out, "  failures:  [{}]", self.failures.join(", "));
        if let Some(scheduling) = &self.scheduling {
            let _ = writeln!(out, "  scheduling: {scheduling}");
        }
        if let Some(calls) = self.generator_calls {
            let _ = writeln!(out, "  generator calls: {calls}");
        }
        let _ = writeln!(out, "  ticks: {}", self.ticks);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulator(successes: &[&str], failures: &[&str]) -> Accumulator<String, String> {
        let mut acc = Accumulator::new();
        for s in successes {
            acc.record_success((*s).to_string());
        }
        for f in failures {
            acc.record_failure((*f).to_string());
        }
        acc
    }

    #[test]
    fn test_report_from_succeeded_deferred() {
        let deferred: Deferred<String, String> = Deferred::succeeded("7".into());
        let report = Report::from_combinator(
            "until_success",
            &deferred,
            accumulator(&["7"], &["a", "b"]),
            Some,
        )
        .with_generator_calls(3);

        assert_eq!(report.status, DeferredState::Succeeded);
        assert_eq!(report.value.as_deref(), Some("7"));
        assert_eq!(report.error, None);
        assert_eq!(report.failures, vec!["a", "b"]);
        assert_eq!(report.generator_calls, Some(3));
    }

    #[test]
    fn test_report_from_pending_deferred() {
        let deferred: Deferred<String, String> = Deferred::new();
        let report =
            Report::from_combinator("first_success", &deferred, accumulator(&[], &["x"]), Some);
        assert_eq!(report.status, DeferredState::Pending);
        assert_eq!(report.value, None);
        assert_eq!(report.error, None);
    }

    #[test]
    fn test_report_json_shape() {
        let deferred: Deferred<String, String> = Deferred::failed("boom".into());
        let report = Report::from_combinator("until_failure", &deferred, accumulator(&[], &["boom"]), Some)
            .with_scheduling("next-tick")
            .with_ticks(1);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"status\": \"failed\""));
        assert!(json.contains("\"error\": \"boom\""));
        assert!(json.contains("\"scheduling\": \"next-tick\""));
        assert!(!json.contains("\"value\""));
    }

    #[test]
    fn test_render_text_mentions_lists() {
        colored::control::set_override(false);
        let deferred: Deferred<String, String> = Deferred::succeeded("1".into());
        let text = Report::from_combinator("first_success", &deferred, accumulator(&["1", "3"], &["e"]), Some)
            .render_text();
        assert!(text.starts_with("first_success succeeded: 1"));
        assert!(text.contains("successes: [1, 3]"));
        assert!(text.contains("failures:  [e]"));
    }
}
