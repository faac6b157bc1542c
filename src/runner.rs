//! Run combinators over scripted outcomes on a fresh [`TickQueue`].
//!
//! Each run creates its own queue, builds the combinator while the queue is
//! marked running, drains every tick, then reports where the combinator
//! ended up. Combinators that can never complete are reported as pending.

use crate::combinator::{Completion, FirstSuccess, InParallel, Join, Loop, Scheduling};
use crate::config::CombinatorConfig;
use crate::error::Result;
use crate::reactor::{Reactor, TickQueue};
use crate::report::Report;
use crate::script::{ScriptedGenerator, ScriptedOutcome};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::info;

/// Join policies selectable from the command line.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinPolicy {
    /// Succeed with the first success
    FirstSuccess,
    /// Wait for every operation
    InParallel,
}

/// Loop policies selectable from the command line.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopPolicy {
    /// Retry until an attempt succeeds
    UntilSuccess,
    /// Repeat until an attempt fails
    UntilFailure,
}

/// Executes scripted combinator runs under a configuration.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: CombinatorConfig,
}

impl Runner {
    /// Create a runner.
    #[must_use]
    pub fn new(config: CombinatorConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &CombinatorConfig {
        &self.config
    }

    /// Join every scripted operation under `policy`.
    #[must_use]
    pub fn join(&self, policy: JoinPolicy, script: &[ScriptedOutcome]) -> Report {
        let queue = Rc::new(TickQueue::new());
        let reactor: Rc<dyn Reactor> = queue.clone();

        let report = match policy {
            JoinPolicy::FirstSuccess => {
                let join = queue.enter(|| {
                    Join::first_success(script.iter().map(|entry| entry.materialize(&reactor)))
                });
                Report::from_combinator(
                    <FirstSuccess as Completion<String, String>>::NAME,
                    join.deferred(),
                    join.results(),
                    Some,
                )
            }
            JoinPolicy::InParallel => {
                let join = queue.enter(|| {
                    Join::in_parallel(script.iter().map(|entry| entry.materialize(&reactor)))
                });
                Report::from_combinator(
                    <InParallel as Completion<String, String>>::NAME,
                    join.deferred(),
                    join.results(),
                    |_| None,
                )
            }
        };

        let report = report.with_ticks(queue.ticks());
        info!(combinator = %report.combinator, status = %report.status, "Join run complete");
        report
    }

    /// Loop over the script under `policy`, one entry per generator call.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured scheduling mode cannot be satisfied.
    pub fn repeat(&self, policy: LoopPolicy, script: &[ScriptedOutcome]) -> Result<Report> {
        let queue = Rc::new(TickQueue::new());
        let reactor: Rc<dyn Reactor> = queue.clone();

        let report = match policy {
            LoopPolicy::UntilSuccess => {
                let (repeat, strategy) =
                    self.start_loop(&queue, &reactor, script, Loop::until_success)?;
                loop_report(&repeat, strategy)
            }
            LoopPolicy::UntilFailure => {
                let (repeat, strategy) =
                    self.start_loop(&queue, &reactor, script, Loop::until_failure)?;
                loop_report(&repeat, strategy)
            }
        };

        let report = report.with_ticks(queue.ticks());
        info!(combinator = %report.combinator, status = %report.status, "Loop run complete");
        Ok(report)
    }

    fn start_loop<C>(
        &self,
        queue: &TickQueue,
        reactor: &Rc<dyn Reactor>,
        script: &[ScriptedOutcome],
        build: impl FnOnce(ScriptedGenerator, Scheduling) -> Loop<String, String, C>,
    ) -> Result<(Loop<String, String, C>, &'static str)>
    where
        C: Completion<String, String>,
    {
        queue.enter(|| {
            let scheduling =
                Scheduling::from_mode(self.config.scheduling, Some(Rc::clone(reactor)))?;
            let strategy = if scheduling.is_inline() {
                "inline"
            } else {
                "next-tick"
            };
            let generator = ScriptedGenerator::new(script.to_vec(), Rc::clone(reactor));
            Ok((build(generator, scheduling), strategy))
        })
    }
}

fn loop_report<C>(repeat: &Loop<String, String, C>, strategy: &str) -> Report
where
    C: Completion<String, String, Output = String>,
{
    Report::from_combinator(C::NAME, repeat.deferred(), repeat.results(), Some)
        .with_scheduling(strategy)
        .with_generator_calls(repeat.generator_calls())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulingMode;
    use crate::deferred::DeferredState;
    use crate::script::parse_script;

    fn script(entries: &[&str]) -> Vec<ScriptedOutcome> {
        parse_script(entries).unwrap()
    }

    #[test]
    fn test_join_in_parallel_pre_completed() {
        let report = Runner::default().join(
            JoinPolicy::InParallel,
            &script(&["ok:1", "err:e", "ok:3"]),
        );
        assert_eq!(report.combinator, "in_parallel");
        assert_eq!(report.status, DeferredState::Succeeded);
        assert_eq!(report.successes, vec!["1", "3"]);
        assert_eq!(report.failures, vec!["e"]);
        assert_eq!(report.value, None);
        assert_eq!(report.ticks, 0);
    }

    #[test]
    fn test_join_first_success_follows_completion_order() {
        let report = Runner::default().join(
            JoinPolicy::FirstSuccess,
            &script(&["ok:slow@3", "err:x@1", "ok:fast@2"]),
        );
        assert_eq!(report.value.as_deref(), Some("fast"));
        assert_eq!(report.successes, vec!["fast", "slow"]);
        assert_eq!(report.failures, vec!["x"]);
        assert_eq!(report.ticks, 3);
    }

    #[test]
    fn test_join_first_success_all_failing_is_pending() {
        let report = Runner::default().join(JoinPolicy::FirstSuccess, &script(&["err:a", "err:b"]));
        assert_eq!(report.status, DeferredState::Pending);
        assert_eq!(report.failures.len(), 2);
    }

    #[test]
    fn test_loop_until_success_with_auto_scheduling_uses_ticks() {
        let report = Runner::default()
            .repeat(LoopPolicy::UntilSuccess, &script(&["err:a", "err:b", "ok:7"]))
            .unwrap();
        assert_eq!(report.value.as_deref(), Some("7"));
        assert_eq!(report.generator_calls, Some(3));
        assert_eq!(report.scheduling.as_deref(), Some("next-tick"));
        assert_eq!(report.ticks, 3);
    }

    #[test]
    fn test_loop_inline_runs_without_ticks() {
        let runner =
            Runner::new(CombinatorConfig::default().with_scheduling(SchedulingMode::Inline));
        let report = runner
            .repeat(LoopPolicy::UntilSuccess, &script(&["err:a", "err:b", "ok:7"]))
            .unwrap();
        assert_eq!(report.value.as_deref(), Some("7"));
        assert_eq!(report.scheduling.as_deref(), Some("inline"));
        assert_eq!(report.ticks, 0);
    }

    #[test]
    fn test_loop_inline_with_delayed_attempt() {
        let runner =
            Runner::new(CombinatorConfig::default().with_scheduling(SchedulingMode::Inline));
        let report = runner
            .repeat(LoopPolicy::UntilFailure, &script(&["ok:1@2", "err:stop"]))
            .unwrap();
        assert_eq!(report.status, DeferredState::Failed);
        assert_eq!(report.error.as_deref(), Some("stop"));
        assert_eq!(report.generator_calls, Some(2));
        assert_eq!(report.ticks, 2);
    }

    #[test]
    fn test_loop_exhausted_script_fails() {
        let report = Runner::default()
            .repeat(LoopPolicy::UntilSuccess, &script(&["err:a"]))
            .unwrap();
        assert_eq!(report.status, DeferredState::Failed);
        assert_eq!(
            report.error.as_deref(),
            Some("Generator exhausted after 1 attempts")
        );
        assert_eq!(report.generator_calls, Some(2));
    }

    #[test]
    fn test_loop_never_entry_stays_pending() {
        let report = Runner::default()
            .repeat(LoopPolicy::UntilSuccess, &script(&["err:a", "never", "ok:1"]))
            .unwrap();
        assert_eq!(report.status, DeferredState::Pending);
        assert_eq!(report.generator_calls, Some(2));
    }
}
