//! Scripted outcomes for driving combinators deterministically.
//!
//! A script is a list of entries such as `ok:1`, `err:timeout@2` or `never`:
//!
//! | Entry | Meaning |
//! |---|---|
//! | `ok:VALUE` | succeed with `VALUE` |
//! | `err:ERROR` | fail with `ERROR` |
//! | `never` | stay pending forever |
//!
//! An optional `@N` suffix completes the entry `N` reactor ticks after it is
//! materialized; without it the entry is already complete. Only an all-digit
//! suffix counts as a delay, so `ok:user@example.com` is a plain value.

use crate::combinator::Generator;
use crate::deferred::Deferred;
use crate::error::{DeferralError, Result};
use crate::reactor::{Reactor, Tick};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// What a scripted entry does when it completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "payload")]
pub enum OutcomeKind {
    /// Succeed with a value
    Succeed(String),
    /// Fail with an error
    Fail(String),
    /// Never complete
    Never,
}

/// One scripted operation.
///
/// # Example
///
/// ```
/// use deferral::script::{OutcomeKind, ScriptedOutcome};
///
/// let entry: ScriptedOutcome = "err:timeout@2".parse().unwrap();
/// assert_eq!(entry.kind, OutcomeKind::Fail("timeout".to_string()));
/// assert_eq!(entry.delay, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedOutcome {
    /// Outcome once complete.
    pub kind: OutcomeKind,
    /// Ticks to wait before completing (0 = already complete).
    pub delay: u32,
}

impl ScriptedOutcome {
    /// An entry that succeeds immediately.
    pub fn succeed(value: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Succeed(value.into()),
            delay: 0,
        }
    }

    /// An entry that fails immediately.
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Fail(error.into()),
            delay: 0,
        }
    }

    /// An entry that never completes.
    #[must_use]
    pub fn never() -> Self {
        Self {
            kind: OutcomeKind::Never,
            delay: 0,
        }
    }

    /// Complete `ticks` reactor ticks after materializing.
    #[must_use]
    pub fn after(mut self, ticks: u32) -> Self {
        self.delay = ticks;
        self
    }

    fn outcome(&self) -> Option<std::result::Result<String, String>> {
        match &self.kind {
            OutcomeKind::Succeed(value) => Some(Ok(value.clone())),
            OutcomeKind::Fail(error) => Some(Err(error.clone())),
            OutcomeKind::Never => None,
        }
    }

    /// Turn the entry into a live deferred, completing on `reactor` if delayed.
    pub fn materialize(&self, reactor: &Rc<dyn Reactor>) -> Deferred<String, String> {
        let Some(outcome) = self.outcome() else {
            return Deferred::new();
        };
        if self.delay == 0 {
            return Deferred::completed(outcome);
        }

        let op = Deferred::new();
        let target = op.clone();
        after_ticks(
            Rc::clone(reactor),
            self.delay,
            Box::new(move || {
                target.complete(outcome);
            }),
        );
        op
    }
}

fn after_ticks(reactor: Rc<dyn Reactor>, ticks: u32, task: Tick) {
    if ticks <= 1 {
        reactor.next_tick(task);
        return;
    }
    let handle = Rc::clone(&reactor);
    reactor.next_tick(Box::new(move || after_ticks(handle, ticks - 1, task)));
}

impl FromStr for ScriptedOutcome {
    type Err = DeferralError;

    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (body, delay) = match trimmed.rsplit_once('@') {
            Some((body, ticks)) if is_delay(ticks) => {
                let delay = ticks.parse::<u32>().map_err(|_| {
                    DeferralError::invalid_outcome(input, format!("invalid delay '{ticks}'"))
                })?;
                (body, delay)
            }
            _ => (trimmed, 0),
        };

        if body == "never" {
            if delay > 0 {
                return Err(DeferralError::invalid_outcome(
                    input,
                    "'never' cannot be delayed",
                ));
            }
            return Ok(Self::never());
        }

        let (kind, payload) = body.split_once(':').ok_or_else(|| {
            DeferralError::invalid_outcome(input, "expected 'ok:VALUE', 'err:ERROR' or 'never'")
        })?;
        if payload.is_empty() {
            return Err(DeferralError::invalid_outcome(input, "missing payload"));
        }

        let entry = match kind {
            "ok" => Self::succeed(payload),
            "err" => Self::fail(payload),
            other => {
                return Err(DeferralError::invalid_outcome(
                    input,
                    format!("unknown kind '{other}'"),
                ))
            }
        };
        Ok(entry.after(delay))
    }
}

fn is_delay(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for ScriptedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payload = match &self.kind {
            OutcomeKind::Succeed(value) => {
                write!(f, "ok:{value}")?;
                value.as_str()
            }
            OutcomeKind::Fail(error) => {
                write!(f, "err:{error}")?;
                error.as_str()
            }
            OutcomeKind::Never => {
                write!(f, "never")?;
                ""
            }
        };
        // A payload like `a@3` needs an explicit delay to read back unchanged.
        let ambiguous = payload
            .rsplit_once('@')
            .is_some_and(|(_, tail)| is_delay(tail));
        if self.delay > 0 || ambiguous {
            write!(f, "@{}", self.delay)?;
        }
        Ok(())
    }
}

/// Parse every entry of a script.
///
/// # Errors
///
/// Returns the first [`DeferralError::InvalidOutcome`] encountered.
pub fn parse_script<S: AsRef<str>>(entries: &[S]) -> Result<Vec<ScriptedOutcome>> {
    entries.iter().map(|entry| entry.as_ref().parse()).collect()
}

/// A generator that replays a script, then reports exhaustion.
pub struct ScriptedGenerator {
    remaining: VecDeque<ScriptedOutcome>,
    reactor: Rc<dyn Reactor>,
    produced: usize,
}

impl fmt::Debug for ScriptedGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedGenerator")
            .field("remaining", &self.remaining)
            .field("produced", &self.produced)
            .finish()
    }
}

impl ScriptedGenerator {
    /// Replay `script` in order, completing delayed entries on `reactor`.
    pub fn new(script: impl IntoIterator<Item = ScriptedOutcome>, reactor: Rc<dyn Reactor>) -> Self {
        Self {
            remaining: script.into_iter().collect(),
            reactor,
            produced: 0,
        }
    }

    /// Number of attempts produced so far.
    #[must_use]
    pub fn produced(&self) -> usize {
        self.produced
    }
}

impl Generator<String, String> for ScriptedGenerator {
    fn next_attempt(&mut self) -> std::result::Result<Deferred<String, String>, String> {
        let entry = self.remaining.pop_front().ok_or_else(|| {
            DeferralError::GeneratorExhausted {
                attempts: self.produced,
            }
            .to_string()
        })?;
        self.produced += 1;
        Ok(entry.materialize(&self.reactor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::DeferredState;
    use crate::reactor::TickQueue;

    #[test]
    fn test_parse_plain_entries() {
        assert_eq!("ok:1".parse::<ScriptedOutcome>().unwrap(), ScriptedOutcome::succeed("1"));
        assert_eq!("err:e".parse::<ScriptedOutcome>().unwrap(), ScriptedOutcome::fail("e"));
        assert_eq!("never".parse::<ScriptedOutcome>().unwrap(), ScriptedOutcome::never());
    }

    #[test]
    fn test_parse_delay_and_payload_with_colon() {
        let entry: ScriptedOutcome = "ok:a:b@3".parse().unwrap();
        assert_eq!(entry, ScriptedOutcome::succeed("a:b").after(3));
    }

    #[test]
    fn test_parse_rejects_bad_entries() {
        for bad in ["maybe:1", "ok:", "ok", "err:x@99999999999", "never@2", "@3", ""] {
            let err = bad.parse::<ScriptedOutcome>().unwrap_err();
            assert!(
                matches!(err, DeferralError::InvalidOutcome { .. }),
                "expected InvalidOutcome for {bad:?}"
            );
        }
    }

    #[test]
    fn test_parse_at_sign_in_payload() {
        let entry: ScriptedOutcome = "ok:user@example.com".parse().unwrap();
        assert_eq!(entry, ScriptedOutcome::succeed("user@example.com"));

        let entry: ScriptedOutcome = "err:x@soon".parse().unwrap();
        assert_eq!(entry, ScriptedOutcome::fail("x@soon"));

        let entry: ScriptedOutcome = "ok:user@example.com@2".parse().unwrap();
        assert_eq!(entry, ScriptedOutcome::succeed("user@example.com").after(2));
    }

    #[test]
    fn test_display_round_trips_notation() {
        for text in ["ok:1", "err:boom@2", "never", "ok:user@example.com"] {
            let entry: ScriptedOutcome = text.parse().unwrap();
            assert_eq!(entry.to_string(), text);
        }
    }

    #[test]
    fn test_display_disambiguates_numeric_at_suffix() {
        let entry = ScriptedOutcome::succeed("a@3");
        assert_eq!(entry.to_string(), "ok:a@3@0");
        assert_eq!(entry.to_string().parse::<ScriptedOutcome>().unwrap(), entry);
    }

    #[test]
    fn test_parse_script_reports_first_error() {
        let err = parse_script(&["ok:1", "bogus", "err:x"]).unwrap_err();
        assert!(err.to_string().contains("bogus"));
        assert_eq!(parse_script(&["ok:1", "err:x"]).unwrap().len(), 2);
    }

    #[test]
    fn test_materialize_immediate_and_never() {
        let reactor: Rc<dyn Reactor> = Rc::new(TickQueue::new());
        assert_eq!(
            ScriptedOutcome::succeed("v").materialize(&reactor).outcome(),
            Some(Ok("v".to_string()))
        );
        assert_eq!(
            ScriptedOutcome::never().materialize(&reactor).state(),
            DeferredState::Pending
        );
    }

    #[test]
    fn test_materialize_delayed_completes_after_ticks() {
        let queue = Rc::new(TickQueue::new());
        let reactor: Rc<dyn Reactor> = queue.clone();
        let op = ScriptedOutcome::fail("late").after(2).materialize(&reactor);

        assert!(queue.turn());
        assert!(op.is_pending());
        assert!(queue.turn());
        assert_eq!(op.outcome(), Some(Err("late".to_string())));
    }

    #[test]
    fn test_scripted_generator_exhausts() {
        let reactor: Rc<dyn Reactor> = Rc::new(TickQueue::new());
        let mut generator = ScriptedGenerator::new(vec![ScriptedOutcome::succeed("1")], reactor);

        assert!(generator.next_attempt().is_ok());
        let err = generator.next_attempt().unwrap_err();
        assert_eq!(err, "Generator exhausted after 1 attempts");
        assert_eq!(generator.produced(), 1);
    }
}
