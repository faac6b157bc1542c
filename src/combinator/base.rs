//! Result accumulation shared by every combinator.
//!
//! A [`Base`] owns the combinator's own [`Deferred`], the [`Accumulator`] of
//! observed outcomes, and the completion policy. Attempts are wired in
//! through [`Base::register_attempt`]; every outcome is appended in the
//! order it is observed and then the policy is consulted. The first time the
//! policy reports done, the combinator's deferred is completed. That happens
//! at most once, however many attempts complete afterwards.

use super::Completion;
use crate::deferred::Deferred;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Outcomes observed by a combinator, each list in completion order.
///
/// Append-only for the lifetime of the combinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accumulator<T, E> {
    successes: Vec<T>,
    failures: Vec<E>,
}

impl<T, E> Default for Accumulator<T, E> {
    fn default() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T, E> Accumulator<T, E> {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Values of successful attempts.
    #[must_use]
    pub fn successes(&self) -> &[T] {
        &self.successes
    }

    /// Errors of failed attempts.
    #[must_use]
    pub fn failures(&self) -> &[E] {
        &self.failures
    }

    /// Number of attempts that reached a terminal state.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Check if no outcome has been observed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed() == 0
    }

    /// Split into `(successes, failures)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<T>, Vec<E>) {
        (self.successes, self.failures)
    }

    pub(crate) fn record_success(&mut self, value: T) {
        self.successes.push(value);
    }

    pub(crate) fn record_failure(&mut self, error: E) {
        self.failures.push(error);
    }
}

/// Shared combinator state: policy, accumulator and the derived deferred.
pub struct Base<T, E, C>
where
    C: Completion<T, E>,
{
    policy: C,
    results: RefCell<Accumulator<T, E>>,
    deferred: Deferred<C::Output, E>,
    finished: Cell<bool>,
    registered: Cell<usize>,
}

impl<T, E, C> fmt::Debug for Base<T, E, C>
where
    T: fmt::Debug,
    E: fmt::Debug,
    C: Completion<T, E> + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Base")
            .field("policy", &self.policy)
            .field("results", &*self.results.borrow())
            .field("state", &self.deferred.state())
            .field("finished", &self.finished.get())
            .field("registered", &self.registered.get())
            .finish()
    }
}

impl<T, E, C> Base<T, E, C>
where
    T: Clone + 'static,
    E: Clone + 'static,
    C: Completion<T, E> + 'static,
    C::Output: 'static,
{
    /// Create combinator state with an empty accumulator and a pending deferred.
    #[must_use]
    pub fn new(policy: C) -> Rc<Self> {
        Rc::new(Self {
            policy,
            results: RefCell::new(Accumulator::new()),
            deferred: Deferred::new(),
            finished: Cell::new(false),
            registered: Cell::new(0),
        })
    }

    /// Watch `op`: record its outcome, then re-check the completion policy.
    ///
    /// Returns `op` unchanged.
    pub fn register_attempt(self: &Rc<Self>, op: Deferred<T, E>) -> Deferred<T, E> {
        let attempt = self.registered.get() + 1;
        self.registered.set(attempt);
        debug!(attempt, policy = C::NAME, "Registering attempt");

        let base = Rc::clone(self);
        op.on_success(move |value| {
            base.results.borrow_mut().record_success(value.clone());
            base.check_completion();
        });

        let base = Rc::clone(self);
        op.on_failure(move |error| {
            base.results.borrow_mut().record_failure(error.clone());
            base.check_completion();
        });

        op
    }

    /// Finish if the policy is satisfied and the combinator has not finished.
    ///
    /// Returns `true` only on the call that finished the combinator.
    pub fn check_completion(&self) -> bool {
        if self.finished.get() || !self.deferred.is_pending() {
            return false;
        }

        let outcome = {
            let results = self.results.borrow();
            if !self.policy.is_done(&results) {
                return false;
            }
            self.policy.resolve(&results)
        };

        self.finish(outcome);
        true
    }

    /// Fail the combinator directly, bypassing the policy.
    ///
    /// Returns `false` if the combinator had already completed.
    pub fn fail(&self, error: E) -> bool {
        if !self.deferred.is_pending() {
            return false;
        }
        self.finished.set(true);
        self.deferred.fail(error)
    }

    fn finish(&self, outcome: Result<C::Output, E>) {
        self.finished.set(true);
        debug!(
            policy = C::NAME,
            succeeded = outcome.is_ok(),
            attempts = self.registered.get(),
            "Combinator finished"
        );
        self.deferred.complete(outcome);
    }
}

impl<T, E, C> Base<T, E, C>
where
    C: Completion<T, E>,
{
    /// The combinator's own deferred.
    #[must_use]
    pub fn deferred(&self) -> &Deferred<C::Output, E> {
        &self.deferred
    }

    /// The completion policy.
    #[must_use]
    pub fn policy(&self) -> &C {
        &self.policy
    }

    /// Check if the policy has already fired.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    /// Number of attempts registered so far.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.registered.get()
    }

    /// Snapshot of the values observed so far.
    #[must_use]
    pub fn successes(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.results.borrow().successes().to_vec()
    }

    /// Snapshot of the errors observed so far.
    #[must_use]
    pub fn failures(&self) -> Vec<E>
    where
        E: Clone,
    {
        self.results.borrow().failures().to_vec()
    }

    /// Snapshot of the whole accumulator.
    #[must_use]
    pub fn results(&self) -> Accumulator<T, E>
    where
        T: Clone,
        E: Clone,
    {
        self.results.borrow().clone()
    }
}
