//! Join: combine a fixed collection of deferreds.
//!
//! All operations are registered at once, in construction order, without
//! waiting between registrations. Outcomes are recorded in the order the
//! operations actually complete, which need not match registration order.
//!
//! # Example
//!
//! ```
//! use deferral::{Deferred, Join};
//!
//! let ops: Vec<Deferred<i32, String>> = vec![
//!     Deferred::succeeded(1),
//!     Deferred::failed("e".to_string()),
//!     Deferred::succeeded(3),
//! ];
//!
//! let join = Join::in_parallel(ops);
//! assert_eq!(
//!     join.deferred().outcome(),
//!     Some(Ok((vec![1, 3], vec!["e".to_string()])))
//! );
//! ```

use super::base::{Accumulator, Base};
use super::{private, Completion};
use crate::deferred::Deferred;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

// ============================================================================
// Policies
// ============================================================================

/// Succeed with the first value observed. Never fails on its own.
///
/// If every operation fails, the join never completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirstSuccess;

impl private::Sealed for FirstSuccess {}

impl<T: Clone, E> Completion<T, E> for FirstSuccess {
    const NAME: &'static str = "first_success";
    type Output = T;

    fn is_done(&self, results: &Accumulator<T, E>) -> bool {
        !results.successes().is_empty()
    }

    fn resolve(&self, results: &Accumulator<T, E>) -> Result<T, E> {
        Ok(results.successes()[0].clone())
    }
}

/// Wait for every operation, then succeed with `(successes, failures)`.
///
/// Never fails. If any operation never completes, neither does the join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InParallel {
    expected: usize,
}

impl InParallel {
    /// Policy for a join over `expected` operations.
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self { expected }
    }

    /// Number of operations the join waits for.
    #[must_use]
    pub fn expected(&self) -> usize {
        self.expected
    }
}

impl private::Sealed for InParallel {}

impl<T: Clone, E: Clone> Completion<T, E> for InParallel {
    const NAME: &'static str = "in_parallel";
    type Output = (Vec<T>, Vec<E>);

    fn is_done(&self, results: &Accumulator<T, E>) -> bool {
        results.completed() >= self.expected
    }

    fn resolve(&self, results: &Accumulator<T, E>) -> Result<Self::Output, E> {
        Ok(results.clone().into_parts())
    }
}

// ============================================================================
// Join
// ============================================================================

/// A combinator over operations known up front.
pub struct Join<T, E, C>
where
    C: Completion<T, E>,
{
    base: Rc<Base<T, E, C>>,
    operations: Vec<Deferred<T, E>>,
}

impl<T, E, C> fmt::Debug for Join<T, E, C>
where
    T: fmt::Debug,
    E: fmt::Debug,
    C: Completion<T, E> + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Join")
            .field("base", &self.base)
            .field("operations", &self.operations.len())
            .finish()
    }
}

impl<T, E> Join<T, E, FirstSuccess>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Succeed with whichever operation succeeds first.
    pub fn first_success(operations: impl IntoIterator<Item = Deferred<T, E>>) -> Self {
        Self::start(FirstSuccess, operations.into_iter().collect())
    }
}

impl<T, E> Join<T, E, InParallel>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Wait for all operations and report both outcome lists.
    pub fn in_parallel(operations: impl IntoIterator<Item = Deferred<T, E>>) -> Self {
        let operations: Vec<_> = operations.into_iter().collect();
        Self::start(InParallel::new(operations.len()), operations)
    }
}

impl<T, E, C> Join<T, E, C>
where
    T: Clone + 'static,
    E: Clone + 'static,
    C: Completion<T, E> + 'static,
    C::Output: 'static,
{
    fn start(policy: C, operations: Vec<Deferred<T, E>>) -> Self {
        let join = Self {
            base: Base::new(policy),
            operations,
        };
        join.setup();
        join
    }

    fn setup(&self) {
        if self.base.check_completion() {
            debug!(policy = C::NAME, "Join satisfied before registering operations");
            return;
        }

        debug!(
            policy = C::NAME,
            operations = self.operations.len(),
            "Registering join operations"
        );
        for op in &self.operations {
            self.base.register_attempt(op.clone());
        }
    }
}

impl<T, E, C> Join<T, E, C>
where
    C: Completion<T, E>,
{
    /// The join's own deferred.
    #[must_use]
    pub fn deferred(&self) -> &Deferred<C::Output, E> {
        self.base.deferred()
    }

    /// Consume the join, keeping only its deferred.
    #[must_use]
    pub fn into_deferred(self) -> Deferred<C::Output, E> {
        self.base.deferred().clone()
    }

    /// The operations supplied at construction, in order.
    #[must_use]
    pub fn operations(&self) -> &[Deferred<T, E>] {
        &self.operations
    }

    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if the join was built from no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Check if the completion policy has fired.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.base.is_finished()
    }

    /// Values observed so far, including those after the join finished.
    #[must_use]
    pub fn successes(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.base.successes()
    }

    /// Errors observed so far, including those after the join finished.
    #[must_use]
    pub fn failures(&self) -> Vec<E>
    where
        E: Clone,
    {
        self.base.failures()
    }

    /// Snapshot of every outcome observed so far.
    #[must_use]
    pub fn results(&self) -> Accumulator<T, E>
    where
        T: Clone,
        E: Clone,
    {
        self.base.results()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::DeferredState;
    use std::cell::Cell;

    fn pending(n: usize) -> Vec<Deferred<i32, String>> {
        (0..n).map(|_| Deferred::new()).collect()
    }

    // =========================================================================
    // FirstSuccess
    // =========================================================================

    #[test]
    fn test_first_success_takes_first_completed_not_first_registered() {
        let ops = pending(3);
        let join = Join::first_success(ops.clone());

        ops[2].succeed(30);
        ops[0].succeed(10);

        assert_eq!(join.deferred().outcome(), Some(Ok(30)));
        assert_eq!(join.successes(), vec![30, 10]);
    }

    #[test]
    fn test_first_success_ignores_failures_before_success() {
        let ops = pending(3);
        let join = Join::first_success(ops.clone());

        ops[0].fail("a".into());
        ops[1].fail("b".into());
        assert!(join.deferred().is_pending());

        ops[2].succeed(3);
        assert_eq!(join.deferred().outcome(), Some(Ok(3)));
        assert_eq!(join.failures(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_first_success_never_completes_when_all_fail() {
        let ops = pending(2);
        let join = Join::first_success(ops.clone());

        ops[0].fail("a".into());
        ops[1].fail("b".into());

        assert_eq!(join.deferred().state(), DeferredState::Pending);
        assert!(!join.is_finished());
        assert_eq!(join.failures().len(), 2);
    }

    #[test]
    fn test_first_success_with_no_operations_stays_pending() {
        let join: Join<i32, String, _> = Join::first_success(Vec::new());
        assert!(join.is_empty());
        assert!(join.deferred().is_pending());
    }

    #[test]
    fn test_first_success_pre_completed_finishes_during_construction() {
        let join: Join<i32, String, _> =
            Join::first_success(vec![Deferred::failed("x".into()), Deferred::succeeded(2)]);
        assert_eq!(join.deferred().outcome(), Some(Ok(2)));
    }

    // =========================================================================
    // InParallel
    // =========================================================================

    #[test]
    fn test_in_parallel_pre_completed_scenario() {
        let join: Join<i32, String, _> = Join::in_parallel(vec![
            Deferred::succeeded(1),
            Deferred::failed("e".into()),
            Deferred::succeeded(3),
        ]);

        assert_eq!(
            join.deferred().outcome(),
            Some(Ok((vec![1, 3], vec!["e".to_string()])))
        );
    }

    #[test]
    fn test_in_parallel_with_no_operations_finishes_immediately() {
        let join: Join<i32, String, _> = Join::in_parallel(Vec::new());
        assert!(join.is_finished());
        assert_eq!(join.deferred().outcome(), Some(Ok((vec![], vec![]))));
    }

    #[test]
    fn test_in_parallel_waits_for_every_operation() {
        let ops = pending(3);
        let join = Join::in_parallel(ops.clone());

        ops[1].fail("b".into());
        ops[0].succeed(0);
        assert!(join.deferred().is_pending());

        ops[2].fail("c".into());
        assert_eq!(
            join.deferred().outcome(),
            Some(Ok((vec![0], vec!["b".to_string(), "c".to_string()])))
        );
    }

    #[test]
    fn test_in_parallel_never_fails_even_when_all_fail() {
        let join: Join<i32, String, _> =
            Join::in_parallel(vec![Deferred::failed("a".into()), Deferred::failed("b".into())]);
        assert_eq!(join.deferred().state(), DeferredState::Succeeded);
    }

    #[test]
    fn test_in_parallel_stays_pending_on_never_completing_operation() {
        let ops = pending(2);
        let join = Join::in_parallel(ops.clone());
        ops[0].succeed(1);
        assert!(join.deferred().is_pending());
        assert_eq!(join.results().completed(), 1);
    }

    // =========================================================================
    // Idempotence
    // =========================================================================

    #[test]
    fn test_late_outcomes_recorded_without_second_finish() {
        let ops = pending(3);
        let join = Join::first_success(ops.clone());

        let finishes = Rc::new(Cell::new(0));
        let f = Rc::clone(&finishes);
        join.deferred().on_complete(move |_| f.set(f.get() + 1));

        ops[1].succeed(1);
        ops[0].fail("late".into());
        ops[2].succeed(2);

        assert_eq!(finishes.get(), 1);
        assert_eq!(join.deferred().outcome(), Some(Ok(1)));
        assert_eq!(join.successes(), vec![1, 2]);
        assert_eq!(join.failures(), vec!["late".to_string()]);
    }

    #[test]
    fn test_operations_kept_in_construction_order() {
        let ops = pending(2);
        let join = Join::in_parallel(ops.clone());
        assert_eq!(join.len(), 2);
        assert!(join.operations()[0].ptr_eq(&ops[0]));
        assert!(join.operations()[1].ptr_eq(&ops[1]));
    }

    #[test]
    fn test_into_deferred_outlives_join() {
        let ops = pending(1);
        let deferred = Join::first_success(ops.clone()).into_deferred();
        ops[0].succeed(4);
        assert_eq!(deferred.outcome(), Some(Ok(4)));
    }
}
