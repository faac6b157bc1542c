//! Custom assertions for deferred outcomes.

use crate::deferred::{Deferred, DeferredState};
use std::fmt::Debug;

/// Assert that a deferred succeeded with `expected`.
///
/// # Panics
///
/// Panics with the actual state if the deferred is pending, failed, or
/// succeeded with a different value.
///
/// # Example
///
/// ```rust
/// use deferral::testing::assert_succeeded_with;
/// use deferral::Deferred;
///
/// let op: Deferred<i32, String> = Deferred::succeeded(3);
/// assert_succeeded_with(&op, &3);
/// ```
pub fn assert_succeeded_with<T, E>(deferred: &Deferred<T, E>, expected: &T)
where
    T: Clone + Debug + PartialEq,
    E: Clone + Debug,
{
    match deferred.outcome() {
        Some(Ok(value)) => assert_eq!(
            &value, expected,
            "Deferred succeeded with an unexpected value"
        ),
        Some(Err(error)) => panic!("Expected success with {expected:?}, but failed with {error:?}"),
        None => panic!("Expected success with {expected:?}, but still pending"),
    }
}

/// Assert that a deferred failed with `expected`.
///
/// # Panics
///
/// Panics with the actual state if the deferred is pending, succeeded, or
/// failed with a different error.
pub fn assert_failed_with<T, E>(deferred: &Deferred<T, E>, expected: &E)
where
    T: Clone + Debug,
    E: Clone + Debug + PartialEq,
{
    match deferred.outcome() {
        Some(Err(error)) => assert_eq!(
            &error, expected,
            "Deferred failed with an unexpected error"
        ),
        Some(Ok(value)) => panic!("Expected failure with {expected:?}, but succeeded with {value:?}"),
        None => panic!("Expected failure with {expected:?}, but still pending"),
    }
}

/// Assert that a deferred has not completed.
///
/// # Panics
///
/// Panics if the deferred has succeeded or failed.
pub fn assert_pending<T, E>(deferred: &Deferred<T, E>) {
    assert_eq!(
        deferred.state(),
        DeferredState::Pending,
        "Expected deferred to be pending"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_succeeded_with_passes() {
        let op: Deferred<i32, String> = Deferred::succeeded(1);
        assert_succeeded_with(&op, &1);
    }

    #[test]
    #[should_panic(expected = "still pending")]
    fn test_assert_succeeded_with_pending_panics() {
        let op: Deferred<i32, String> = Deferred::new();
        assert_succeeded_with(&op, &1);
    }

    #[test]
    #[should_panic(expected = "but succeeded")]
    fn test_assert_failed_with_success_panics() {
        let op: Deferred<i32, String> = Deferred::succeeded(2);
        assert_failed_with(&op, &"e".to_string());
    }

    #[test]
    fn test_assert_pending() {
        let op: Deferred<i32, String> = Deferred::new();
        assert_pending(&op);
    }
}
