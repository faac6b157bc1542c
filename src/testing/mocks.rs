//! Mock generators for loop tests.

use crate::combinator::Generator;
use crate::deferred::Deferred;
use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Mock generator that replays scripted attempts.
///
/// Once the script runs out the generator returns the configured
/// exhaustion error, or a deferred that never completes if none is set.
///
/// # Example
///
/// ```rust
/// use deferral::testing::MockGenerator;
///
/// let generator: MockGenerator<u8, &str> = MockGenerator::new()
///     .with_failure("busy")
///     .with_success(1)
///     .with_exhaustion_error("out of attempts");
/// assert_eq!(generator.remaining(), 2);
/// ```
pub struct MockGenerator<T, E> {
    attempts: VecDeque<Deferred<T, E>>,
    exhaustion: Option<E>,
    calls: Rc<Cell<usize>>,
}

impl<T, E> Default for MockGenerator<T, E> {
    fn default() -> Self {
        Self {
            attempts: VecDeque::new(),
            exhaustion: None,
            calls: Rc::new(Cell::new(0)),
        }
    }
}

impl<T, E> fmt::Debug for MockGenerator<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockGenerator")
            .field("remaining", &self.attempts.len())
            .field("calls", &self.calls.get())
            .finish()
    }
}

impl<T: 'static, E: 'static> MockGenerator<T, E> {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an attempt that has already succeeded.
    #[must_use]
    pub fn with_success(self, value: T) -> Self {
        self.with_attempt(Deferred::succeeded(value))
    }

    /// Queue an attempt that has already failed.
    #[must_use]
    pub fn with_failure(self, error: E) -> Self {
        self.with_attempt(Deferred::failed(error))
    }

    /// Queue an arbitrary attempt, typically one the test completes later.
    #[must_use]
    pub fn with_attempt(mut self, attempt: Deferred<T, E>) -> Self {
        self.attempts.push_back(attempt);
        self
    }

    /// Error returned by every call after the script runs out.
    #[must_use]
    pub fn with_exhaustion_error(mut self, error: E) -> Self {
        self.exhaustion = Some(error);
        self
    }

    /// Shared handle on the call count, usable after the mock is moved.
    #[must_use]
    pub fn call_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }

    /// Attempts not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.attempts.len()
    }
}

impl<T: 'static, E: Clone + 'static> Generator<T, E> for MockGenerator<T, E> {
    fn next_attempt(&mut self) -> Result<Deferred<T, E>, E> {
        self.calls.set(self.calls.get() + 1);
        match self.attempts.pop_front() {
            Some(attempt) => Ok(attempt),
            None => match &self.exhaustion {
                Some(error) => Err(error.clone()),
                None => Ok(Deferred::new()),
            },
        }
    }
}
