//! Loop: combine a lazily generated sequence of deferreds.
//!
//! A [`Generator`] produces one attempt per call. Attempts run strictly one
//! after another: attempt `k + 1` is requested only once attempt `k` is
//! terminal. The loop stops the moment its own deferred completes, whether
//! because the policy fired, the generator returned an error, or the caller
//! forced it with [`Loop::cancel`].
//!
//! # Scheduling
//!
//! - [`Scheduling::NextTick`] - every attempt cycle runs from a fresh reactor
//!   callback. The reactor is never blocked for more than one cycle per tick,
//!   the call stack never grows, and the loop always completes
//!   asynchronously with respect to its construction.
//! - [`Scheduling::Inline`] - cycles run in a plain loop while attempts
//!   complete synchronously. An attempt that is still pending parks the loop,
//!   which resumes from that attempt's completion.
//!
//! # Example
//!
//! ```
//! use deferral::{Deferred, Loop, Scheduling};
//!
//! let mut outcomes = vec![Err("a"), Err("b"), Ok(7)].into_iter();
//! let retry = Loop::until_success(
//!     move || match outcomes.next() {
//!         Some(outcome) => Ok(Deferred::completed(outcome)),
//!         None => Err("exhausted"),
//!     },
//!     Scheduling::Inline,
//! );
//!
//! assert_eq!(retry.deferred().outcome(), Some(Ok(7)));
//! assert_eq!(retry.generator_calls(), 3);
//! ```

use super::base::{Accumulator, Base};
use super::{private, Completion};
use crate::config::SchedulingMode;
use crate::deferred::Deferred;
use crate::error::{DeferralError, Result};
use crate::reactor::Reactor;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace, warn};

// ============================================================================
// Generator
// ============================================================================

/// Produces one attempt per call, indefinitely or until it returns an error.
///
/// Any `FnMut() -> Result<Deferred<T, E>, E>` closure is a generator.
pub trait Generator<T, E> {
    /// Produce the next attempt.
    ///
    /// # Errors
    ///
    /// An error fails the loop with that error and stops it.
    fn next_attempt(&mut self) -> std::result::Result<Deferred<T, E>, E>;
}

impl<T, E, F> Generator<T, E> for F
where
    F: FnMut() -> std::result::Result<Deferred<T, E>, E>,
{
    fn next_attempt(&mut self) -> std::result::Result<Deferred<T, E>, E> {
        self()
    }
}

// ============================================================================
// Policies
// ============================================================================

/// Repeat until an attempt succeeds, then succeed with its value.
///
/// Fails only when the generator errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UntilSuccess;

impl private::Sealed for UntilSuccess {}

impl<T: Clone, E> Completion<T, E> for UntilSuccess {
    const NAME: &'static str = "until_success";
    type Output = T;

    fn is_done(&self, results: &Accumulator<T, E>) -> bool {
        !results.successes().is_empty()
    }

    fn resolve(&self, results: &Accumulator<T, E>) -> std::result::Result<T, E> {
        Ok(results.successes()[0].clone())
    }
}

/// Repeat until an attempt fails, then fail with its error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UntilFailure;

impl private::Sealed for UntilFailure {}

impl<T, E: Clone> Completion<T, E> for UntilFailure {
    const NAME: &'static str = "until_failure";
    type Output = T;

    fn is_done(&self, results: &Accumulator<T, E>) -> bool {
        !results.failures().is_empty()
    }

    fn resolve(&self, results: &Accumulator<T, E>) -> std::result::Result<T, E> {
        Err(results.failures()[0].clone())
    }
}

// ============================================================================
// Scheduling
// ============================================================================

/// How a loop runs its attempt cycles.
#[derive(Clone)]
pub enum Scheduling {
    /// One cycle per reactor tick.
    NextTick(Rc<dyn Reactor>),
    /// Cycles run back to back while attempts complete synchronously.
    Inline,
}

impl fmt::Debug for Scheduling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NextTick(_) => write!(f, "NextTick"),
            Self::Inline => write!(f, "Inline"),
        }
    }
}

impl Scheduling {
    /// Tick scheduling if `reactor` is running, inline otherwise.
    #[must_use]
    pub fn detect(reactor: Rc<dyn Reactor>) -> Self {
        if reactor.is_running() {
            Self::NextTick(reactor)
        } else {
            Self::Inline
        }
    }

    /// Resolve a configured mode against an optional reactor.
    ///
    /// # Errors
    ///
    /// Returns [`DeferralError::ReactorUnavailable`] if `mode` requires tick
    /// scheduling but no reactor was supplied.
    pub fn from_mode(mode: SchedulingMode, reactor: Option<Rc<dyn Reactor>>) -> Result<Self> {
        match (mode, reactor) {
            (SchedulingMode::Inline, _) => Ok(Self::Inline),
            (SchedulingMode::Auto, Some(reactor)) => Ok(Self::detect(reactor)),
            (SchedulingMode::Auto, None) => Ok(Self::Inline),
            (SchedulingMode::NextTick, Some(reactor)) => Ok(Self::NextTick(reactor)),
            (SchedulingMode::NextTick, None) => Err(DeferralError::ReactorUnavailable {
                mode: mode.to_string(),
            }),
        }
    }

    /// Check if cycles run inline.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline)
    }
}

// ============================================================================
// Loop
// ============================================================================

struct Cycle<T, E, C>
where
    C: Completion<T, E>,
{
    base: Rc<Base<T, E, C>>,
    generator: RefCell<Box<dyn Generator<T, E>>>,
    stopped: Rc<Cell<bool>>,
    calls: Cell<usize>,
}

/// A combinator over attempts produced one at a time.
pub struct Loop<T, E, C>
where
    C: Completion<T, E>,
{
    cycle: Rc<Cycle<T, E, C>>,
}

impl<T, E, C> fmt::Debug for Loop<T, E, C>
where
    T: fmt::Debug,
    E: fmt::Debug,
    C: Completion<T, E> + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loop")
            .field("base", &self.cycle.base)
            .field("stopped", &self.cycle.stopped.get())
            .field("generator_calls", &self.cycle.calls.get())
            .finish()
    }
}

impl<T, E> Loop<T, E, UntilSuccess>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Retry until an attempt succeeds.
    pub fn until_success<G>(generator: G, scheduling: Scheduling) -> Self
    where
        G: Generator<T, E> + 'static,
    {
        Self::start(UntilSuccess, Box::new(generator), scheduling)
    }
}

impl<T, E> Loop<T, E, UntilFailure>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Repeat until an attempt fails.
    pub fn until_failure<G>(generator: G, scheduling: Scheduling) -> Self
    where
        G: Generator<T, E> + 'static,
    {
        Self::start(UntilFailure, Box::new(generator), scheduling)
    }
}

impl<T, E, C> Loop<T, E, C>
where
    T: Clone + 'static,
    E: Clone + 'static,
    C: Completion<T, E> + 'static,
    C::Output: 'static,
{
    fn start(policy: C, generator: Box<dyn Generator<T, E>>, scheduling: Scheduling) -> Self {
        let cycle = Rc::new(Cycle {
            base: Base::new(policy),
            generator: RefCell::new(generator),
            stopped: Rc::new(Cell::new(false)),
            calls: Cell::new(0),
        });
        cycle.setup(scheduling);
        Self { cycle }
    }

    /// Force the loop to fail with `error`, stopping further attempts.
    ///
    /// Returns `false` if the loop had already completed.
    pub fn cancel(&self, error: E) -> bool {
        self.cycle.base.fail(error)
    }
}

impl<T, E, C> Loop<T, E, C>
where
    C: Completion<T, E>,
{
    /// The loop's own deferred.
    #[must_use]
    pub fn deferred(&self) -> &Deferred<C::Output, E> {
        self.cycle.base.deferred()
    }

    /// Consume the loop, keeping only its deferred.
    #[must_use]
    pub fn into_deferred(self) -> Deferred<C::Output, E> {
        self.cycle.base.deferred().clone()
    }

    /// Check if no further attempts will be requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.cycle.stopped.get()
    }

    /// Number of times the generator has been called.
    #[must_use]
    pub fn generator_calls(&self) -> usize {
        self.cycle.calls.get()
    }

    /// Number of attempts registered.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.cycle.base.registered()
    }

    /// Values observed so far.
    #[must_use]
    pub fn successes(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.cycle.base.successes()
    }

    /// Errors observed so far.
    #[must_use]
    pub fn failures(&self) -> Vec<E>
    where
        E: Clone,
    {
        self.cycle.base.failures()
    }

    /// Snapshot of every outcome observed so far.
    #[must_use]
    pub fn results(&self) -> Accumulator<T, E>
    where
        T: Clone,
        E: Clone,
    {
        self.cycle.base.results()
    }
}

impl<T, E, C> Cycle<T, E, C>
where
    T: Clone + 'static,
    E: Clone + 'static,
    C: Completion<T, E> + 'static,
    C::Output: 'static,
{
    fn setup(self: &Rc<Self>, scheduling: Scheduling) {
        if self.base.check_completion() {
            debug!(policy = C::NAME, "Loop satisfied before the first attempt");
        }

        let stopped = Rc::clone(&self.stopped);
        self.base.deferred().on_complete(move |_| stopped.set(true));

        debug!(policy = C::NAME, ?scheduling, "Starting loop");
        match scheduling {
            Scheduling::NextTick(reactor) => self.schedule(reactor),
            Scheduling::Inline => self.run_inline(),
        }
    }

    /// Run one attempt cycle.
    ///
    /// Returns `None` if the generator failed, in which case the loop has
    /// already been failed with the generator's error.
    fn next_attempt(&self) -> Option<Deferred<T, E>> {
        let call = self.calls.get() + 1;
        self.calls.set(call);

        let produced = self.generator.borrow_mut().next_attempt();
        match produced {
            Ok(op) => Some(self.base.register_attempt(op)),
            Err(error) => {
                warn!(call, policy = C::NAME, "Generator failed, stopping loop");
                self.base.fail(error);
                None
            }
        }
    }

    fn schedule(self: &Rc<Self>, reactor: Rc<dyn Reactor>) {
        trace!(next_call = self.calls.get() + 1, "Scheduling attempt on next tick");
        let this = Rc::clone(self);
        let handle = Rc::clone(&reactor);
        reactor.next_tick(Box::new(move || {
            if this.stopped.get() {
                return;
            }
            if let Some(attempt) = this.next_attempt() {
                attempt.on_complete(move |_| {
                    if !this.stopped.get() {
                        this.schedule(handle);
                    }
                });
            }
        }));
    }

    fn run_inline(self: &Rc<Self>) {
        while !self.stopped.get() {
            let Some(attempt) = self.next_attempt() else {
                break;
            };
            if attempt.is_pending() {
                trace!(call = self.calls.get(), "Attempt pending, parking inline loop");
                let this = Rc::clone(self);
                attempt.on_complete(move |_| this.run_inline());
                return;
            }
        }
    }
}
