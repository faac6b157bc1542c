//! Next-tick scheduling.
//!
//! Loops that run under a reactor never call their next attempt inline:
//! each cycle is handed to [`Reactor::next_tick`] so it starts from a fresh
//! callback instead of a nested call.
//!
//! Two reactors are provided:
//!
//! - [`TickQueue`] - deterministic, hand-driven queue used by the CLI and tests
//! - [`TokioReactor`] - schedules ticks as local tasks on a tokio `LocalSet`

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use tokio::task::LocalSet;
use tracing::trace;

/// A callback queued for a later tick.
pub type Tick = Box<dyn FnOnce()>;

/// A cooperative event loop able to defer work to its next iteration.
pub trait Reactor {
    /// Check if the event loop is currently running.
    fn is_running(&self) -> bool;

    /// Queue `task` to run on a later iteration, never synchronously.
    fn next_tick(&self, task: Tick);
}

// ============================================================================
// TickQueue
// ============================================================================

/// A deterministic tick queue.
///
/// Callbacks queued while tick `n` runs are executed in tick `n + 1`, so a
/// callback that re-schedules itself makes progress one tick at a time.
/// Draining is not re-entrant: calling [`TickQueue::enter`],
/// [`TickQueue::run_until_idle`] or [`TickQueue::turn`] from inside a tick
/// runs nothing, and the outer drain picks the work up on its next tick.
///
/// # Example
///
/// ```
/// use deferral::reactor::{Reactor, TickQueue};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let queue = TickQueue::new();
/// let hit = Rc::new(Cell::new(false));
/// let h = Rc::clone(&hit);
///
/// queue.enter(|| {
///     queue.next_tick(Box::new(move || h.set(true)));
///     assert!(!hit.get());
/// });
/// assert!(hit.get());
/// assert_eq!(queue.ticks(), 1);
/// ```
#[derive(Default)]
pub struct TickQueue {
    queue: RefCell<VecDeque<Tick>>,
    running: Cell<bool>,
    draining: Cell<bool>,
    ticks: Cell<u64>,
}

impl fmt::Debug for TickQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickQueue")
            .field("pending", &self.pending())
            .field("running", &self.running.get())
            .field("ticks", &self.ticks.get())
            .finish()
    }
}

impl TickQueue {
    /// Create an idle, empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with the reactor marked as running, then drain until idle.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        let was_running = self.running.replace(true);
        let result = f();
        self.drain();
        self.running.set(was_running);
        result
    }

    /// Execute queued ticks until nothing is left. Returns the ticks run.
    pub fn run_until_idle(&self) -> u64 {
        let was_running = self.running.replace(true);
        let ran = self.drain();
        self.running.set(was_running);
        ran
    }

    /// Execute exactly one tick: every callback queued before it started.
    ///
    /// Returns `false` if the queue was empty or a tick is already running.
    pub fn turn(&self) -> bool {
        if self.draining.replace(true) {
            trace!("Nested turn ignored");
            return false;
        }
        let ran = self.run_tick();
        self.draining.set(false);
        ran
    }

    /// Check if a tick is executing right now.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.draining.get()
    }

    fn run_tick(&self) -> bool {
        let batch: Vec<Tick> = self.queue.borrow_mut().drain(..).collect();
        if batch.is_empty() {
            return false;
        }

        let tick = self.ticks.get() + 1;
        self.ticks.set(tick);
        trace!(tick, callbacks = batch.len(), "Running tick");

        for task in batch {
            task();
        }
        true
    }

    /// Number of ticks executed so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.get()
    }

    /// Number of callbacks waiting for the next tick.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    fn drain(&self) -> u64 {
        if self.draining.replace(true) {
            trace!("Nested drain ignored");
            return 0;
        }
        let start = self.ticks.get();
        while self.run_tick() {}
        self.draining.set(false);
        self.ticks.get() - start
    }
}

impl Reactor for TickQueue {
    fn is_running(&self) -> bool {
        self.running.get()
    }

    fn next_tick(&self, task: Tick) {
        self.queue.borrow_mut().push_back(task);
    }
}

// ============================================================================
// TokioReactor
// ============================================================================

/// Reactor backed by a tokio [`LocalSet`].
///
/// Ticks are spawned onto the owned set, so scheduling never depends on the
/// caller being inside it. They only run while the set is driven, e.g. with
/// [`LocalSet::run_until`] or by awaiting it.
///
/// # Example
///
/// ```
/// use deferral::reactor::{Reactor, TokioReactor};
/// use std::rc::Rc;
/// use tokio::task::LocalSet;
///
/// let local = Rc::new(LocalSet::new());
/// let reactor = TokioReactor::new(Rc::clone(&local));
/// // No runtime on this thread yet.
/// assert!(!reactor.is_running());
/// ```
#[derive(Debug, Clone)]
pub struct TokioReactor {
    local: Rc<LocalSet>,
}

impl TokioReactor {
    /// Schedule ticks onto `local`.
    #[must_use]
    pub fn new(local: Rc<LocalSet>) -> Self {
        Self { local }
    }

    /// The set ticks are spawned onto.
    #[must_use]
    pub fn local_set(&self) -> &Rc<LocalSet> {
        &self.local
    }
}

impl Reactor for TokioReactor {
    fn is_running(&self) -> bool {
        tokio::runtime::Handle::try_current().is_ok()
    }

    fn next_tick(&self, task: Tick) {
        self.local.spawn_local(async move {
            tokio::task::yield_now().await;
            task();
        });
    }
}
