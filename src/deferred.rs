//! The deferred value: a single-threaded async completion cell.
//!
//! A [`Deferred`] starts out pending and transitions exactly once to either
//! succeeded or failed. Handlers registered while pending are queued and fire
//! in registration order when the cell completes; handlers registered after
//! completion fire immediately with the stored outcome.
//!
//! Cloning a `Deferred` produces another handle to the same cell, which is how
//! a producer keeps the ability to complete a value it has handed out.
//!
//! # Example
//!
//! ```
//! use deferral::Deferred;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let seen = Rc::new(Cell::new(0));
//! let op: Deferred<i32, String> = Deferred::new();
//!
//! let sink = Rc::clone(&seen);
//! op.on_success(move |v| sink.set(*v));
//! assert!(op.succeed(42));
//! assert_eq!(seen.get(), 42);
//!
//! // A completed cell ignores further transitions.
//! assert!(!op.fail("too late".to_string()));
//! ```

use futures::channel::oneshot;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use tracing::debug;

type Handler<T, E> = Box<dyn FnOnce(&Result<T, E>)>;

/// Observable state of a [`Deferred`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeferredState {
    /// Not yet completed
    Pending,
    /// Completed with a value
    Succeeded,
    /// Completed with an error
    Failed,
}

impl DeferredState {
    /// Check if this state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for DeferredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

enum Slot<T, E> {
    Pending(Vec<Handler<T, E>>),
    // Shared so handlers can run without holding the cell borrowed.
    Done(Rc<Result<T, E>>),
}

/// A value that will eventually succeed with `T` or fail with `E`.
pub struct Deferred<T, E> {
    slot: Rc<RefCell<Slot<T, E>>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: 'static, E: 'static> Default for Deferred<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("state", &self.state())
            .finish()
    }
}

impl<T: 'static, E: 'static> Deferred<T, E> {
    /// Create a pending deferred.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot::Pending(Vec::new()))),
        }
    }

    /// Create a deferred that has already succeeded with `value`.
    #[must_use]
    pub fn succeeded(value: T) -> Self {
        Self::completed(Ok(value))
    }

    /// Create a deferred that has already failed with `error`.
    #[must_use]
    pub fn failed(error: E) -> Self {
        Self::completed(Err(error))
    }

    /// Create a deferred that is already terminal with `outcome`.
    #[must_use]
    pub fn completed(outcome: Result<T, E>) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot::Done(Rc::new(outcome)))),
        }
    }

    /// Succeed with `value`. Returns `false` if the cell was already terminal.
    pub fn succeed(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    /// Fail with `error`. Returns `false` if the cell was already terminal.
    pub fn fail(&self, error: E) -> bool {
        self.complete(Err(error))
    }

    /// Move the cell to a terminal state and run every queued handler.
    ///
    /// Handlers may register further handlers on this cell or complete
    /// other cells; the cell is not borrowed while they run.
    pub fn complete(&self, outcome: Result<T, E>) -> bool {
        let outcome = Rc::new(outcome);
        let handlers = {
            let mut slot = self.slot.borrow_mut();
            match &mut *slot {
                Slot::Done(_) => {
                    debug!("Ignoring completion of an already terminal deferred");
                    return false;
                }
                Slot::Pending(handlers) => {
                    let handlers = std::mem::take(handlers);
                    *slot = Slot::Done(Rc::clone(&outcome));
                    handlers
                }
            }
        };

        for handler in handlers {
            handler(&outcome);
        }
        true
    }

    /// Register a handler that runs on either outcome.
    pub fn on_complete<F>(&self, handler: F)
    where
        F: FnOnce(&Result<T, E>) + 'static,
    {
        let done = {
            let mut slot = self.slot.borrow_mut();
            match &mut *slot {
                Slot::Pending(handlers) => {
                    handlers.push(Box::new(handler));
                    return;
                }
                Slot::Done(outcome) => Rc::clone(outcome),
            }
        };
        handler(&done);
    }

    /// Register a handler that runs only if the cell succeeds.
    pub fn on_success<F>(&self, handler: F)
    where
        F: FnOnce(&T) + 'static,
    {
        self.on_complete(move |outcome| {
            if let Ok(value) = outcome {
                handler(value);
            }
        });
    }

    /// Register a handler that runs only if the cell fails.
    pub fn on_failure<F>(&self, handler: F)
    where
        F: FnOnce(&E) + 'static,
    {
        self.on_complete(move |outcome| {
            if let Err(error) = outcome {
                handler(error);
            }
        });
    }

    /// Wait for the outcome from async code.
    ///
    /// Resolves to `None` if every handle to a still-pending cell is dropped.
    pub fn wait(&self) -> impl Future<Output = Option<Result<T, E>>> + 'static
    where
        T: Clone,
        E: Clone,
    {
        let (tx, rx) = oneshot::channel();
        self.on_complete(move |outcome| {
            // The receiver may already be gone; nothing to report then.
            let _ = tx.send(outcome.clone());
        });
        async move { rx.await.ok() }
    }
}

impl<T, E> Deferred<T, E> {
    /// Current state of the cell.
    #[must_use]
    pub fn state(&self) -> DeferredState {
        match &*self.slot.borrow() {
            Slot::Pending(_) => DeferredState::Pending,
            Slot::Done(outcome) if outcome.is_ok() => DeferredState::Succeeded,
            Slot::Done(_) => DeferredState::Failed,
        }
    }

    /// Check if the cell has not completed yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state() == DeferredState::Pending
    }

    /// Check if two handles refer to the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }

    /// A copy of the stored outcome, if the cell is terminal.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<T, E>>
    where
        T: Clone,
        E: Clone,
    {
        match &*self.slot.borrow() {
            Slot::Pending(_) => None,
            Slot::Done(outcome) => Some((**outcome).clone()),
        }
    }
}
