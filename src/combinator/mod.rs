//! Combinators over deferred values.
//!
//! Every combinator is a [`Deferred`](crate::Deferred) derived from other
//! deferreds under a completion policy:
//!
//! - [`join`] - a fixed set of operations known up front, registered at once
//! - [`r#loop`] - operations produced one at a time by a generator
//! - [`base`] - the accumulator and completion check both families share
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   register_attempt   ┌───────────────┐
//! │ Join / Loop  │─────────────────────>│ Base          │
//! │              │                      │  Accumulator  │
//! └──────────────┘                      │  Completion   │
//!        │ next_tick                    └───────────────┘
//!        v                                     │ finish (once)
//! ┌──────────────┐                             v
//! │ Reactor      │                      combinator Deferred
//! └──────────────┘
//! ```
//!
//! | Policy | Family | Done when | Finishes with |
//! |---|---|---|---|
//! | [`FirstSuccess`] | Join | one success | succeed(first success) |
//! | [`InParallel`] | Join | all N terminal | succeed((successes, failures)) |
//! | [`UntilSuccess`] | Loop | one success | succeed(first success) |
//! | [`UntilFailure`] | Loop | one failure | fail(first failure) |

pub mod base;
pub mod join;
pub mod r#loop;

pub use base::{Accumulator, Base};
pub use join::{FirstSuccess, InParallel, Join};
pub use r#loop::{Generator, Loop, Scheduling, UntilFailure, UntilSuccess};

/// A completion policy: when a combinator is done and what it finishes with.
///
/// The set of policies is closed; the trait is sealed.
pub trait Completion<T, E>: private::Sealed {
    /// Policy name used in logs and reports.
    const NAME: &'static str;

    /// Success value of the combinator's own deferred.
    type Output;

    /// Check if the outcomes observed so far satisfy the policy.
    fn is_done(&self, results: &Accumulator<T, E>) -> bool;

    /// The combinator's outcome. Only called once `is_done` holds.
    fn resolve(&self, results: &Accumulator<T, E>) -> Result<Self::Output, E>;
}

pub(crate) mod private {
    pub trait Sealed {}
}
