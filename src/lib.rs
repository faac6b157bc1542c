//! Deferral - combinators over deferred values
//!
//! Single-threaded, cooperative building blocks for composing work that
//! will eventually succeed or fail.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`deferred`] - The deferred value cell and its handlers
//! - [`reactor`] - Next-tick scheduling (deterministic queue and tokio)
//! - [`combinator`] - Join and Loop combinators over deferreds
//! - [`config`] - Configuration loading
//! - [`error`] - Custom error types and handling
//! - [`script`] - Scripted outcomes for deterministic runs
//! - [`runner`] - Scripted combinator runs on a tick queue
//! - [`report`] - Run reports in text and JSON
//! - [`testing`] - Testing infrastructure (mock generators, assertions)
//!
//! # Example
//!
//! ```rust
//! use deferral::{Deferred, Join, Loop, Scheduling};
//!
//! // First success wins, in completion order.
//! let slow: Deferred<u32, String> = Deferred::new();
//! let fast: Deferred<u32, String> = Deferred::new();
//! let race = Join::first_success(vec![slow.clone(), fast.clone()]);
//! fast.succeed(2);
//! slow.succeed(1);
//! assert_eq!(race.deferred().outcome(), Some(Ok(2)));
//!
//! // Retry until an attempt succeeds.
//! let mut attempt = 0;
//! let retry = Loop::until_success(
//!     move || {
//!         attempt += 1;
//!         Ok(if attempt < 3 {
//!             Deferred::failed(format!("attempt {attempt} failed"))
//!         } else {
//!             Deferred::succeeded(attempt)
//!         })
//!     },
//!     Scheduling::Inline,
//! );
//! assert_eq!(retry.deferred().outcome(), Some(Ok(3)));
//! ```

pub mod combinator;
pub mod config;
pub mod deferred;
pub mod error;
pub mod reactor;
pub mod report;
pub mod runner;
pub mod script;
pub mod testing;

// Re-export commonly used types
pub use error::{DeferralError, Result};

// Re-export core types
pub use combinator::{
    Accumulator, Completion, FirstSuccess, Generator, InParallel, Join, Loop, Scheduling,
    UntilFailure, UntilSuccess,
};
pub use deferred::{Deferred, DeferredState};
pub use reactor::{Reactor, TickQueue, TokioReactor};

// Re-export config and runner types
pub use config::{CombinatorConfig, OutputFormat, SchedulingMode};
pub use report::Report;
pub use runner::{JoinPolicy, LoopPolicy, Runner};
pub use script::{OutcomeKind, ScriptedGenerator, ScriptedOutcome};
