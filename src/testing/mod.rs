//! Testing infrastructure for deferral.
//!
//! This module provides mocks and assertions for exercising combinators
//! without hand-writing a generator closure for every test.
//!
//! # Architecture
//!
//! The testing infrastructure is organized into:
//! - **Mocks**: A generator that replays scripted attempts and counts calls
//! - **Assertions**: Custom assertions on deferred outcomes
//!
//! # Example
//!
//! ```rust
//! use deferral::testing::{assert_succeeded_with, MockGenerator};
//! use deferral::{Loop, Scheduling};
//!
//! let generator = MockGenerator::new()
//!     .with_failure("first")
//!     .with_success(7);
//! let calls = generator.call_counter();
//!
//! let retry = Loop::until_success(generator, Scheduling::Inline);
//! assert_succeeded_with(retry.deferred(), &7);
//! assert_eq!(calls.get(), 2);
//! ```

pub mod assertions;
pub mod mocks;

// Re-export commonly used types
pub use assertions::*;
pub use mocks::*;
