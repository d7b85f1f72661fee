//! Detection: evaluating candidate groups and resolving an order.
//!
//! The [`OrderResolver`] flattens an order into concrete candidate groups and
//! evaluates them one at a time, in priority order, with a [`GroupEvaluator`].
//! The evaluator runs the probes of one group concurrently and hands the
//! completed outcomes to the plan solver.

mod cache;
mod error;
mod evaluator;
mod report;
mod resolver;
pub mod solver;

pub use cache::RunCache;
pub use error::{DetectError, GroupFailure};
pub use evaluator::{default_max_concurrent_probes, GroupEvaluator, GroupVerdict};
pub use report::{DetectResult, FailureReport, GroupAttempt, ResolvedGroup};
pub use resolver::{FatalPolicy, OrderResolver};
