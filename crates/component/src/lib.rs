#![deny(
    trivial_numeric_casts,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    unused_extern_crates,
    unused_results
)]
#![warn(rust_2021_compatibility, unreachable_pub)]

//! Definition of the `Component` trait and the `ComponentExecutor` that
//! wraps one, scheduling it at its declared rate against the shared
//! blackboard and isolating it from the rest of the mission.
//!
//! Lifecycle is a single synchronous `Component` trait rather than separate
//! receiver/processor/exporter roles, because the scheduling model here is
//! single-threaded cooperative rather than one task per pipeline stage.

pub mod executor;
mod io_capture;

use blackboard::{fields::FieldRef, fields::FieldValue, AllState};
use debugger::ChildDebugger;

pub use executor::{ComponentExecutor, ComponentExecutorConfig};

/// All the errors a `Component` or its wrapping `ComponentExecutor` can
/// surface.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ComponentError {
    /// `initialize()` failed.
    #[error("component '{name}' failed to initialize (reason: {reason})")]
    InitializeFailed {
        /// The component's name.
        name: String,
        /// The underlying reason.
        reason: String,
    },

    /// `cleanup()` failed. Logged, never fatal: cleanup is attempted for
    /// every started component regardless of individual failures.
    #[error("component '{name}' failed to clean up (reason: {reason})")]
    CleanupFailed {
        /// The component's name.
        name: String,
        /// The underlying reason.
        reason: String,
    },

    /// `update()` raised (returned `Err`, or panicked and was caught at the
    /// executor boundary): caught, logged with its message/backtrace, marks
    /// the executor unhealthy, never propagates out of the loop.
    #[error("component '{name}' failed during update (reason: {reason})")]
    Runtime {
        /// The component's name.
        name: String,
        /// The underlying reason, or the panic payload if the component
        /// panicked.
        reason: String,
    },

    /// The result of `update()` did not have as many fields as the
    /// component's declared outputs: logged, result discarded, executor
    /// otherwise continues (not marked unhealthy by this alone).
    #[error("component '{name}' returned {got} outputs, expected {expected}")]
    OutputArity {
        /// The component's name.
        name: String,
        /// The number of outputs the descriptor declared.
        expected: usize,
        /// The number of values the component actually returned.
        got: usize,
    },

    /// A blackboard field read/write failed.
    #[error("component '{name}' field error: {source}")]
    Field {
        /// The component's name.
        name: String,
        /// The underlying field error.
        #[source]
        source: blackboard::fields::FieldError,
    },
}

/// The values passed into, or returned from, a single `Component::update`
/// call: either one value per declared field (in declared order), or a
/// snapshot of/replacement for the whole blackboard when the component's
/// descriptor declares `["all"]`.
#[derive(Debug, Clone)]
pub enum FieldValues {
    /// One value per named field, positionally aligned with
    /// `state_inputs()`/`state_outputs()`.
    Named(Vec<FieldValue>),
    /// The whole blackboard, for a component declaring `["all"]`.
    All(Box<AllState>),
}

impl FieldValues {
    /// The number of named values carried (`1` for the `All` variant, since
    /// it counts as a single combined value for arity-checking purposes).
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Named(values) => values.len(),
            FieldValues::All(_) => 1,
        }
    }

    /// Returns `true` if this carries no named values (never true for
    /// `All`).
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValues::Named(values) if values.is_empty())
    }
}

/// A user-supplied unit of work: one node in the computation graph.
///
/// Every method but `update` has a no-op default, following an "optional
/// methods" pattern: one mandatory method, everything else overridable.
pub trait Component: Send {
    /// Called exactly once before the mission loop starts.
    fn initialize(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Called exactly once on exit, regardless of prior failures.
    fn cleanup(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Runs one tick of work. Returns `Ok(None)` if there is no output to
    /// write this tick (e.g. the component chose to skip), `Ok(Some(..))`
    /// with one value per declared output (or the whole blackboard, for an
    /// `"all"` component), or `Err` if the tick failed.
    fn update(&mut self, inputs: FieldValues) -> Result<Option<FieldValues>, ComponentError>;

    /// Target rate in Hz, or `None` for an event-driven/no-polling
    /// component (every tick is "due").
    fn rate(&self) -> Option<f64> {
        None
    }

    /// Whether the component currently considers itself healthy. Combined
    /// with `had_exception` by the wrapping executor.
    fn healthy(&self) -> bool {
        true
    }

    /// The blackboard fields this component reads, in the order its
    /// `update` expects them, or `[FieldRef::All]`.
    fn state_inputs(&self) -> Vec<FieldRef>;

    /// The blackboard fields this component writes, in the order its
    /// `update` returns them, or `[FieldRef::All]`.
    fn state_outputs(&self) -> Vec<FieldRef>;

    /// Installs the debugger handle this component should publish samples
    /// and events through. Called only when the descriptor's `debug` flag
    /// is set; components that never call it may ignore this.
    fn set_debugger(&mut self, _debugger: ChildDebugger) {}
}
