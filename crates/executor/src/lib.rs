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

//! The mission executor: owns every constructed component, assembles them
//! into pipelines, and drives the `run`/`run_until_switch`/
//! `validate_sensors` state machine from mission start to shutdown.
//!
//! This is the one crate whose control flow diverges most from the
//! teacher's own `engine` crate: `engine` schedules one tokio task per
//! receiver/processor/exporter and lets the async runtime interleave them,
//! while a ground vehicle's computation graph is a fixed, small set of
//! components that must tick in a deterministic, rate-limited order — so
//! this crate is a single-threaded cooperative scheduler instead, built
//! the way `engine`'s own command/error/module layout is built.

mod base;
mod pipeline;
mod standard;

pub use base::{executor_debug_exception, executor_debug_print, executor_debug_stderr, ExecutorBase, ExecutorError, MissionLogic, RECOVERY_PIPELINE};
pub use pipeline::{Pipeline, PipelineSpec, SharedExecutor};
pub use standard::StandardExecutor;
