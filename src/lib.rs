#![doc = include_str!("../README.md")]
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

//! `mission-core` orchestrates a heterogeneous set of real-time onboard
//! components (sensors, perception, planning, control, logging) as a
//! computation graph organized into switchable pipelines (e.g. `drive`,
//! `recovery`), scheduling each at its declared rate against a shared
//! [`blackboard::AllState`] while enforcing dataflow validity, fault
//! isolation, pipeline switching, and recoverable shutdown.
//!
//! A mission is assembled from:
//! - a [`config::Config`] that resolves a YAML computation-graph
//!   declaration into constructed [`component::Component`]s via an
//!   injected [`config::ComponentFactory`];
//! - an [`executor::ExecutorBase`] that validates the resulting
//!   [`graph::GraphDescriptor`], builds one or more
//!   [`executor::Pipeline`]s, and runs the mission to completion or
//!   shutdown;
//! - a [`vehicle::VehicleInterface`] and a [`logging::LoggingManager`]
//!   supplied by the embedding application, since the hardware interface
//!   and the on-disk log format are outside this crate's scope.
//!
//! See `demos/drive_mission_demo.rs` for a runnable toy mission built
//! entirely from in-memory stub components.

pub use blackboard;
pub use clock;
pub use component;
pub use config;
pub use debugger;
pub use executor;
pub use graph;
pub use logging;
pub use task;
pub use vehicle;
