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

//! Labels used to tag the tracing spans and log events emitted while a
//! mission is running. The mission executor is single-threaded, so unlike a
//! task-per-component engine there is nothing here to schedule or join —
//! only the naming convention used to make per-component log lines greppable
//! by pipeline, phase, and component name.

pub mod labels;
