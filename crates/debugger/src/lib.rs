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

//! The debug bus: a small two-level fan-out that lets components publish
//! ad-hoc key/value samples and named events without knowing who, if anyone,
//! is listening. [`Debugger`] holds the list of registered [`DebugSink`]s
//! (the logging manager is always one); [`ChildDebugger`] is handed to a
//! single component so it can call `debug`/`debug_event` without carrying
//! its own source name around.

use std::sync::Arc;

/// A value published on the debug bus. Deliberately narrower than the
/// blackboard's `FieldValue` (debug samples are diagnostic scalars/labels,
/// not schema fields), following the spec's "fan-out of `(source, item,
/// value)` debug tuples" wording.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum DebugValue {
    /// A floating-point sample.
    F64(f64),
    /// An integer sample.
    I64(i64),
    /// A boolean sample.
    Bool(bool),
    /// A free-form text sample.
    Text(String),
}

impl From<f64> for DebugValue {
    fn from(value: f64) -> Self {
        DebugValue::F64(value)
    }
}

impl From<i64> for DebugValue {
    fn from(value: i64) -> Self {
        DebugValue::I64(value)
    }
}

impl From<bool> for DebugValue {
    fn from(value: bool) -> Self {
        DebugValue::Bool(value)
    }
}

impl From<String> for DebugValue {
    fn from(value: String) -> Self {
        DebugValue::Text(value)
    }
}

impl From<&str> for DebugValue {
    fn from(value: &str) -> Self {
        DebugValue::Text(value.to_string())
    }
}

/// A registered handler of the debug bus. The logging manager implements
/// this; additional visualization sinks may too.
pub trait DebugSink: Send + Sync {
    /// Called for every `debug(key, value)` sample published by `source`.
    fn on_value(&self, source: &str, key: &str, value: &DebugValue);

    /// Called for every `debug_event(label)` published by `source`.
    fn on_event(&self, source: &str, label: &str);
}

/// The root of the debug bus: a fan-out list of sinks.
#[derive(Clone, Default)]
pub struct Debugger {
    handlers: Vec<Arc<dyn DebugSink>>,
}

impl Debugger {
    /// Creates an empty debugger with no registered sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sink. Order of registration is the order sinks are
    /// notified in.
    pub fn register(&mut self, handler: Arc<dyn DebugSink>) {
        self.handlers.push(handler);
    }

    /// Publishes a key/value sample from `source` to every registered sink.
    pub fn debug(&self, source: &str, key: &str, value: impl Into<DebugValue>) {
        let value = value.into();
        for handler in &self.handlers {
            handler.on_value(source, key, &value);
        }
    }

    /// Publishes a named event from `source` to every registered sink.
    pub fn debug_event(&self, source: &str, label: &str) {
        for handler in &self.handlers {
            handler.on_event(source, label);
        }
    }

    /// Binds a `source` name to this bus, producing the handle a single
    /// component is given so it never has to know its own identity when
    /// calling `debug`/`debug_event`.
    pub fn for_source(&self, source: impl Into<String>) -> ChildDebugger {
        ChildDebugger {
            parent: self.clone(),
            source: source.into(),
        }
    }
}

/// A `Debugger` bound to a single component's source name. Handed to a
/// component via `Component::set_debugger` when its descriptor's `debug`
/// flag is set.
#[derive(Clone)]
pub struct ChildDebugger {
    parent: Debugger,
    source: String,
}

impl ChildDebugger {
    /// Publishes a key/value sample tagged with this debugger's bound
    /// source.
    pub fn debug(&self, key: &str, value: impl Into<DebugValue>) {
        self.parent.debug(&self.source, key, value);
    }

    /// Publishes a named event tagged with this debugger's bound source.
    pub fn debug_event(&self, label: &str) {
        self.parent.debug_event(&self.source, label);
    }

    /// The source name this debugger is bound to (a component's type name).
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        values: Mutex<Vec<(String, String, DebugValue)>>,
        events: Mutex<Vec<(String, String)>>,
    }

    impl DebugSink for RecordingSink {
        fn on_value(&self, source: &str, key: &str, value: &DebugValue) {
            self.values
                .lock()
                .unwrap()
                .push((source.to_string(), key.to_string(), value.clone()));
        }

        fn on_event(&self, source: &str, label: &str) {
            self.events.lock().unwrap().push((source.to_string(), label.to_string()));
        }
    }

    #[test]
    fn fans_out_to_every_registered_sink() {
        let sink_a = Arc::new(RecordingSink::default());
        let sink_b = Arc::new(RecordingSink::default());
        let mut bus = Debugger::new();
        bus.register(sink_a.clone());
        bus.register(sink_b.clone());

        bus.debug("planner", "horizon", 5.0);
        bus.debug_event("planner", "replanned");

        for sink in [&sink_a, &sink_b] {
            assert_eq!(sink.values.lock().unwrap().len(), 1);
            assert_eq!(sink.events.lock().unwrap().len(), 1);
        }
    }

    #[test]
    fn child_debugger_binds_source_without_component_knowledge() {
        let sink = Arc::new(RecordingSink::default());
        let mut bus = Debugger::new();
        bus.register(sink.clone());

        let child = bus.for_source("AStarPlanner");
        child.debug("cost", 12.0);
        child.debug_event("stuck");

        let values = sink.values.lock().unwrap();
        assert_eq!(values[0].0, "AStarPlanner");
        assert_eq!(values[0].1, "cost");
        let events = sink.events.lock().unwrap();
        assert_eq!(events[0], ("AStarPlanner".to_string(), "stuck".to_string()));
    }
}
