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

//! The `LoggingManager` seam: persistence of component stdout/stderr,
//! per-field state snapshots, events, and exit reasons, plus replay
//! substitution. A concrete implementation (on-disk format, replay backend)
//! is an external collaborator; this crate defines the contract, a
//! [`NullLoggingManager`] reference implementation that does nothing and
//! proves the trait is object-safe, and the process-wide handle
//! free-function diagnostics route through.

pub mod global;

use std::{path::Path, sync::Arc};

use blackboard::{fields::FieldRef, AllState};
use component::Component;
use debugger::DebugSink;
use vehicle::VehicleInterface;

/// A substitute data source that replaces live ROS/rosbag topic playback
/// during a replayed mission. Declared but not implemented end-to-end here;
/// the replay backend itself is an external collaborator.
pub trait RosbagPlayer: Send {
    /// Advances replay to vehicle time `t`, publishing any topics due.
    fn update_topics(&mut self, t: f64);
}

/// Persists everything the mission produces: component stdout/stderr,
/// per-field state snapshots, free-form events, and the exit reason: also
/// the seam through which a replayed mission substitutes recorded
/// component output for live computation.
pub trait LoggingManager: DebugSink + Send {
    /// Directs all subsequent logging to `path`.
    fn set_log_folder(&mut self, path: &Path) -> Result<(), LoggingError>;

    /// Declares that the named components' outputs should be logged.
    fn log_components(&mut self, names: &[String]);

    /// Builds an always-run component that snapshots the named blackboard
    /// fields at `rate` Hz (or every tick, if `None`).
    fn log_state(&mut self, fields: &[String], rate: Option<f64>) -> Box<dyn Component>;

    /// Builds an always-run component that logs the vehicle interface's own
    /// readings.
    fn log_vehicle_behavior(&mut self, iface: Arc<dyn VehicleInterface>) -> Box<dyn Component>;

    /// Starts recording the named ROS topics under `opts`, returning the
    /// recorder command line if one was launched.
    fn log_ros_topics(&mut self, topics: &[String], opts: &str) -> Option<String>;

    /// Persists captured stdout lines from a component's last tick.
    fn log_component_stdout(&mut self, name: &str, lines: &[String]);

    /// Persists captured stderr lines from a component's last tick.
    fn log_component_stderr(&mut self, name: &str, lines: &[String]);

    /// Persists the outputs a component wrote this tick, as a state
    /// snapshot keyed by the component's name.
    fn log_component_update(&mut self, name: &str, state: &AllState, outputs: &[FieldRef]);

    /// Records the current vehicle time, forwarded once per tick.
    fn set_vehicle_time(&mut self, t: f64);

    /// Records that pipeline `name` has become the active pipeline.
    fn pipeline_start_event(&mut self, name: &str);

    /// Records a free-form, timestamped event.
    fn event(&mut self, description: &str);

    /// Records the mission's exit reason.
    fn exit_event(&mut self, reason: &str);

    /// Replaces `component` with a substitute that replays `name`'s
    /// recorded outputs, if a replay was requested for this component name;
    /// otherwise returns `component` unchanged. Takes ownership either way
    /// so callers never need to reconstruct the original on a pass-through.
    fn component_replayer(
        &self,
        _iface: Arc<dyn VehicleInterface>,
        _name: &str,
        component: Box<dyn Component>,
    ) -> Box<dyn Component> {
        component
    }

    /// Declares that the named components should be replayed from `folder`
    /// instead of constructed live.
    fn replay_components(&mut self, names: &[String], folder: &Path);

    /// Declares that the named ROS topics should be replayed from `folder`.
    fn replay_topics(&mut self, names: &[String], folder: &Path);

    /// The rosbag replay driver, if a replay mission is in progress.
    fn rosbag_player(&mut self) -> Option<&mut dyn RosbagPlayer>;

    /// Flushes and closes all log resources. Called exactly once, last, on
    /// every exit path.
    fn close(&mut self);
}

/// Errors a [`LoggingManager`] implementation can surface while directing
/// output to disk.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum LoggingError {
    /// The requested log folder could not be created or written to.
    #[error("failed to set log folder '{path}': {reason}")]
    Folder {
        /// The requested path.
        path: String,
        /// The underlying reason.
        reason: String,
    },
}

/// A [`Component`] that never produces output, used by [`NullLoggingManager`]
/// as the always-run handle returned from `log_state`/`log_vehicle_behavior`.
struct NoOpComponent;

impl Component for NoOpComponent {
    fn update(&mut self, _inputs: component::FieldValues) -> Result<Option<component::FieldValues>, component::ComponentError> {
        Ok(None)
    }

    fn state_inputs(&self) -> Vec<FieldRef> {
        vec![]
    }

    fn state_outputs(&self) -> Vec<FieldRef> {
        vec![]
    }
}

/// A [`LoggingManager`] that discards everything: every method is a no-op
/// or returns `None`/an empty value. Used by this crate's own tests, the
/// `demos/` runnable example, and any deployment that doesn't need
/// persistence.
#[derive(Debug, Default)]
pub struct NullLoggingManager;

impl NullLoggingManager {
    /// Creates a new discarding logging manager.
    pub fn new() -> Self {
        Self
    }
}

impl DebugSink for NullLoggingManager {
    fn on_value(&self, _source: &str, _key: &str, _value: &debugger::DebugValue) {}

    fn on_event(&self, _source: &str, _label: &str) {}
}

impl LoggingManager for NullLoggingManager {
    fn set_log_folder(&mut self, _path: &Path) -> Result<(), LoggingError> {
        Ok(())
    }

    fn log_components(&mut self, _names: &[String]) {}

    fn log_state(&mut self, _fields: &[String], _rate: Option<f64>) -> Box<dyn Component> {
        Box::new(NoOpComponent)
    }

    fn log_vehicle_behavior(&mut self, _iface: Arc<dyn VehicleInterface>) -> Box<dyn Component> {
        Box::new(NoOpComponent)
    }

    fn log_ros_topics(&mut self, _topics: &[String], _opts: &str) -> Option<String> {
        None
    }

    fn log_component_stdout(&mut self, _name: &str, _lines: &[String]) {}

    fn log_component_stderr(&mut self, _name: &str, _lines: &[String]) {}

    fn log_component_update(&mut self, _name: &str, _state: &AllState, _outputs: &[FieldRef]) {}

    fn set_vehicle_time(&mut self, _t: f64) {}

    fn pipeline_start_event(&mut self, _name: &str) {}

    fn event(&mut self, _description: &str) {}

    fn exit_event(&mut self, _reason: &str) {}

    fn replay_components(&mut self, _names: &[String], _folder: &Path) {}

    fn replay_topics(&mut self, _names: &[String], _folder: &Path) {}

    fn rosbag_player(&mut self) -> Option<&mut dyn RosbagPlayer> {
        None
    }

    fn close(&mut self) {}
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn null_logging_manager_log_state_returns_a_component() {
        let mut manager = NullLoggingManager::new();
        let mut component = manager.log_state(&["vehicle".to_string()], None);
        assert!(component.state_inputs().is_empty());
        assert!(component.update(component::FieldValues::Named(vec![])).unwrap().is_none());
    }
}
