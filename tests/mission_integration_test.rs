//! End-to-end coverage of `ExecutorBase::run` itself: the essential-fault ->
//! `recovery` switch, the double-recovery fatal exit, and the guarantee that
//! every started component is cleaned up regardless of which exit path is
//! taken. Exercised the way `beaubourg`'s own `engine` crate is (root-level
//! integration tests driving the whole loop, rather than `#[cfg(test)]`
//! modules inside the executor crate itself), since none of these behaviors
//! can be observed from a single component or pipeline in isolation.

use std::{
    cell::Cell,
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use blackboard::{
    fields::{FieldRef, FieldValue},
    AllState, MissionType, VehicleState,
};
use component::{Component, ComponentError, FieldValues};
use config::{Config, ComponentArgs, ComponentFactory, ConfigError};
use debugger::{DebugSink, DebugValue};
use executor::{ExecutorBase, MissionLogic, PipelineSpec};
use logging::LoggingManager;
use vehicle::{VehicleInterface, VehicleReading};

const CONFIG_YAML: &str = r#"
run:
  computation_graph:
    components:
      - name: sensor
        type: Sensor
        essential: true
        outputs: ["vehicle"]
      - name: stopper
        type: Stopper
        essential: false
"#;

/// Reports `vehicle` every tick, turning unhealthy once `fail_after` calls
/// have been made.
struct FlakySensor {
    calls: Arc<AtomicU64>,
    fail_after: u64,
    initializes: Arc<AtomicUsize>,
    cleanups: Arc<AtomicUsize>,
}

impl Component for FlakySensor {
    fn initialize(&mut self) -> Result<(), ComponentError> {
        let _ = self.initializes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), ComponentError> {
        let _ = self.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn update(&mut self, _inputs: FieldValues) -> Result<Option<FieldValues>, ComponentError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(FieldValues::Named(vec![FieldValue::Vehicle(VehicleState::default())])))
    }

    fn healthy(&self) -> bool {
        self.calls.load(Ordering::SeqCst) < self.fail_after
    }

    fn state_inputs(&self) -> Vec<FieldRef> {
        vec![]
    }

    fn state_outputs(&self) -> Vec<FieldRef> {
        vec![FieldRef::named("vehicle")]
    }
}

/// A `recovery`-only component with no inputs or outputs of interest; exists
/// only to exercise the component-lifecycle (initialize/cleanup) guarantee.
struct Stopper {
    initializes: Arc<AtomicUsize>,
    cleanups: Arc<AtomicUsize>,
}

impl Component for Stopper {
    fn initialize(&mut self) -> Result<(), ComponentError> {
        let _ = self.initializes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), ComponentError> {
        let _ = self.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn update(&mut self, _inputs: FieldValues) -> Result<Option<FieldValues>, ComponentError> {
        Ok(None)
    }

    fn state_inputs(&self) -> Vec<FieldRef> {
        vec![]
    }

    fn state_outputs(&self) -> Vec<FieldRef> {
        vec![]
    }
}

struct TestFactory {
    sensor_calls: Arc<AtomicU64>,
    sensor_fail_after: u64,
    sensor_initializes: Arc<AtomicUsize>,
    sensor_cleanups: Arc<AtomicUsize>,
    stopper_initializes: Arc<AtomicUsize>,
    stopper_cleanups: Arc<AtomicUsize>,
}

impl ComponentFactory for TestFactory {
    fn create(&self, name: &str, type_name: &str, _args: Option<&ComponentArgs>) -> Result<Box<dyn Component>, ConfigError> {
        match type_name {
            "Sensor" => Ok(Box::new(FlakySensor {
                calls: self.sensor_calls.clone(),
                fail_after: self.sensor_fail_after,
                initializes: self.sensor_initializes.clone(),
                cleanups: self.sensor_cleanups.clone(),
            })),
            "Stopper" => Ok(Box::new(Stopper {
                initializes: self.stopper_initializes.clone(),
                cleanups: self.stopper_cleanups.clone(),
            })),
            other => Err(ConfigError::ComponentNotCreated {
                name: name.to_string(),
                type_name: other.to_string(),
                reason: "no such component type in this test".to_string(),
            }),
        }
    }
}

/// A vehicle with no hardware faults and a constant clock: nothing in these
/// tests paces on wall-clock time, since every registered component leaves
/// `rate()` at its `None` default.
struct StubVehicle;

impl VehicleInterface for StubVehicle {
    fn time(&self) -> f64 {
        0.0
    }

    fn hardware_faults(&self) -> HashSet<String> {
        HashSet::new()
    }

    fn last_reading(&self) -> Option<VehicleReading> {
        None
    }
}

/// Records every mission type `update` observes and the exit reason `run`
/// settles on, without persisting anything else.
#[derive(Default)]
struct RecordingLoggingManager {
    exit_reasons: Arc<Mutex<Vec<String>>>,
}

impl DebugSink for RecordingLoggingManager {
    fn on_value(&self, _source: &str, _key: &str, _value: &DebugValue) {}
    fn on_event(&self, _source: &str, _label: &str) {}
}

struct NoOpComponent;

impl Component for NoOpComponent {
    fn update(&mut self, _inputs: FieldValues) -> Result<Option<FieldValues>, ComponentError> {
        Ok(None)
    }
    fn state_inputs(&self) -> Vec<FieldRef> {
        vec![]
    }
    fn state_outputs(&self) -> Vec<FieldRef> {
        vec![]
    }
}

impl LoggingManager for RecordingLoggingManager {
    fn set_log_folder(&mut self, _path: &std::path::Path) -> Result<(), logging::LoggingError> {
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
    fn exit_event(&mut self, reason: &str) {
        self.exit_reasons.lock().expect("exit reasons mutex poisoned").push(reason.to_string());
    }
    fn replay_components(&mut self, _names: &[String], _folder: &std::path::Path) {}
    fn replay_topics(&mut self, _names: &[String], _folder: &std::path::Path) {}
    fn rosbag_player(&mut self) -> Option<&mut dyn logging::RosbagPlayer> {
        None
    }
    fn close(&mut self) {}
}

/// Ends the mission after three ticks of `recovery`, recording every mission
/// type `update` observed along the way.
struct EndsAfterThreeRecoveryTicks {
    seen: Arc<Mutex<Vec<MissionType>>>,
    recovery_ticks: Cell<u32>,
}

impl MissionLogic for EndsAfterThreeRecoveryTicks {
    fn update(&mut self, state: &mut AllState) -> Option<String> {
        self.seen.lock().expect("mission log mutex poisoned").push(state.mission.r#type.clone());
        None
    }

    fn done(&self, state: &AllState, _vehicle: &dyn VehicleInterface) -> bool {
        if state.mission.r#type != MissionType::RecoveryStop {
            return false;
        }
        let ticks = self.recovery_ticks.get() + 1;
        self.recovery_ticks.set(ticks);
        ticks >= 3
    }
}

/// An essential component fault in `drive` switches to `recovery`, the
/// blackboard's mission type is set to `RecoveryStop` before the first
/// `recovery` tick runs, the mission ends normally once `done()` says so,
/// and every started component is cleaned up exactly once.
#[test]
fn essential_fault_switches_to_recovery_then_ends_normally() {
    let sensor_calls = Arc::new(AtomicU64::new(0));
    let sensor_initializes = Arc::new(AtomicUsize::new(0));
    let sensor_cleanups = Arc::new(AtomicUsize::new(0));
    let stopper_initializes = Arc::new(AtomicUsize::new(0));
    let stopper_cleanups = Arc::new(AtomicUsize::new(0));

    let factory = TestFactory {
        sensor_calls: sensor_calls.clone(),
        sensor_fail_after: 3,
        sensor_initializes: sensor_initializes.clone(),
        sensor_cleanups: sensor_cleanups.clone(),
        stopper_initializes: stopper_initializes.clone(),
        stopper_cleanups: stopper_cleanups.clone(),
    };
    let graph = Config::load_str(CONFIG_YAML, "test", &factory).expect("config resolves");

    let exit_reasons = Arc::new(Mutex::new(Vec::new()));
    let logging = Box::new(RecordingLoggingManager { exit_reasons: exit_reasons.clone() });

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mission = EndsAfterThreeRecoveryTicks { seen: seen.clone(), recovery_ticks: Cell::new(0) };

    let mut executor = ExecutorBase::new(Arc::new(StubVehicle), logging, "drive", mission);
    executor.load_computation_graph(graph);
    executor.add_pipeline("drive", PipelineSpec::new().perceive("sensor")).expect("drive pipeline is well-formed");
    executor.add_pipeline("recovery", PipelineSpec::new().act("stopper")).expect("recovery pipeline is well-formed");

    executor.run().expect("run completes");

    assert_eq!(executor.current_pipeline(), "recovery");
    assert_eq!(*exit_reasons.lock().unwrap(), vec!["normal exit".to_string()]);

    let seen = seen.lock().unwrap();
    assert!(seen.len() >= 3, "expected at least 3 mission ticks, saw {}", seen.len());
    let recovery_ticks = seen.iter().rev().take(3).collect::<Vec<_>>();
    assert!(recovery_ticks.iter().all(|mission_type| **mission_type == MissionType::RecoveryStop));

    assert_eq!(sensor_initializes.load(Ordering::SeqCst), 1);
    assert_eq!(sensor_cleanups.load(Ordering::SeqCst), 1);
    assert_eq!(stopper_initializes.load(Ordering::SeqCst), 1);
    assert_eq!(stopper_cleanups.load(Ordering::SeqCst), 1);
}

/// Requests an unregistered pipeline once it has observed two `recovery`
/// ticks, simulating mission logic that has concluded recovery itself isn't
/// working. `run` normalizes the unknown name to `recovery`, sees that the
/// pipeline was already `recovery`, and exits fatally instead of looping.
struct RequestsUnknownPipelineAfterTwoRecoveryTicks {
    recovery_ticks: Cell<u32>,
}

impl MissionLogic for RequestsUnknownPipelineAfterTwoRecoveryTicks {
    fn update(&mut self, state: &mut AllState) -> Option<String> {
        if state.mission.r#type != MissionType::RecoveryStop {
            return None;
        }
        let ticks = self.recovery_ticks.get() + 1;
        self.recovery_ticks.set(ticks);
        if ticks >= 2 {
            Some("no-such-pipeline".to_string())
        } else {
            None
        }
    }
}

#[test]
fn double_recovery_request_exits_fatally_and_still_cleans_up() {
    let sensor_calls = Arc::new(AtomicU64::new(0));
    let sensor_initializes = Arc::new(AtomicUsize::new(0));
    let sensor_cleanups = Arc::new(AtomicUsize::new(0));
    let stopper_initializes = Arc::new(AtomicUsize::new(0));
    let stopper_cleanups = Arc::new(AtomicUsize::new(0));

    let factory = TestFactory {
        sensor_calls: sensor_calls.clone(),
        sensor_fail_after: 2,
        sensor_initializes: sensor_initializes.clone(),
        sensor_cleanups: sensor_cleanups.clone(),
        stopper_initializes: stopper_initializes.clone(),
        stopper_cleanups: stopper_cleanups.clone(),
    };
    let graph = Config::load_str(CONFIG_YAML, "test", &factory).expect("config resolves");

    let exit_reasons = Arc::new(Mutex::new(Vec::new()));
    let logging = Box::new(RecordingLoggingManager { exit_reasons: exit_reasons.clone() });

    let mission = RequestsUnknownPipelineAfterTwoRecoveryTicks { recovery_ticks: Cell::new(0) };

    let mut executor = ExecutorBase::new(Arc::new(StubVehicle), logging, "drive", mission);
    executor.load_computation_graph(graph);
    executor.add_pipeline("drive", PipelineSpec::new().perceive("sensor")).expect("drive pipeline is well-formed");
    executor.add_pipeline("recovery", PipelineSpec::new().act("stopper")).expect("recovery pipeline is well-formed");

    executor.run().expect("run completes");

    assert_eq!(*exit_reasons.lock().unwrap(), vec!["recovery pipeline not working".to_string()]);
    assert_eq!(sensor_cleanups.load(Ordering::SeqCst), 1);
    assert_eq!(stopper_cleanups.load(Ordering::SeqCst), 1);
}
