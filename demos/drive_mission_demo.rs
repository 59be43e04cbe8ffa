//! A runnable toy mission assembled entirely from in-memory stub
//! components: a `sensor` that reports the vehicle's own kinematic state
//! (and goes unhealthy partway through, to exercise the essential-fault ->
//! `recovery` switch), a `planner` and `controller` that drive the
//! `drive` pipeline, and a `stopper` that commands a halt in `recovery`.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Instant,
};

use color_eyre::eyre::Result;
use component::{Component, ComponentError, FieldValues};
use config::{Config, ComponentArgs, ComponentFactory, ConfigError};
use executor::{ExecutorBase, PipelineSpec, StandardExecutor};
use mimalloc_rust::GlobalMiMalloc;
use blackboard::{
    fields::{FieldRef, FieldValue},
    Route, Trajectory, TrajectoryPoint, VehicleState,
};
use logging::NullLoggingManager;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use vehicle::{VehicleInterface, VehicleReading};

#[global_allocator]
static GLOBAL_MIMALLOC: GlobalMiMalloc = GlobalMiMalloc;

/// Reports the vehicle's own speed/position as `vehicle`. Simulates a
/// sensor dropout after a fixed number of ticks so the demo exercises the
/// essential-fault -> `recovery` pipeline switch.
struct Sensor {
    ticks: u64,
    fault_after: u64,
    position: f64,
}

impl Component for Sensor {
    fn update(&mut self, _inputs: FieldValues) -> Result<Option<FieldValues>, ComponentError> {
        self.ticks += 1;
        self.position += 0.1;
        let state = VehicleState {
            speed: 3.0,
            position: (self.position, 0.0),
            heading: 0.0,
        };
        Ok(Some(FieldValues::Named(vec![FieldValue::Vehicle(state)])))
    }

    fn rate(&self) -> Option<f64> {
        Some(10.0)
    }

    fn healthy(&self) -> bool {
        self.ticks < self.fault_after
    }

    fn state_inputs(&self) -> Vec<FieldRef> {
        vec![]
    }

    fn state_outputs(&self) -> Vec<FieldRef> {
        vec![FieldRef::named("vehicle")]
    }
}

/// Plans a single waypoint a fixed distance ahead of the vehicle's current
/// position.
struct Planner;

impl Component for Planner {
    fn update(&mut self, inputs: FieldValues) -> Result<Option<FieldValues>, ComponentError> {
        let FieldValues::Named(values) = inputs else {
            return Ok(None);
        };
        let Some(FieldValue::Vehicle(vehicle)) = values.into_iter().next() else {
            return Ok(None);
        };
        let route = Route {
            waypoints: vec![(vehicle.position.0 + 5.0, vehicle.position.1)],
        };
        Ok(Some(FieldValues::Named(vec![FieldValue::Route(route)])))
    }

    fn state_inputs(&self) -> Vec<FieldRef> {
        vec![FieldRef::named("vehicle")]
    }

    fn state_outputs(&self) -> Vec<FieldRef> {
        vec![FieldRef::named("route")]
    }
}

/// Tracks the planned route with a one-point trajectory at cruising speed.
struct Controller;

impl Component for Controller {
    fn update(&mut self, inputs: FieldValues) -> Result<Option<FieldValues>, ComponentError> {
        let FieldValues::Named(values) = inputs else {
            return Ok(None);
        };
        let Some(FieldValue::Route(route)) = values.into_iter().next() else {
            return Ok(None);
        };
        let trajectory = Trajectory {
            points: route
                .waypoints
                .iter()
                .map(|&position| TrajectoryPoint { t: 1.0, position, speed: 3.0 })
                .collect(),
        };
        Ok(Some(FieldValues::Named(vec![FieldValue::Trajectory(trajectory)])))
    }

    fn state_inputs(&self) -> Vec<FieldRef> {
        vec![FieldRef::named("route")]
    }

    fn state_outputs(&self) -> Vec<FieldRef> {
        vec![FieldRef::named("trajectory")]
    }
}

/// Commands a zero-speed trajectory. Runs only in `recovery`, which has no
/// perception phase of its own, so the `sensor`'s unhealth never blocks
/// `recovery`'s own sensor validation.
struct Stopper;

impl Component for Stopper {
    fn update(&mut self, _inputs: FieldValues) -> Result<Option<FieldValues>, ComponentError> {
        let trajectory = Trajectory {
            points: vec![TrajectoryPoint { t: 0.0, position: (0.0, 0.0), speed: 0.0 }],
        };
        Ok(Some(FieldValues::Named(vec![FieldValue::Trajectory(trajectory)])))
    }

    fn state_inputs(&self) -> Vec<FieldRef> {
        vec![]
    }

    fn state_outputs(&self) -> Vec<FieldRef> {
        vec![FieldRef::named("trajectory")]
    }
}

/// Builds the demo's four components by the `type` named in
/// `drive_mission_demo.yaml`, via a build-time match instead of runtime
/// reflection.
struct DemoComponentFactory;

impl ComponentFactory for DemoComponentFactory {
    fn create(&self, name: &str, type_name: &str, _args: Option<&ComponentArgs>) -> Result<Box<dyn Component>, ConfigError> {
        match type_name {
            "Sensor" => Ok(Box::new(Sensor { ticks: 0, fault_after: 15, position: 0.0 })),
            "Planner" => Ok(Box::new(Planner)),
            "Controller" => Ok(Box::new(Controller)),
            "Stopper" => Ok(Box::new(Stopper)),
            other => Err(ConfigError::ComponentNotCreated {
                name: name.to_string(),
                type_name: other.to_string(),
                reason: "no such component type in this demo".to_string(),
            }),
        }
    }
}

/// A vehicle interface standing in for real hardware: reports a fixed
/// initial speed that coasts down once the mission enters `recovery`,
/// letting `StandardExecutor::done` observe a natural stop.
struct StubVehicle {
    start: Instant,
    speed: Mutex<f64>,
}

impl VehicleInterface for StubVehicle {
    fn time(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn hardware_faults(&self) -> HashSet<String> {
        HashSet::new()
    }

    fn last_reading(&self) -> Option<VehicleReading> {
        let mut speed = self.speed.lock().expect("vehicle speed mutex poisoned");
        *speed = (*speed - 0.1).max(0.0);
        Some(VehicleReading { speed: *speed })
    }
}

fn main() -> Result<()> {
    init_tracing()?;

    let vehicle: Arc<dyn VehicleInterface> = Arc::new(StubVehicle {
        start: Instant::now(),
        speed: Mutex::new(3.0),
    });
    let logging = Box::new(NullLoggingManager::new());

    let mut executor = ExecutorBase::new(vehicle, logging, "drive", StandardExecutor::new());

    let graph = Config::load("demos/drive_mission_demo.yaml", &DemoComponentFactory)?;
    executor.load_computation_graph(graph);

    executor.add_pipeline("drive", PipelineSpec::new().perceive("sensor").plan("planner").act("controller"))?;
    executor.add_pipeline("recovery", PipelineSpec::new().act("stopper"))?;

    let interrupted = executor.interrupt_handle();
    ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))?;

    executor.run()?;

    Ok(())
}

fn init_tracing() -> Result<()> {
    color_eyre::install()?;
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
    Ok(())
}
