//! `ExecutorBase`: owns every constructed component, the pipelines built
//! from them, and the `run`/`run_until_switch`/`validate_sensors` state
//! machine that drives a mission from start to shutdown.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};

use blackboard::{fields::FieldRef, AllState, MissionType};
use clock::TimedLooper;
use component::{ComponentExecutor, ComponentExecutorConfig};
use config::ResolvedComputationGraph;
use debugger::{DebugSink, DebugValue, Debugger};
use graph::GraphDescriptor;
use logging::LoggingManager;
use task::labels::TaskLabels;
use vehicle::{VehicleInterface, DISENGAGED};

use crate::pipeline::{Phase, Pipeline, PipelineSpec, SharedExecutor};

/// The mandatory recovery pipeline's name. Every mission must register a
/// pipeline under this name before `run` is called.
pub const RECOVERY_PIPELINE: &str = "recovery";

/// The overridable mission-logic hook `ExecutorBase::run_until_switch`
/// calls each tick (`update`) and checks each tick to decide whether the
/// mission is over (`done`). `StandardExecutor` overrides only `done`.
pub trait MissionLogic: Send {
    /// Called once, after sensor validation succeeds and before the first
    /// tick.
    fn begin(&mut self, _state: &mut AllState) {}

    /// Called once per tick, between the perception and planning phases.
    /// Returning `Some(name)` different from the current pipeline requests
    /// a switch; returning `None` or the current pipeline's own name
    /// continues it.
    fn update(&mut self, _state: &mut AllState) -> Option<String> {
        None
    }

    /// Called once per tick, after every phase has run. Returning `true`
    /// ends the mission (`run_until_switch` returns `Ok(None)`).
    fn done(&self, _state: &AllState, _vehicle: &dyn VehicleInterface) -> bool {
        false
    }

    /// Called once, when the mission is ending (normal exit only, not on
    /// a hard error path).
    fn end(&mut self, _state: &mut AllState) {}
}

/// Errors this crate can surface: malformed pipeline wiring, plus every
/// collaborator's error wrapped through.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ExecutorError {
    /// The computation graph itself is malformed (unsatisfied input,
    /// missing output, ...).
    #[error(transparent)]
    Graph(#[from] graph::GraphError),

    /// A pipeline phase names a component that was never registered.
    #[error("pipeline '{pipeline}' references unknown component '{component}'")]
    UnknownPipelineComponent {
        /// The pipeline being built.
        pipeline: String,
        /// The undeclared component name.
        component: String,
    },

    /// `run()` was called before the configured initial pipeline was
    /// added.
    #[error("initial pipeline '{0}' was never added")]
    MissingInitialPipeline(String),

    /// `run()` was called before the mandatory `recovery` pipeline was
    /// added.
    #[error("mandatory 'recovery' pipeline was never added")]
    MissingRecoveryPipeline,

    /// A component failed during `start()`/`initialize()`.
    #[error(transparent)]
    Component(#[from] component::ComponentError),
}

/// Splits `text` on `'\n'`, dropping a trailing empty line left by a final
/// newline. Used by the `executor_debug_*` free functions, which have no
/// `ComponentExecutor` of their own to delegate line-splitting to.
fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    if lines.last().is_some_and(String::is_empty) {
        let _ = lines.pop();
    }
    lines
}

/// Prints `message` to stdout and forwards it to the installed logging
/// manager as if it were the executor's own captured output.
pub fn executor_debug_print(message: &str) {
    println!("Execution: {message}");
    logging::global::with(|manager| manager.log_component_stdout("Executor", &split_lines(message)));
}

/// As `executor_debug_print`, but to stderr.
pub fn executor_debug_stderr(message: &str) {
    eprintln!("Execution: {message}");
    logging::global::with(|manager| manager.log_component_stderr("Executor", &split_lines(message)));
}

/// Logs `error` with a captured backtrace under `context`.
pub fn executor_debug_exception(context: &str, error: &dyn std::error::Error) {
    executor_debug_stderr(&format!("{context}: {error}"));
    executor_debug_stderr(&format!("{}", std::backtrace::Backtrace::capture()));
}

/// Routes the debug bus to the process-wide logging handle. Registered
/// once, at construction; a no-op until `ExecutorBase::run` installs a
/// manager, since `logging::global::with` itself is a no-op when nothing
/// is installed.
struct GlobalLoggingSink;

impl DebugSink for GlobalLoggingSink {
    fn on_value(&self, source: &str, key: &str, value: &DebugValue) {
        logging::global::with(|manager| manager.on_value(source, key, value));
    }

    fn on_event(&self, source: &str, label: &str) {
        logging::global::with(|manager| manager.on_event(source, label));
    }
}

/// Owns every constructed component, the pipelines built from them, and
/// drives the mission loop. Generic over the mission-logic hook so the
/// `update`/`done` overrides live outside this struct, the way a Python
/// subclass would override them on `ExecutorBase` — see `MissionLogic`.
pub struct ExecutorBase<M: MissionLogic> {
    vehicle: Arc<dyn VehicleInterface>,
    logging: Option<Box<dyn LoggingManager>>,
    debugger: Debugger,
    descriptor: GraphDescriptor,
    require_engaged: bool,
    all_components: HashMap<String, SharedExecutor>,
    always_run: Phase,
    pipelines: HashMap<String, Pipeline>,
    initial_pipeline: String,
    current_pipeline: String,
    state: AllState,
    last_hardware_faults: HashSet<String>,
    last_loop_time: Instant,
    interrupted: Arc<AtomicBool>,
    mission: M,
}

impl<M: MissionLogic> ExecutorBase<M> {
    /// Builds an executor with no components or pipelines registered yet.
    /// Call `load_computation_graph` and `add_pipeline`/`always_run_component`
    /// before `run`.
    pub fn new(
        vehicle: Arc<dyn VehicleInterface>,
        logging: Box<dyn LoggingManager>,
        initial_pipeline: impl Into<String>,
        mission: M,
    ) -> Self {
        let mut debugger = Debugger::new();
        debugger.register(Arc::new(GlobalLoggingSink));

        Self {
            vehicle,
            logging: Some(logging),
            debugger,
            descriptor: GraphDescriptor::new(),
            require_engaged: false,
            all_components: HashMap::new(),
            always_run: Phase::new(),
            pipelines: HashMap::new(),
            initial_pipeline: initial_pipeline.into(),
            current_pipeline: String::new(),
            state: AllState::zero(),
            last_hardware_faults: HashSet::new(),
            last_loop_time: Instant::now(),
            interrupted: Arc::new(AtomicBool::new(false)),
            mission,
        }
    }

    /// A handle that can be used to request a switch to `recovery` (and,
    /// if already there, a mission exit) from outside the loop, e.g. a
    /// `ctrlc::set_handler` closure.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// The currently active pipeline's name. Empty until `run` starts it.
    pub fn current_pipeline(&self) -> &str {
        &self.current_pipeline
    }

    /// Registers every resolved component from a loaded configuration,
    /// adopting its descriptor and hardware-fault policy. Interning
    /// (`register_component`'s by-name dedup) means calling this twice with
    /// overlapping names keeps the first registration.
    pub fn load_computation_graph(&mut self, graph: ResolvedComputationGraph) {
        self.require_engaged = graph.require_engaged;
        self.descriptor = graph.descriptor;
        for resolved in graph.components {
            let _ = self.register_component(resolved);
        }
    }

    /// Wraps and interns one resolved component, applying any registered
    /// replay substitution. Calling this twice with the same name returns
    /// the same instance both times, rather than constructing a second
    /// executor.
    pub fn register_component(&mut self, resolved: config::ResolvedComponent) -> SharedExecutor {
        if let Some(existing) = self.all_components.get(&resolved.name) {
            return existing.clone();
        }

        if resolved.multiprocess {
            tracing::warn!(component = %resolved.name, "multiprocess wrapping was requested but is not implemented; running in-process");
        }

        let component = match self.logging.as_ref() {
            Some(logging) => logging.component_replayer(self.vehicle.clone(), &resolved.name, resolved.component),
            None => resolved.component,
        };

        let mut executor = ComponentExecutor::new(
            component,
            ComponentExecutorConfig {
                name: resolved.name.clone(),
                essential: resolved.essential,
                do_debug: resolved.debug,
                print_stdout: resolved.print,
                print_stderr: resolved.print,
                rate_override: resolved.rate_override,
            },
        );
        executor.wire_debugger(self.debugger.clone());

        let handle: SharedExecutor = Arc::new(Mutex::new(executor));
        let _ = self.all_components.insert(resolved.name.clone(), handle.clone());
        handle
    }

    /// Registers a component to run every tick regardless of the active
    /// pipeline, outside graph validation. Used for logging/telemetry
    /// components that have no declared inputs/outputs of interest to the
    /// computation graph.
    pub fn always_run_component(&mut self, name: impl Into<String>, component: Box<dyn component::Component>) {
        let name = name.into();
        let mut executor = ComponentExecutor::new(
            component,
            ComponentExecutorConfig {
                name: name.clone(),
                essential: false,
                do_debug: false,
                print_stdout: false,
                print_stderr: false,
                rate_override: None,
            },
        );
        executor.wire_debugger(self.debugger.clone());
        let handle: SharedExecutor = Arc::new(Mutex::new(executor));
        let _ = self.always_run.insert(name.clone(), handle.clone());
        let _ = self.all_components.insert(name, handle);
    }

    /// Declares a logging state-snapshot component and registers it
    /// always-run.
    pub fn log_state(&mut self, fields: &[String], rate: Option<f64>) {
        let component = self.logging_mut().log_state(fields, rate);
        self.always_run_component("__state_logger__", component);
    }

    /// Declares a logging vehicle-behavior component and registers it
    /// always-run.
    pub fn log_vehicle_behavior(&mut self) {
        let vehicle = self.vehicle.clone();
        let component = self.logging_mut().log_vehicle_behavior(vehicle);
        self.always_run_component("__vehicle_behavior_logger__", component);
    }

    /// Declares that the named components' outputs should be persisted.
    pub fn log_components(&mut self, names: &[String]) {
        self.logging_mut().log_components(names);
    }

    /// Starts recording the named ROS topics.
    pub fn log_ros_topics(&mut self, topics: &[String], opts: &str) {
        if let Some(command) = self.logging_mut().log_ros_topics(topics, opts) {
            tracing::info!(%command, "recording ROS topics");
        }
    }

    /// Declares that the named components should be replayed from
    /// `folder` instead of constructed live.
    pub fn replay_components(&mut self, names: &[String], folder: &std::path::Path) {
        self.logging_mut().replay_components(names, folder);
    }

    /// Declares that the named ROS topics should be replayed from
    /// `folder`.
    pub fn replay_topics(&mut self, names: &[String], folder: &std::path::Path) {
        self.logging_mut().replay_topics(names, folder);
    }

    fn logging_mut(&mut self) -> &mut dyn LoggingManager {
        self.logging
            .as_deref_mut()
            .expect("logging manager already installed globally; call setup methods before run()")
    }

    /// Builds a pipeline from component names, looking each up in the
    /// interning map and validating input-satisfaction/output-declaration
    /// against the computation graph, threading the provided-field set
    /// perception -> planning -> other.
    pub fn add_pipeline(&mut self, name: impl Into<String>, spec: PipelineSpec) -> Result<(), ExecutorError> {
        let name = name.into();

        let perception = self.build_phase(&name, &spec.perception)?;
        let planning = self.build_phase(&name, &spec.planning)?;
        let other = self.build_phase(&name, &spec.other)?;

        let outputs = self.declared_outputs();
        let provided = graph::validate(&self.descriptor, &outputs, &spec.perception, &HashSet::new())?;
        let provided = graph::validate(&self.descriptor, &outputs, &spec.planning, &provided)?;
        let _provided = graph::validate(&self.descriptor, &outputs, &spec.other, &provided)?;

        let _ = self.pipelines.insert(name, Pipeline { perception, planning, other });
        Ok(())
    }

    fn build_phase(&self, pipeline: &str, names: &[String]) -> Result<Phase, ExecutorError> {
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        let mut phase = Phase::new();
        for (component_name, _) in self.descriptor.iter() {
            if !wanted.contains(component_name) {
                continue;
            }
            let executor = self.all_components.get(component_name).cloned().ok_or_else(|| ExecutorError::UnknownPipelineComponent {
                pipeline: pipeline.to_string(),
                component: component_name.to_string(),
            })?;
            let _ = phase.insert(component_name.to_string(), executor);
        }
        Ok(phase)
    }

    fn declared_outputs(&self) -> HashMap<String, Vec<FieldRef>> {
        self.all_components
            .iter()
            .map(|(name, executor)| {
                (
                    name.clone(),
                    executor.lock().expect("component executor mutex poisoned").outputs().to_vec(),
                )
            })
            .collect()
    }

    fn min_positive_dt<'a>(&self, executors: impl Iterator<Item = &'a SharedExecutor>) -> Duration {
        let min = executors
            .map(|executor| executor.lock().expect("component executor mutex poisoned").dt())
            .filter(|dt| *dt > 0.0)
            .fold(f64::INFINITY, f64::min);
        if min.is_finite() {
            Duration::from_secs_f64(min)
        } else {
            // No component in this phase set declares a rate: nothing paces
            // the loop but wall-clock, so run as fast as this thread can.
            Duration::from_millis(1)
        }
    }

    fn event(&self, description: &str) {
        logging::global::with(|manager| manager.event(description));
        tracing::info!(%description, "mission event");
    }

    fn set_exit_reason(&self, reason: &str) {
        logging::global::with(|manager| manager.exit_event(reason));
        tracing::info!(%reason, "mission exit reason set");
    }

    fn maybe_log_hang(&self) {
        if self.last_loop_time.elapsed() > Duration::from_millis(500) {
            tracing::warn!(backtrace = %std::backtrace::Backtrace::capture(), "component may have hung");
        }
    }

    /// Runs every due component in `phase` (or every component, if
    /// `force`), in computation-graph order. Health is evaluated for every
    /// member of `phase` regardless of whether it was due this tick, not
    /// just the ones that ran, so a rate-limited essential component that
    /// latched unhealthy on a non-due tick still triggers a fault this
    /// tick rather than waiting for its next scheduled update. Returns the
    /// names (and essential flags) of components that are unhealthy.
    fn run_phase(&mut self, phase: &Phase, force: bool) -> Vec<(String, bool)> {
        let mut faults = Vec::new();
        for (name, shared) in phase {
            let mut executor = shared.lock().expect("component executor mutex poisoned");
            let updated = if force {
                executor.force_update(self.state.t, &mut self.state);
                true
            } else {
                executor.update(self.state.t, &mut self.state)
            };

            let stdout = executor.take_stdout_lines();
            let stderr = executor.take_stderr_lines();
            if !stdout.is_empty() {
                logging::global::with(|manager| manager.log_component_stdout(name, &stdout));
            }
            if !stderr.is_empty() {
                logging::global::with(|manager| manager.log_component_stderr(name, &stderr));
            }

            if updated {
                let outputs = executor.outputs().to_vec();
                let state = &self.state;
                logging::global::with(|manager| manager.log_component_update(name, state, &outputs));
            }

            if !executor.healthy() {
                faults.push((name.clone(), executor.essential()));
            }
        }
        faults
    }

    fn handle_faults(&self, phase: &str, faults: Vec<(String, bool)>) -> Option<String> {
        for (name, essential) in faults {
            let task = TaskLabels::new(phase, &name, &self.current_pipeline);
            if essential && self.current_pipeline != RECOVERY_PIPELINE {
                tracing::warn!(task_id = %task.unique_id(), "essential component is unhealthy, switching to recovery");
                return Some(RECOVERY_PIPELINE.to_string());
            }
            tracing::warn!(task_id = %task.unique_id(), "non-essential component is unhealthy, ignoring");
        }
        None
    }

    fn check_hardware_faults(&mut self) {
        let faults = self.vehicle.hardware_faults();
        let mut current = Vec::new();
        let mut newly_seen = Vec::new();

        for fault in &faults {
            if fault.as_str() == DISENGAGED && !self.require_engaged {
                continue;
            }
            if !self.last_hardware_faults.contains(fault) {
                newly_seen.push(fault.clone());
            }
            current.push(fault.clone());
        }

        for fault in &newly_seen {
            self.event(&format!("hardware fault: {fault}"));
        }

        if !current.is_empty() {
            let rendered: Vec<String> = current
                .iter()
                .map(|fault| {
                    if newly_seen.contains(fault) {
                        format!("{fault} (new)")
                    } else {
                        fault.clone()
                    }
                })
                .collect();
            tracing::info!(faults = %rendered.join(", "), "hardware faults asserted");
        }

        self.last_hardware_faults = faults;
    }

    /// Runs the current pipeline's perception phase (plus always-run,
    /// forced) until every perception executor reports healthy, or
    /// `numsteps` attempts are exhausted without that happening (returns
    /// `Ok(false)`). With `numsteps` of `None`, loops until healthy or
    /// interrupted.
    pub fn validate_sensors(&mut self, numsteps: Option<u32>) -> Result<bool, ExecutorError> {
        let pipeline = self
            .pipelines
            .get(&self.current_pipeline)
            .ok_or_else(|| ExecutorError::MissingInitialPipeline(self.current_pipeline.clone()))?;

        if pipeline.perception.is_empty() {
            return Ok(true);
        }

        let perception = pipeline.perception.clone();
        let always_run = self.always_run.clone();
        let dt_min = self.min_positive_dt(perception.values().chain(always_run.values()));
        let mut looper = TimedLooper::new(dt_min, "sensor validation");

        let mut attempts = 0u32;
        loop {
            if self.interrupted.load(Ordering::Acquire) {
                return Ok(false);
            }
            if !looper.wait() {
                return Ok(false);
            }

            self.state.t = self.vehicle.time();
            logging::global::with(|manager| manager.set_vehicle_time(self.state.t));
            self.last_loop_time = Instant::now();

            self.check_hardware_faults();
            let _ = self.run_phase(&perception, false);
            let healthy = perception.values().all(|executor| executor.lock().expect("component executor mutex poisoned").healthy());

            for (name, faulted_essential) in self.run_phase(&always_run, true) {
                tracing::warn!(component = %name, essential = faulted_essential, "always-run component is unhealthy during sensor validation");
            }

            attempts += 1;
            if healthy {
                return Ok(true);
            }
            if let Some(limit) = numsteps {
                if attempts >= limit {
                    return Ok(false);
                }
            }
        }
    }

    /// Runs one pipeline to completion or to its next switch, ticking
    /// perception, the mission-logic hook, planning, other, and always-run
    /// in order. Returns `Ok(None)` on normal mission
    /// termination (`self.mission.done()` became true), or
    /// `Ok(Some(name))` to request a switch (to `name`, or to `recovery`
    /// if an essential component faulted). An interrupt is reported via
    /// `self.interrupted`, not through the return value; callers must
    /// check it themselves after this returns.
    pub fn run_until_switch(&mut self) -> Result<Option<String>, ExecutorError> {
        if self.current_pipeline == RECOVERY_PIPELINE {
            self.state.mission.r#type = MissionType::RecoveryStop;
        }

        let pipeline = self
            .pipelines
            .get(&self.current_pipeline)
            .ok_or_else(|| ExecutorError::MissingInitialPipeline(self.current_pipeline.clone()))?
            .clone();
        let always_run = self.always_run.clone();

        let dt_min = self.min_positive_dt(
            pipeline
                .perception
                .values()
                .chain(pipeline.planning.values())
                .chain(pipeline.other.values())
                .chain(always_run.values()),
        );
        let mut looper = TimedLooper::new(dt_min, "mission executor");

        loop {
            if self.interrupted.load(Ordering::Acquire) {
                return Ok(Some(RECOVERY_PIPELINE.to_string()));
            }
            let _ = looper.wait();

            self.state.t = self.vehicle.time();
            logging::global::with(|manager| manager.set_vehicle_time(self.state.t));
            self.last_loop_time = Instant::now();

            logging::global::with(|manager| {
                if let Some(player) = manager.rosbag_player() {
                    player.update_topics(self.state.t);
                }
            });

            self.check_hardware_faults();

            let faults = self.run_phase(&pipeline.perception, false);
            if let Some(next) = self.handle_faults("perception", faults) {
                return Ok(Some(next));
            }

            if let Some(next) = self.mission.update(&mut self.state) {
                if next != self.current_pipeline {
                    tracing::info!(pipeline = %next, "mission logic requested a pipeline switch");
                    return Ok(Some(next));
                }
            }

            let faults = self.run_phase(&pipeline.planning, false);
            if let Some(next) = self.handle_faults("planning", faults) {
                return Ok(Some(next));
            }

            let faults = self.run_phase(&pipeline.other, false);
            if let Some(next) = self.handle_faults("other", faults) {
                return Ok(Some(next));
            }

            let faults = self.run_phase(&always_run, true);
            if let Some(next) = self.handle_faults("always_run", faults) {
                return Ok(Some(next));
            }

            if self.mission.done(&self.state, self.vehicle.as_ref()) {
                return Ok(None);
            }
        }
    }

    /// Resolves an interrupt observed after `run_until_switch`/
    /// `validate_sensors` returned: switches to `recovery` (recording an
    /// event) unless already there, in which case the mission exits.
    /// Returns `true` if the mission should exit.
    fn handle_interrupt(&mut self) -> bool {
        self.interrupted.store(false, Ordering::Release);
        if self.current_pipeline == RECOVERY_PIPELINE {
            self.set_exit_reason("Ctrl+C interrupt during recovery");
            return true;
        }
        self.current_pipeline = RECOVERY_PIPELINE.to_string();
        self.event("Ctrl+C pressed, switching to recovery mode");
        self.maybe_log_hang();
        false
    }

    /// Runs the mission to completion: sanity-checks pipeline wiring,
    /// starts every component, validates sensors, then drives
    /// `run_until_switch` until it returns `None` or an unrecoverable exit
    /// condition is reached. Every started component is stopped, and the
    /// logging manager closed, on every exit path — including one where
    /// sensor validation itself failed.
    pub fn run(&mut self) -> Result<(), ExecutorError> {
        if !self.pipelines.contains_key(&self.initial_pipeline) {
            return Err(ExecutorError::MissingInitialPipeline(self.initial_pipeline.clone()));
        }
        if !self.pipelines.contains_key(RECOVERY_PIPELINE) {
            return Err(ExecutorError::MissingRecoveryPipeline);
        }

        for executor in self.all_components.values() {
            if let Err(err) = executor.lock().expect("component executor mutex poisoned").start() {
                tracing::error!(error = %err, "component failed to initialize");
            }
        }

        let logging = self.logging.take().expect("logging manager already installed");
        logging::global::set(logging);

        self.state = AllState::zero();
        self.current_pipeline = self.initial_pipeline.clone();
        self.last_loop_time = Instant::now();

        let validated = match self.validate_sensors(None) {
            Ok(true) => true,
            Ok(false) => {
                if self.interrupted.swap(false, Ordering::AcqRel) {
                    self.event("Ctrl+C interrupt during sensor validation");
                    self.maybe_log_hang();
                }
                self.event("Sensor validation failed");
                self.set_exit_reason("Sensor validation failed");
                false
            }
            Err(err) => {
                executor_debug_exception("sensor validation", &err);
                self.set_exit_reason("Sensor validation failed");
                false
            }
        };

        if validated {
            self.mission.begin(&mut self.state);

            loop {
                self.state.t = self.vehicle.time();
                logging::global::with(|manager| manager.set_vehicle_time(self.state.t));
                logging::global::with(|manager| manager.pipeline_start_event(&self.current_pipeline));

                match self.run_until_switch() {
                    Ok(None) => {
                        self.set_exit_reason("normal exit");
                        break;
                    }
                    Ok(Some(next)) => {
                        if self.interrupted.load(Ordering::Acquire) {
                            if self.handle_interrupt() {
                                break;
                            }
                            continue;
                        }

                        let next = if self.pipelines.contains_key(&next) {
                            next
                        } else {
                            tracing::warn!(pipeline = %next, "requested pipeline not found, switching to recovery");
                            RECOVERY_PIPELINE.to_string()
                        };

                        if self.current_pipeline == RECOVERY_PIPELINE && next == RECOVERY_PIPELINE {
                            tracing::error!("recovery pipeline is not working, exiting");
                            self.set_exit_reason("recovery pipeline not working");
                            break;
                        }

                        self.current_pipeline = next;

                        match self.validate_sensors(Some(1)) {
                            Ok(true) => {}
                            Ok(false) => {
                                self.event(&format!(
                                    "sensors in desired pipeline {} are not working, switching to recovery",
                                    self.current_pipeline
                                ));
                                self.current_pipeline = RECOVERY_PIPELINE.to_string();
                            }
                            Err(err) => {
                                executor_debug_exception("sensor re-validation", &err);
                                self.current_pipeline = RECOVERY_PIPELINE.to_string();
                            }
                        }

                        if self.interrupted.load(Ordering::Acquire) && self.handle_interrupt() {
                            break;
                        }
                    }
                    Err(err) => {
                        executor_debug_exception("mission tick", &err);
                        self.set_exit_reason("mission tick failed");
                        break;
                    }
                }
            }

            self.mission.end(&mut self.state);
            self.event("mission execution ended");
        }

        for executor in self.all_components.values() {
            if let Err(err) = executor.lock().expect("component executor mutex poisoned").stop() {
                tracing::error!(error = %err, "component failed to clean up");
            }
        }

        logging::global::with(|manager| manager.close());
        logging::global::clear();

        Ok(())
    }
}
