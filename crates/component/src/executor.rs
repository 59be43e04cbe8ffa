//! `ComponentExecutor`: wraps a single `Component`, scheduling it at its
//! declared rate, capturing its stdout/stderr, trapping exceptions, and
//! reading/writing the blackboard fields it declared.

use blackboard::{
    fields::{self, FieldRef, FieldValue},
    AllState,
};
use debugger::ChildDebugger;

use crate::{io_capture, Component, ComponentError, FieldValues};

/// Construction-time configuration for a `ComponentExecutor`, populated
/// from the component's own declarations plus any descriptor overrides
/// (`essential`, `rate`, `print`, `debug` - see the `config` crate).
#[derive(Debug, Clone)]
pub struct ComponentExecutorConfig {
    /// The component's name, as declared in the computation graph.
    pub name: String,
    /// Whether this component's unhealth should trigger a pipeline switch
    /// to `recovery`.
    pub essential: bool,
    /// Whether a `ChildDebugger` should be installed on the component.
    pub do_debug: bool,
    /// Whether captured stdout lines should also be echoed to the real
    /// stdout.
    pub print_stdout: bool,
    /// Whether captured stderr lines should also be echoed to the real
    /// stderr.
    pub print_stderr: bool,
    /// Overrides the component's own `rate()` when set (the descriptor's
    /// `rate` key wins over `Component::rate()` - see DESIGN.md).
    pub rate_override: Option<f64>,
}

impl Default for ComponentExecutorConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            essential: true,
            do_debug: true,
            print_stdout: true,
            print_stderr: true,
            rate_override: None,
        }
    }
}

/// Wraps one `Component`, owning its rate-limiting schedule, health
/// bookkeeping, and captured I/O.
pub struct ComponentExecutor {
    name: String,
    essential: bool,
    do_debug: bool,
    print_stdout: bool,
    print_stderr: bool,
    inputs: Vec<FieldRef>,
    outputs: Vec<FieldRef>,
    dt: f64,
    last_update_time: Option<f64>,
    next_update_time: Option<f64>,
    had_exception: bool,
    num_overruns: u64,
    overrun_amount: f64,
    started: bool,
    pending_stdout: Vec<String>,
    pending_stderr: Vec<String>,
    component: Box<dyn Component>,
}

impl ComponentExecutor {
    /// Wraps `component`, caching its declared inputs/outputs and resolving
    /// its schedule period (`dt`). A `rate_override` of `Some(hz)` wins over
    /// `component.rate()`; no rate at all means `dt == 0.0`, i.e. "run every
    /// tick."
    pub fn new(component: Box<dyn Component>, config: ComponentExecutorConfig) -> Self {
        let inputs = component.state_inputs();
        let outputs = component.state_outputs();
        let rate = config.rate_override.or_else(|| component.rate());
        let dt = rate.filter(|hz| *hz > 0.0).map(|hz| 1.0 / hz).unwrap_or(0.0);

        Self {
            name: config.name,
            essential: config.essential,
            do_debug: config.do_debug,
            print_stdout: config.print_stdout,
            print_stderr: config.print_stderr,
            inputs,
            outputs,
            dt,
            last_update_time: None,
            next_update_time: None,
            had_exception: false,
            num_overruns: 0,
            overrun_amount: 0.0,
            started: false,
            pending_stdout: Vec::new(),
            pending_stderr: Vec::new(),
            component,
        }
    }

    /// The component's declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether unhealth in this component should trigger a pipeline switch
    /// to `recovery`.
    pub fn essential(&self) -> bool {
        self.essential
    }

    /// The fields (or `[FieldRef::All]`) this component reads, in
    /// declared order.
    pub fn inputs(&self) -> &[FieldRef] {
        &self.inputs
    }

    /// The fields (or `[FieldRef::All]`) this component writes, in
    /// declared order.
    pub fn outputs(&self) -> &[FieldRef] {
        &self.outputs
    }

    /// The resolved schedule period. `0.0` means "run every tick."
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of overruns observed so far.
    pub fn num_overruns(&self) -> u64 {
        self.num_overruns
    }

    /// Cumulative overrun amount, seconds.
    pub fn overrun_amount(&self) -> f64 {
        self.overrun_amount
    }

    /// `component.healthy() && !had_exception`: an executor latched by a
    /// past exception never recovers within the same run.
    pub fn healthy(&self) -> bool {
        self.component.healthy() && !self.had_exception
    }

    /// Whether this executor has ever raised during `update_now`.
    pub fn had_exception(&self) -> bool {
        self.had_exception
    }

    /// Installs a `ChildDebugger` if `do_debug` was requested; otherwise a
    /// no-op.
    pub fn wire_debugger(&mut self, debugger: debugger::Debugger) {
        if self.do_debug {
            self.component.set_debugger(debugger.for_source(self.name.clone()));
        }
    }

    /// Calls `initialize()` exactly once.
    pub fn start(&mut self) -> Result<(), ComponentError> {
        if self.started {
            return Ok(());
        }
        self.component.initialize().map_err(|err| ComponentError::InitializeFailed {
            name: self.name.clone(),
            reason: err.to_string(),
        })?;
        self.started = true;
        Ok(())
    }

    /// Calls `cleanup()`. Attempted for every component that was
    /// successfully started, even if others failed; the caller should not
    /// let one failure here skip the rest.
    pub fn stop(&mut self) -> Result<(), ComponentError> {
        if !self.started {
            return Ok(());
        }
        self.component.cleanup().map_err(|err| ComponentError::CleanupFailed {
            name: self.name.clone(),
            reason: err.to_string(),
        })
    }

    /// Drains and returns any stdout lines captured by the last
    /// `update_now`.
    pub fn take_stdout_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_stdout)
    }

    /// Drains and returns any stderr lines captured by the last
    /// `update_now`.
    pub fn take_stderr_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_stderr)
    }

    /// Runs this component's tick if it is due. Returns `false` without
    /// running anything if `t` has not yet reached the next scheduled
    /// time; returns `true` (having run `update_now`) otherwise.
    pub fn update(&mut self, t: f64, state: &mut AllState) -> bool {
        if self.dt > 0.0 {
            if let Some(next) = self.next_update_time {
                if t < next {
                    return false;
                }
            }
        }

        self.update_now(t, state);
        self.last_update_time = Some(t);

        if self.dt > 0.0 {
            let mut next = self.next_update_time.map(|next| next + self.dt).unwrap_or(t + self.dt);
            if next < t {
                self.num_overruns += 1;
                self.overrun_amount += t - next;
                tracing::warn!(
                    component = %self.name,
                    num_overruns = self.num_overruns,
                    overrun_amount = self.overrun_amount,
                    "component overran its scheduled period"
                );
                next = t + self.dt;
            }
            self.next_update_time = Some(next);
        }

        true
    }

    /// Runs this component's tick unconditionally, ignoring its schedule.
    /// Used for always-run components, which execute every tick regardless
    /// of their own declared rate.
    pub fn force_update(&mut self, t: f64, state: &mut AllState) {
        self.update_now(t, state);
        self.last_update_time = Some(t);
    }

    /// Builds the component's input tuple, runs it under I/O capture,
    /// traps any exception, and writes declared outputs back to the
    /// blackboard.
    fn update_now(&mut self, t: f64, state: &mut AllState) {
        let inputs = match self.gather_inputs(state) {
            Ok(inputs) => inputs,
            Err(err) => {
                tracing::error!(component = %self.name, error = %err, "failed to read component inputs");
                self.had_exception = true;
                return;
            }
        };

        let started_at = std::time::Instant::now();
        let component = &mut self.component;
        let captured = io_capture::capture(move || component.update(inputs));
        let elapsed = started_at.elapsed();

        self.pending_stdout = captured.stdout_lines;
        self.pending_stderr = captured.stderr_lines;

        if self.print_stdout {
            for line in &self.pending_stdout {
                println!("[{}] {line}", self.name);
            }
        }
        if self.print_stderr {
            for line in &self.pending_stderr {
                eprintln!("[{}] {line}", self.name);
            }
        }

        match captured.result {
            Err(panic) => {
                let reason = panic_message(panic);
                tracing::error!(component = %self.name, reason = %reason, elapsed_ms = elapsed.as_millis() as u64, "component panicked during update");
                self.had_exception = true;
            }
            Ok(Err(err)) => {
                tracing::error!(component = %self.name, error = %err, elapsed_ms = elapsed.as_millis() as u64, "component returned an error during update");
                self.had_exception = true;
            }
            Ok(Ok(None)) => {}
            Ok(Ok(Some(outputs))) => {
                if let Err(err) = self.write_outputs(state, t, outputs) {
                    tracing::error!(component = %self.name, error = %err, "failed to write component outputs");
                }
            }
        }
    }

    fn gather_inputs(&self, state: &AllState) -> Result<FieldValues, ComponentError> {
        if matches!(self.inputs.as_slice(), [FieldRef::All]) {
            return Ok(FieldValues::All(Box::new(state.clone())));
        }

        let mut values = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let name = input.name().ok_or_else(|| ComponentError::Field {
                name: self.name.clone(),
                source: blackboard::fields::FieldError::UnknownField("all".to_string()),
            })?;
            let value = fields::read_field(state, name).map_err(|source| ComponentError::Field {
                name: self.name.clone(),
                source,
            })?;
            values.push(value);
        }
        Ok(FieldValues::Named(values))
    }

    fn write_outputs(&self, state: &mut AllState, t: f64, outputs: FieldValues) -> Result<(), ComponentError> {
        match outputs {
            FieldValues::All(all_state) => {
                *state = *all_state;
                Ok(())
            }
            FieldValues::Named(values) => {
                if values.len() != self.outputs.len() {
                    return Err(ComponentError::OutputArity {
                        name: self.name.clone(),
                        expected: self.outputs.len(),
                        got: values.len(),
                    });
                }
                for (field, value) in self.outputs.iter().zip(values) {
                    self.write_one(state, t, field, value)?;
                }
                Ok(())
            }
        }
    }

    fn write_one(&self, state: &mut AllState, t: f64, field: &FieldRef, value: FieldValue) -> Result<(), ComponentError> {
        match field.name() {
            Some(name) => fields::write_field(state, name, value, t).map_err(|source| ComponentError::Field {
                name: self.name.clone(),
                source,
            }),
            None => {
                tracing::warn!(component = %self.name, "an 'all' entry inside a multi-output declaration is ignored");
                Ok(())
            }
        }
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "component panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod test {
    use blackboard::fields::FieldValue;

    use super::*;

    struct CountingComponent {
        calls: std::sync::Arc<std::sync::atomic::AtomicU64>,
        rate: Option<f64>,
        healthy: bool,
    }

    impl Component for CountingComponent {
        fn update(&mut self, _inputs: FieldValues) -> Result<Option<FieldValues>, ComponentError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(None)
        }

        fn rate(&self) -> Option<f64> {
            self.rate
        }

        fn healthy(&self) -> bool {
            self.healthy
        }

        fn state_inputs(&self) -> Vec<FieldRef> {
            vec![]
        }

        fn state_outputs(&self) -> Vec<FieldRef> {
            vec![]
        }
    }

    #[test]
    fn runs_every_tick_when_rate_is_none() {
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
        let component = CountingComponent {
            calls: calls.clone(),
            rate: None,
            healthy: true,
        };
        let mut executor = ComponentExecutor::new(
            Box::new(component),
            ComponentExecutorConfig {
                name: "counter".into(),
                ..Default::default()
            },
        );
        assert_eq!(executor.dt(), 0.0);

        let mut state = AllState::zero();
        for t in 0..5 {
            assert!(executor.update(t as f64, &mut state));
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 5);
    }

    #[test]
    fn force_update_runs_regardless_of_schedule() {
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
        let component = CountingComponent {
            calls: calls.clone(),
            rate: Some(1.0),
            healthy: true,
        };
        let mut executor = ComponentExecutor::new(
            Box::new(component),
            ComponentExecutorConfig {
                name: "forced".into(),
                ..Default::default()
            },
        );
        let mut state = AllState::zero();
        for _ in 0..3 {
            executor.force_update(0.0, &mut state);
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn rate_limits_to_expected_call_count() {
        // rate=10 (dt=0.1), clock advances 0.05s/tick for 1.0s -> 10 calls.
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
        let component = CountingComponent {
            calls: calls.clone(),
            rate: Some(10.0),
            healthy: true,
        };
        let mut executor = ComponentExecutor::new(
            Box::new(component),
            ComponentExecutorConfig {
                name: "ticker".into(),
                ..Default::default()
            },
        );

        let mut state = AllState::zero();
        let mut t = 0.05;
        while t <= 1.0 + 1e-9 {
            let _ = executor.update(t, &mut state);
            t += 0.05;
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 10);
    }

    struct ArityMismatchComponent;

    impl Component for ArityMismatchComponent {
        fn update(&mut self, _inputs: FieldValues) -> Result<Option<FieldValues>, ComponentError> {
            Ok(Some(FieldValues::Named(vec![FieldValue::F64(1.0)])))
        }

        fn state_inputs(&self) -> Vec<FieldRef> {
            vec![]
        }

        fn state_outputs(&self) -> Vec<FieldRef> {
            vec![FieldRef::named("vehicle"), FieldRef::named("route")]
        }
    }

    #[test]
    fn arity_mismatch_is_logged_and_discarded_not_unhealthy() {
        // declares 2 outputs, component returns 1 value.
        let mut executor = ComponentExecutor::new(
            Box::new(ArityMismatchComponent),
            ComponentExecutorConfig {
                name: "mismatched".into(),
                ..Default::default()
            },
        );
        let mut state = AllState::zero();
        let before = state.clone();
        assert!(executor.update(0.0, &mut state));
        assert_eq!(state, before);
        assert!(executor.healthy());
    }

    struct PanickingComponent;

    impl Component for PanickingComponent {
        fn update(&mut self, _inputs: FieldValues) -> Result<Option<FieldValues>, ComponentError> {
            panic!("simulated component failure");
        }

        fn state_inputs(&self) -> Vec<FieldRef> {
            vec![]
        }

        fn state_outputs(&self) -> Vec<FieldRef> {
            vec![]
        }
    }

    #[test]
    fn exception_latches_unhealthy_and_never_unwinds_out() {
        let mut executor = ComponentExecutor::new(
            Box::new(PanickingComponent),
            ComponentExecutorConfig {
                name: "panicker".into(),
                print_stdout: false,
                print_stderr: false,
                ..Default::default()
            },
        );
        let mut state = AllState::zero();
        assert!(executor.update(0.0, &mut state));
        assert!(executor.had_exception());
        assert!(!executor.healthy());
        // Stays latched even though the component would otherwise report healthy.
        assert!(executor.update(1.0, &mut state));
        assert!(!executor.healthy());
    }
}
