//! The process-wide logging handle: a single, set-once slot so free-function
//! diagnostic logging (the `executor_debug_*` helpers in the `executor`
//! crate) can reach the log from contexts that do not carry an
//! `&ExecutorBase`. Installed by `ExecutorBase::run` before the loop starts
//! and cleared at shutdown.

use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::LoggingManager;

static GLOBAL: Lazy<Mutex<Option<Box<dyn LoggingManager>>>> = Lazy::new(|| Mutex::new(None));

/// Installs `manager` as the process-wide logging handle, replacing any
/// previous one.
pub fn set(manager: Box<dyn LoggingManager>) {
    *GLOBAL.lock().expect("logging global mutex poisoned") = Some(manager);
}

/// Clears the process-wide logging handle. Called at mission shutdown.
pub fn clear() {
    *GLOBAL.lock().expect("logging global mutex poisoned") = None;
}

/// Runs `f` with mutable access to the installed logging manager, if any is
/// currently set. A no-op if nothing has been installed (e.g. outside a
/// running mission, or in a unit test that never calls [`set`]).
pub fn with<F>(f: F)
where
    F: FnOnce(&mut dyn LoggingManager),
{
    if let Some(manager) = GLOBAL.lock().expect("logging global mutex poisoned").as_mut() {
        f(manager.as_mut());
    }
}

/// Returns `true` if a logging manager is currently installed.
pub fn is_set() -> bool {
    GLOBAL.lock().expect("logging global mutex poisoned").is_some()
}
