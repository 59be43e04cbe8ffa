//! The field-accessor registry: a parallel `field name -> accessor` mapping
//! over [`AllState`](crate::AllState), used by the graph validator and the
//! component executor to address blackboard fields by name without runtime
//! reflection. Every accessor is a plain function pointer checked once at
//! crate build time, not looked up through a trait object per call.

use std::fmt;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::{AgentState, AllState, Mission, Route, Trajectory, VehicleState};

/// A reference to a blackboard field, or the whole blackboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldRef {
    /// A single named field, e.g. `"vehicle"`.
    Named(String),
    /// The whole blackboard, as declared by a component whose descriptor
    /// lists `"all"` for its inputs or outputs.
    All,
}

impl FieldRef {
    /// Creates a named field reference.
    pub fn named(name: impl Into<String>) -> Self {
        FieldRef::Named(name.into())
    }

    /// Returns `true` if this is the `"all"` sentinel.
    pub fn is_all(&self) -> bool {
        matches!(self, FieldRef::All)
    }

    /// Returns the field name, or `None` for the `"all"` sentinel.
    pub fn name(&self) -> Option<&str> {
        match self {
            FieldRef::Named(name) => Some(name),
            FieldRef::All => None,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Named(name) => f.write_str(name),
            FieldRef::All => f.write_str("all"),
        }
    }
}

impl From<&str> for FieldRef {
    fn from(value: &str) -> Self {
        if value == "all" {
            FieldRef::All
        } else {
            FieldRef::Named(value.to_string())
        }
    }
}

/// A typed value read from, or to be written to, a single blackboard field,
/// or a snapshot of the whole blackboard for an `"all"`-declared component.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum FieldValue {
    /// A scalar field value.
    F64(f64),
    /// The `mission` field.
    Mission(Mission),
    /// The `vehicle` field.
    Vehicle(VehicleState),
    /// The `agents` field.
    Agents(AgentState),
    /// The `route` field.
    Route(Route),
    /// The `trajectory` field.
    Trajectory(Trajectory),
    /// A snapshot of, or replacement for, the whole blackboard.
    All(Box<AllState>),
}

impl FieldValue {
    fn type_name(&self) -> &'static str {
        match self {
            FieldValue::F64(_) => "f64",
            FieldValue::Mission(_) => "Mission",
            FieldValue::Vehicle(_) => "VehicleState",
            FieldValue::Agents(_) => "AgentState",
            FieldValue::Route(_) => "Route",
            FieldValue::Trajectory(_) => "Trajectory",
            FieldValue::All(_) => "AllState",
        }
    }
}

/// Errors raised while reading or writing a blackboard field by name.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FieldError {
    /// No accessor is registered for this field name.
    #[error("unknown blackboard field '{0}'")]
    UnknownField(String),

    /// A write targeted a real field but supplied a value of the wrong type.
    #[error("field '{field}' expects a value of type {expected}, found {found}")]
    TypeMismatch {
        /// The field that was being written.
        field: String,
        /// The type the field's accessor expects.
        expected: &'static str,
        /// The type that was actually supplied.
        found: &'static str,
    },
}

struct FieldAccessor {
    name: &'static str,
    read: fn(&AllState) -> FieldValue,
    write: fn(&mut AllState, FieldValue, f64) -> Result<(), FieldError>,
    update_time: fn(&AllState) -> f64,
}

macro_rules! accessor {
    ($name:literal, $field:ident, $update_time:ident, $variant:ident) => {
        FieldAccessor {
            name: $name,
            read: |state| FieldValue::$variant(state.$field.clone()),
            write: |state, value, t| match value {
                FieldValue::$variant(v) => {
                    state.$field = v;
                    state.$update_time = t;
                    Ok(())
                }
                other => Err(FieldError::TypeMismatch {
                    field: $name.to_string(),
                    expected: stringify!($variant),
                    found: other.type_name(),
                }),
            },
            update_time: |state| state.$update_time,
        }
    };
}

static ACCESSORS: Lazy<Vec<FieldAccessor>> = Lazy::new(|| {
    vec![
        accessor!("mission", mission, mission_update_time, Mission),
        accessor!("vehicle", vehicle, vehicle_update_time, Vehicle),
        accessor!("agents", agents, agents_update_time, Agents),
        accessor!("route", route, route_update_time, Route),
        accessor!("trajectory", trajectory, trajectory_update_time, Trajectory),
    ]
});

fn find(name: &str) -> Option<&'static FieldAccessor> {
    ACCESSORS.iter().find(|accessor| accessor.name == name)
}

/// Returns the names of every writable field in the schema (excludes `t`,
/// which is set directly by the executor once per tick, and `"all"`, which
/// is a sentinel rather than a field).
pub fn known_field_names() -> Vec<&'static str> {
    ACCESSORS.iter().map(|accessor| accessor.name).collect()
}

/// Returns `true` if `name` is a known writable field.
pub fn is_known_field(name: &str) -> bool {
    find(name).is_some()
}

/// Reads a single named field from the blackboard.
pub fn read_field(state: &AllState, name: &str) -> Result<FieldValue, FieldError> {
    find(name)
        .map(|accessor| (accessor.read)(state))
        .ok_or_else(|| FieldError::UnknownField(name.to_string()))
}

/// Writes a single named field and its companion update-time.
///
/// Per the blackboard invariant, a write to a field absent from the schema
/// is not fatal: it is logged as a warning and otherwise ignored.
pub fn write_field(state: &mut AllState, name: &str, value: FieldValue, t: f64) -> Result<(), FieldError> {
    match find(name) {
        Some(accessor) => (accessor.write)(state, value, t),
        None => {
            tracing::warn!(field = %name, "write to unknown blackboard field, ignoring");
            Ok(())
        }
    }
}

/// Returns the update-time of a single named field.
pub fn field_update_time(state: &AllState, name: &str) -> Result<f64, FieldError> {
    find(name)
        .map(|accessor| (accessor.update_time)(state))
        .ok_or_else(|| FieldError::UnknownField(name.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::VehicleState;

    #[test]
    fn round_trips_a_known_field() {
        let mut state = AllState::zero();
        let vehicle = VehicleState {
            speed: 3.5,
            position: (1.0, 2.0),
            heading: 0.1,
        };
        write_field(&mut state, "vehicle", FieldValue::Vehicle(vehicle.clone()), 10.0).unwrap();
        assert_eq!(read_field(&state, "vehicle").unwrap(), FieldValue::Vehicle(vehicle));
        assert_eq!(field_update_time(&state, "vehicle").unwrap(), 10.0);
    }

    #[test]
    fn unknown_read_is_an_error() {
        let state = AllState::zero();
        assert!(matches!(read_field(&state, "nope"), Err(FieldError::UnknownField(_))));
    }

    #[test]
    fn unknown_write_is_ignored_not_fatal() {
        let mut state = AllState::zero();
        let before = state.clone();
        write_field(&mut state, "nope", FieldValue::F64(1.0), 1.0).unwrap();
        assert_eq!(state, before);
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let mut state = AllState::zero();
        assert!(matches!(
            write_field(&mut state, "vehicle", FieldValue::F64(1.0), 1.0),
            Err(FieldError::TypeMismatch { .. })
        ));
    }
}
