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

//! `AllState` is the shared blackboard that every component reads from and
//! writes to. Unlike a reflected record, every field is a named member of a
//! fixed, typed struct; [`fields`] exposes a parallel `field name ->
//! accessor` mapping so the graph validator and the component executor can
//! address fields generically without runtime reflection.

pub mod fields;

/// The vehicle's current mission and its high-level intent.
#[derive(Debug, Clone, PartialEq)]
pub struct Mission {
    /// The active mission type.
    pub r#type: MissionType,
}

impl Default for Mission {
    fn default() -> Self {
        Self {
            r#type: MissionType::Idle,
        }
    }
}

/// The closed enumeration of mission types a pipeline switch can observe.
///
/// `Idle` and `RecoveryStop` cover the two mandatory pipeline states;
/// `Drive` and `Done` round out the vocabulary so every pipeline name
/// shipped by this crate (`drive`, `recovery`) has a corresponding mission
/// state. `Custom` covers a deployment that adds pipelines beyond
/// `drive`/`recovery`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MissionType {
    /// No mission has been started yet.
    Idle,
    /// The vehicle is executing the primary `drive` pipeline.
    Drive,
    /// The vehicle is executing the mandatory `recovery` pipeline.
    RecoveryStop,
    /// The mission has completed.
    Done,
    /// A deployment-defined pipeline, named by its pipeline name.
    Custom(String),
}

/// A single tracked agent (another vehicle, pedestrian, cyclist, ...).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Agent {
    /// Unique, deployment-assigned identifier.
    pub id: String,
    /// Position in the vehicle's local frame, meters.
    pub position: (f64, f64),
    /// Velocity in the vehicle's local frame, meters/second.
    pub velocity: (f64, f64),
}

/// The set of agents currently tracked by perception.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentState {
    /// Tracked agents, in no particular order.
    pub agents: Vec<Agent>,
}

/// The vehicle's own kinematic state.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    /// Forward speed, meters/second. Negative values indicate reverse.
    pub speed: f64,
    /// Position in the map frame, meters.
    pub position: (f64, f64),
    /// Heading, radians, counter-clockwise from the map frame's x axis.
    pub heading: f64,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            speed: 0.0,
            position: (0.0, 0.0),
            heading: 0.0,
        }
    }
}

/// A waypoint-level route, as produced by a route planner.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    /// Waypoints in the map frame, meters, in traversal order.
    pub waypoints: Vec<(f64, f64)>,
}

/// A single point of a time-parameterized trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPoint {
    /// Time offset from the trajectory's start, seconds.
    pub t: f64,
    /// Position in the map frame, meters.
    pub position: (f64, f64),
    /// Target speed at this point, meters/second.
    pub speed: f64,
}

/// A short-horizon trajectory, as produced by motion planning.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trajectory {
    /// Trajectory points, in chronological order.
    pub points: Vec<TrajectoryPoint>,
}

/// The blackboard: a fixed-schema, typed record of named fields, each with a
/// companion `<field>_update_time` recording the vehicle time at which it
/// was last written.
#[derive(Debug, Clone, PartialEq)]
pub struct AllState {
    /// Current vehicle time, seconds. Set once per tick by the executor, not
    /// written through the field-accessor path used by components.
    pub t: f64,
    /// Current mission state.
    pub mission: Mission,
    /// Vehicle time at which `mission` was last written.
    pub mission_update_time: f64,
    /// Current vehicle kinematic state.
    pub vehicle: VehicleState,
    /// Vehicle time at which `vehicle` was last written.
    pub vehicle_update_time: f64,
    /// Currently tracked agents.
    pub agents: AgentState,
    /// Vehicle time at which `agents` was last written.
    pub agents_update_time: f64,
    /// Current route.
    pub route: Route,
    /// Vehicle time at which `route` was last written.
    pub route_update_time: f64,
    /// Current trajectory.
    pub trajectory: Trajectory,
    /// Vehicle time at which `trajectory` was last written.
    pub trajectory_update_time: f64,
}

impl AllState {
    /// Returns a fully default-initialized blackboard: zero time, `Idle`
    /// mission, empty agents/route/trajectory.
    pub fn zero() -> Self {
        Self {
            t: 0.0,
            mission: Mission::default(),
            mission_update_time: 0.0,
            vehicle: VehicleState::default(),
            vehicle_update_time: 0.0,
            agents: AgentState::default(),
            agents_update_time: 0.0,
            route: Route::default(),
            route_update_time: 0.0,
            trajectory: Trajectory::default(),
            trajectory_update_time: 0.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_is_fully_initialized() {
        let state = AllState::zero();
        assert_eq!(state.t, 0.0);
        assert_eq!(state.mission.r#type, MissionType::Idle);
        assert!(state.agents.agents.is_empty());
        assert!(state.route.waypoints.is_empty());
        assert!(state.trajectory.points.is_empty());
    }
}
