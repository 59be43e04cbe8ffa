//! `StandardExecutor`: the concrete mission-termination policy used by a
//! normal (non-replayed) mission. Overrides only `MissionLogic::done`.

use blackboard::{AllState, MissionType};
use vehicle::{VehicleInterface, DISENGAGED};

use crate::base::MissionLogic;

/// Ends the mission once the vehicle has come to a stop, or has
/// disengaged, while already in the `recovery` pipeline. Every other
/// pipeline runs until something else (an essential fault, an interrupt,
/// or a `MissionLogic::update` override) requests a switch.
#[derive(Debug, Default)]
pub struct StandardExecutor;

impl StandardExecutor {
    /// Creates a new standard termination policy.
    pub fn new() -> Self {
        Self
    }
}

impl MissionLogic for StandardExecutor {
    fn done(&self, state: &AllState, vehicle: &dyn VehicleInterface) -> bool {
        if state.mission.r#type != MissionType::RecoveryStop {
            return false;
        }

        if let Some(reading) = vehicle.last_reading() {
            if reading.speed.abs() < 1e-3 {
                tracing::info!("vehicle has stopped, exiting execution loop");
                return true;
            }
        }

        if vehicle.hardware_faults().contains(DISENGAGED) {
            tracing::info!("vehicle has disengaged, exiting execution loop");
            return true;
        }

        false
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use vehicle::VehicleReading;

    use super::*;

    struct StubVehicle {
        reading: Option<VehicleReading>,
        faults: HashSet<String>,
    }

    impl VehicleInterface for StubVehicle {
        fn time(&self) -> f64 {
            0.0
        }

        fn hardware_faults(&self) -> HashSet<String> {
            self.faults.clone()
        }

        fn last_reading(&self) -> Option<VehicleReading> {
            self.reading
        }
    }

    fn recovery_state() -> AllState {
        let mut state = AllState::zero();
        state.mission.r#type = MissionType::RecoveryStop;
        state
    }

    #[test]
    fn not_done_outside_recovery() {
        let policy = StandardExecutor::new();
        let vehicle = StubVehicle {
            reading: Some(VehicleReading { speed: 0.0 }),
            faults: HashSet::new(),
        };
        assert!(!policy.done(&AllState::zero(), &vehicle));
    }

    #[test]
    fn done_once_stopped_in_recovery() {
        let policy = StandardExecutor::new();
        let vehicle = StubVehicle {
            reading: Some(VehicleReading { speed: 0.0004 }),
            faults: HashSet::new(),
        };
        assert!(policy.done(&recovery_state(), &vehicle));
    }

    #[test]
    fn not_done_while_still_moving_in_recovery() {
        let policy = StandardExecutor::new();
        let vehicle = StubVehicle {
            reading: Some(VehicleReading { speed: 2.0 }),
            faults: HashSet::new(),
        };
        assert!(!policy.done(&recovery_state(), &vehicle));
    }

    #[test]
    fn done_once_disengaged_in_recovery() {
        let policy = StandardExecutor::new();
        let vehicle = StubVehicle {
            reading: None,
            faults: HashSet::from([DISENGAGED.to_string()]),
        };
        assert!(policy.done(&recovery_state(), &vehicle));
    }
}
