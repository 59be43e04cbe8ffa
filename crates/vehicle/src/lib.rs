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

//! The `VehicleInterface` seam: the executor's only window onto the actual
//! vehicle hardware. Concrete implementations live outside this workspace
//! (the vehicle hardware interface is an out-of-scope external collaborator);
//! this crate defines the contract and the value types carried across it.

use std::collections::HashSet;

/// A single reading off the vehicle's own sensors, as opposed to perception's
/// tracked world state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleReading {
    /// Forward speed, meters/second.
    pub speed: f64,
}

/// The fault named `"disengaged"`, suppressed by consumers of
/// [`VehicleInterface::hardware_faults`] unless `run.require_engaged` is set.
pub const DISENGAGED: &str = "disengaged";

/// The executor's view of the vehicle hardware: a monotonic clock, the
/// current set of hardware fault names, and the latest raw reading.
pub trait VehicleInterface: Send {
    /// Monotonic vehicle time, seconds.
    fn time(&self) -> f64;

    /// The set of hardware fault names currently asserted. Contains at least
    /// [`DISENGAGED`] when the vehicle is not under autonomous control.
    fn hardware_faults(&self) -> HashSet<String>;

    /// The most recent raw vehicle reading, if any has been taken yet.
    fn last_reading(&self) -> Option<VehicleReading>;
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    struct StubVehicle {
        t: f64,
        faults: HashSet<String>,
    }

    impl VehicleInterface for StubVehicle {
        fn time(&self) -> f64 {
            self.t
        }

        fn hardware_faults(&self) -> HashSet<String> {
            self.faults.clone()
        }

        fn last_reading(&self) -> Option<VehicleReading> {
            Some(VehicleReading { speed: 1.0 })
        }
    }

    #[test]
    fn reports_disengaged_fault() {
        let vehicle = StubVehicle {
            t: 3.0,
            faults: HashSet::from([DISENGAGED.to_string()]),
        };
        assert_eq!(vehicle.time(), 3.0);
        assert!(vehicle.hardware_faults().contains(DISENGAGED));
        assert_eq!(vehicle.last_reading().unwrap().speed, 1.0);
    }
}
