//! Fault model: seedable random defect assignment for rentals that
//! declare a breakdown.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::registry::RentalRegistry;
use crate::vehicle::{Fault, FaultKind, Vehicle};

/// Draws defect kinds for declared breakdowns. Seed it for reproducible
/// runs; otherwise kinds vary between executions.
#[derive(Debug)]
pub struct FaultModel {
    rng: StdRng,
}

impl FaultModel {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Records a fresh fault of random kind on the vehicle and returns
    /// it. Faults stay sorted by occurrence time regardless of
    /// registration order.
    pub fn register_fault(
        &mut self,
        vehicle: &mut Vehicle,
        occurred_at: chrono::NaiveDateTime,
    ) -> Fault {
        let kind = FaultKind::sample(&mut self.rng);
        debug!(vehicle_id = %vehicle.id, %kind, %occurred_at, "registering fault");
        let fault = Fault { kind, occurred_at };
        vehicle.faults.push(fault);
        vehicle.faults.sort_by_key(|f| f.occurred_at);
        fault
    }
}

/// Looks up the fault recorded for an exact rental start time.
pub fn lookup_fault(vehicle: &Vehicle, occurred_at: chrono::NaiveDateTime) -> Option<Fault> {
    vehicle
        .faults
        .iter()
        .find(|f| f.occurred_at == occurred_at)
        .copied()
}

/// Pre-registers a fault for every booking that declares one, so route
/// tasks only ever read fault state.
pub fn register_declared_faults(
    model: &mut FaultModel,
    vehicles: &mut [Vehicle],
    registry: &RentalRegistry,
) {
    for rental in registry.rentals() {
        if !rental.fault_declared {
            continue;
        }
        if let Some(vehicle) = vehicles.iter_mut().find(|v| v.id == rental.vehicle_id) {
            model.register_fault(vehicle, rental.started_at);
        }
    }
}
