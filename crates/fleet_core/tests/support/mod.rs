//! Shared fixtures for the integration suites.

use std::path::Path;
use std::sync::Arc;

use fleet_core::billing::{BillingEngine, PricingConfig};
use fleet_core::fleet::VehicleFleet;
use fleet_core::movement::{Pacing, RouteObserver};
use fleet_core::registry::RentalRegistry;
use fleet_core::scenario::SimulationParams;
use fleet_core::scheduler::SimulationScheduler;
use fleet_core::vehicle::Vehicle;

pub fn scheduler_with_observer(
    registry: RentalRegistry,
    vehicles: Vec<Vehicle>,
    bills_dir: &Path,
    observer: Arc<dyn RouteObserver>,
    params: SimulationParams,
) -> SimulationScheduler {
    SimulationScheduler::new(
        Arc::new(registry),
        Arc::new(VehicleFleet::new(vehicles)),
        Arc::new(BillingEngine::new(PricingConfig::default(), bills_dir)),
        observer,
        params,
    )
}

pub fn fast_params() -> SimulationParams {
    SimulationParams::default().with_pacing(Pacing::none())
}
