//! Simulation orchestration: replays the schedule day by day, running
//! every rental of a time group concurrently and barrier-waiting on the
//! whole group before moving on.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::billing::BillingEngine;
use crate::charging::charge_until_next;
use crate::error::SimulationError;
use crate::fleet::VehicleFleet;
use crate::movement::{simulate_route, Pacing, RouteObserver, RouteOutcome};
use crate::registry::RentalRegistry;
use crate::rental::Rental;
use crate::scenario::SimulationParams;
use crate::vehicle::{Vehicle, FULL_BATTERY_PERCENT};

/// Counters for one finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationSummary {
    pub days: usize,
    pub time_groups: usize,
    pub completed: usize,
    pub low_battery: usize,
    pub faulted: usize,
    pub cancelled: usize,
    pub skipped: usize,
    pub billing_failures: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    Completed { billed: bool },
    LowBattery { billed: bool },
    Faulted { billed: bool },
    Cancelled,
    Skipped,
}

pub struct SimulationScheduler {
    registry: Arc<RentalRegistry>,
    fleet: Arc<VehicleFleet>,
    billing: Arc<BillingEngine>,
    observer: Arc<dyn RouteObserver>,
    params: SimulationParams,
}

impl SimulationScheduler {
    pub fn new(
        registry: Arc<RentalRegistry>,
        fleet: Arc<VehicleFleet>,
        billing: Arc<BillingEngine>,
        observer: Arc<dyn RouteObserver>,
        params: SimulationParams,
    ) -> Self {
        Self {
            registry,
            fleet,
            billing,
            observer,
            params,
        }
    }

    /// Replays the whole schedule. Groups run strictly in order; a group
    /// that outlives the barrier timeout aborts the run. Cancellation
    /// stops dispatching and lets in-flight tasks wind down as cancelled.
    pub async fn run(
        &self,
        cancel: CancellationToken,
    ) -> Result<SimulationSummary, SimulationError> {
        let mut summary = SimulationSummary::default();
        let schedule = self.registry.schedule();
        for day_group in schedule {
            if cancel.is_cancelled() {
                break;
            }
            summary.days += 1;
            info!(day = %day_group.day, slots = day_group.slots.len(), "simulating day");
            for slot in day_group.slots {
                if cancel.is_cancelled() {
                    break;
                }
                summary.time_groups += 1;
                let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();
                for rental in &slot.rentals {
                    let Some(vehicle_slot) = self.fleet.get(&rental.vehicle_id) else {
                        let err = crate::error::BillingError::UnknownVehicle {
                            vehicle_id: rental.vehicle_id.clone(),
                        };
                        warn!(%err, at = %slot.at, "skipping rental");
                        summary.skipped += 1;
                        continue;
                    };
                    tasks.spawn(simulate_rental(
                        Arc::clone(rental),
                        vehicle_slot,
                        Arc::clone(&self.registry),
                        Arc::clone(&self.billing),
                        Arc::clone(&self.observer),
                        self.params.pacing,
                        cancel.clone(),
                    ));
                }

                let barrier = async {
                    let mut outcomes = Vec::new();
                    while let Some(joined) = tasks.join_next().await {
                        outcomes.push(joined);
                    }
                    outcomes
                };
                let outcomes = match timeout(self.params.group_timeout, barrier).await {
                    Ok(outcomes) => outcomes,
                    Err(_) => {
                        tasks.abort_all();
                        return Err(SimulationError::Timeout {
                            at: slot.at,
                            timeout_ms: self.params.group_timeout.as_millis() as u64,
                        });
                    }
                };
                for joined in outcomes {
                    match joined {
                        Ok(outcome) => summary.record(outcome),
                        Err(err) => {
                            warn!(%err, at = %slot.at, "rental task failed");
                            summary.skipped += 1;
                        }
                    }
                }

                let throttle = self.params.pacing.scale(self.params.throttle);
                if !throttle.is_zero() {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = sleep(throttle) => {}
                    }
                }
            }
        }
        info!(?summary, "simulation finished");
        Ok(summary)
    }
}

impl SimulationSummary {
    fn record(&mut self, outcome: TaskOutcome) {
        let billed = match outcome {
            TaskOutcome::Completed { billed } => {
                self.completed += 1;
                Some(billed)
            }
            TaskOutcome::LowBattery { billed } => {
                self.low_battery += 1;
                Some(billed)
            }
            TaskOutcome::Faulted { billed } => {
                self.faulted += 1;
                Some(billed)
            }
            TaskOutcome::Cancelled => {
                self.cancelled += 1;
                None
            }
            TaskOutcome::Skipped => {
                self.skipped += 1;
                None
            }
        };
        if billed == Some(false) {
            self.billing_failures += 1;
        }
    }
}

/// One rental's full lifecycle: route replay, billing and recharging.
/// The vehicle stays locked for the entire rental so a later booking of
/// the same vehicle observes the finalized battery.
async fn simulate_rental(
    rental: Arc<Rental>,
    vehicle_slot: Arc<tokio::sync::Mutex<Vehicle>>,
    registry: Arc<RentalRegistry>,
    billing: Arc<BillingEngine>,
    observer: Arc<dyn RouteObserver>,
    pacing: Pacing,
    cancel: CancellationToken,
) -> TaskOutcome {
    let mut vehicle = vehicle_slot.lock().await;
    let result = simulate_route(&rental, &mut vehicle, observer.as_ref(), pacing, &cancel).await;
    match result.outcome {
        RouteOutcome::Cancelled => TaskOutcome::Cancelled,
        RouteOutcome::Finished => {
            let billed = bill(&billing, &rental, &vehicle, false);
            let next_start = registry.next_rental_start(&rental.vehicle_id, rental.started_at);
            charge_until_next(&mut vehicle, rental.ends_at(), next_start);
            TaskOutcome::Completed { billed }
        }
        RouteOutcome::LowBattery => {
            let billed = bill(&billing, &rental, &vehicle, false);
            // Removed vehicles go straight back to the depot.
            vehicle.battery_percent = FULL_BATTERY_PERCENT;
            TaskOutcome::LowBattery { billed }
        }
        RouteOutcome::Faulted => {
            let billed = bill(&billing, &rental, &vehicle, true);
            TaskOutcome::Faulted { billed }
        }
    }
}

fn bill(billing: &BillingEngine, rental: &Rental, vehicle: &Vehicle, faulted: bool) -> bool {
    match billing.generate_bill(rental, vehicle, faulted) {
        Ok(_) => true,
        Err(err) => {
            warn!(%err, vehicle_id = %rental.vehicle_id, "bill generation failed");
            false
        }
    }
}
