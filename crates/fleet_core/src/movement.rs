//! Route replay: walks a rental's route cell by cell in wall-clock time,
//! draining the battery and surfacing faults and low-battery removals.
//!
//! Routes are rectilinear: the full X distance first, then the full Y
//! distance. The corner cell is reported again when the Y leg begins.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::faults::lookup_fault;
use crate::grid::GridCell;
use crate::rental::Rental;
use crate::vehicle::{Vehicle, FULL_BATTERY_PERCENT};

/// A vehicle reporting under this charge is pulled from the route.
pub const LOW_BATTERY_CUTOFF: u8 = 15;

/// Per-cell ride state as reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideStatus {
    Moving,
    LowBatteryRemoved,
    Faulted,
    Finished,
}

/// One position report emitted per visited cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub vehicle_id: String,
    pub cell: GridCell,
    pub battery_percent: u8,
    pub status: RideStatus,
}

/// Receives per-cell reports while a route replays. Implementations must
/// be cheap; they run on the route task between step pauses.
pub trait RouteObserver: Send + Sync {
    fn position_changed(&self, update: PositionUpdate);
}

/// Observer that drops every report.
#[derive(Debug, Default)]
pub struct NullObserver;

impl RouteObserver for NullObserver {
    fn position_changed(&self, _update: PositionUpdate) {}
}

/// How a route replay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Finished,
    LowBattery,
    Faulted,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub outcome: RouteOutcome,
    pub final_cell: GridCell,
    pub final_battery: u8,
    pub steps_taken: u32,
}

/// Scales every simulated pause. `1.0` replays at the booked pace,
/// smaller values compress time and [`Pacing::none`] disables sleeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    pub multiplier: f64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self { multiplier: 1.0 }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Self { multiplier: 0.0 }
    }

    pub fn scale(&self, base: Duration) -> Duration {
        base.mul_f64(self.multiplier)
    }
}

/// Real-time milliseconds spent per step of the route.
///
/// The booked duration spreads evenly over the steps; scooters are
/// additionally bounded by their top speed.
pub fn step_duration_ms(rental: &Rental, vehicle: &Vehicle) -> u64 {
    let total_steps = u64::from(rental.total_steps());
    if total_steps == 0 {
        return 0;
    }
    let booked = u64::from(rental.duration_secs) * 1000 / total_steps;
    match vehicle.kind {
        crate::vehicle::VehicleKind::Scooter { max_speed } => {
            booked.min(u64::from(max_speed) * 1000 / total_steps)
        }
        _ => booked,
    }
}

/// Replays the rental's route on `vehicle`, reporting every visited cell.
///
/// The battery is re-checked before each report; dropping under
/// [`LOW_BATTERY_CUTOFF`] removes the vehicle mid-route. A fault
/// registered for this booking surfaces once the X leg completes.
/// Cancellation is honored at every step pause.
pub async fn simulate_route(
    rental: &Rental,
    vehicle: &mut Vehicle,
    observer: &dyn RouteObserver,
    pacing: Pacing,
    cancel: &CancellationToken,
) -> RouteResult {
    let total_steps = rental.total_steps();
    if total_steps == 0 {
        vehicle.battery_percent = FULL_BATTERY_PERCENT;
        observer.position_changed(PositionUpdate {
            vehicle_id: vehicle.id.clone(),
            cell: rental.start,
            battery_percent: vehicle.battery_percent,
            status: RideStatus::Finished,
        });
        return RouteResult {
            outcome: RouteOutcome::Finished,
            final_cell: rental.start,
            final_battery: vehicle.battery_percent,
            steps_taken: 0,
        };
    }

    let fault = lookup_fault(vehicle, rental.started_at);
    let step_pause = pacing.scale(Duration::from_millis(step_duration_ms(rental, vehicle)));
    let x_leg = axis_cells(rental.start.x, rental.goal.x);
    let x_steps = x_leg.len() as u32 - 1;

    // X leg, start cell included.
    for (step, &x) in x_leg.iter().enumerate() {
        let step = step as u32;
        if step > 0 && !pause(step_pause, cancel).await {
            return cancelled(rental, vehicle, step - 1);
        }
        let cell = GridCell {
            x,
            y: rental.start.y,
        };
        vehicle.battery_percent = vehicle.battery_after_steps(step, total_steps);
        if vehicle.battery_percent < LOW_BATTERY_CUTOFF {
            return removed(cell, vehicle, observer, step);
        }
        trace!(vehicle_id = %vehicle.id, %cell, battery = vehicle.battery_percent, "step");
        observer.position_changed(PositionUpdate {
            vehicle_id: vehicle.id.clone(),
            cell,
            battery_percent: vehicle.battery_percent,
            status: RideStatus::Moving,
        });
    }

    // Declared breakdowns surface at the corner, before the Y leg.
    if fault.is_some() {
        let cell = GridCell {
            x: rental.goal.x,
            y: rental.start.y,
        };
        observer.position_changed(PositionUpdate {
            vehicle_id: vehicle.id.clone(),
            cell,
            battery_percent: vehicle.battery_percent,
            status: RideStatus::Faulted,
        });
        return RouteResult {
            outcome: RouteOutcome::Faulted,
            final_cell: cell,
            final_battery: vehicle.battery_percent,
            steps_taken: x_steps,
        };
    }

    // Y leg; the corner cell is reported again without a pause.
    let y_leg = axis_cells(rental.start.y, rental.goal.y);
    for (offset, &y) in y_leg.iter().enumerate() {
        let step = x_steps + offset as u32;
        if offset > 0 && !pause(step_pause, cancel).await {
            return cancelled(rental, vehicle, step - 1);
        }
        let cell = GridCell { x: rental.goal.x, y };
        vehicle.battery_percent = vehicle.battery_after_steps(step, total_steps);
        if vehicle.battery_percent < LOW_BATTERY_CUTOFF {
            return removed(cell, vehicle, observer, step);
        }
        let at_goal = step == total_steps;
        observer.position_changed(PositionUpdate {
            vehicle_id: vehicle.id.clone(),
            cell,
            battery_percent: vehicle.battery_percent,
            status: if at_goal {
                RideStatus::Finished
            } else {
                RideStatus::Moving
            },
        });
    }

    RouteResult {
        outcome: RouteOutcome::Finished,
        final_cell: rental.goal,
        final_battery: vehicle.battery_percent,
        steps_taken: total_steps,
    }
}

/// Inclusive cell coordinates from `from` to `to` along one axis.
fn axis_cells(from: u8, to: u8) -> Vec<u8> {
    if from <= to {
        (from..=to).collect()
    } else {
        (to..=from).rev().collect()
    }
}

/// Waits out one step pause; returns false when cancelled instead.
async fn pause(step_pause: Duration, cancel: &CancellationToken) -> bool {
    if step_pause.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = sleep(step_pause) => true,
    }
}

fn cancelled(rental: &Rental, vehicle: &Vehicle, steps_taken: u32) -> RouteResult {
    trace!(vehicle_id = %vehicle.id, user_id = %rental.user_id, "route cancelled");
    RouteResult {
        outcome: RouteOutcome::Cancelled,
        final_cell: rental.start,
        final_battery: vehicle.battery_percent,
        steps_taken,
    }
}

fn removed(
    cell: GridCell,
    vehicle: &Vehicle,
    observer: &dyn RouteObserver,
    steps_taken: u32,
) -> RouteResult {
    observer.position_changed(PositionUpdate {
        vehicle_id: vehicle.id.clone(),
        cell,
        battery_percent: vehicle.battery_percent,
        status: RideStatus::LowBatteryRemoved,
    });
    RouteResult {
        outcome: RouteOutcome::LowBattery,
        final_cell: cell,
        final_battery: vehicle.battery_percent,
        steps_taken,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{cell, test_bicycle, test_rental, test_scooter, ts, RecordingObserver};
    use crate::vehicle::MIN_BATTERY_PERCENT;

    fn route(start: GridCell, goal: GridCell) -> Rental {
        test_rental("ana", "SC-1", ts(2024, 5, 1, 10, 0), start, goal)
    }

    #[tokio::test]
    async fn replays_x_then_y_with_corner_repeated() {
        let rental = route(cell(2, 3), cell(4, 4));
        let mut vehicle = test_scooter("SC-1");
        let observer = RecordingObserver::default();
        let cancel = CancellationToken::new();
        let result =
            simulate_route(&rental, &mut vehicle, &observer, Pacing::none(), &cancel).await;

        assert_eq!(result.outcome, RouteOutcome::Finished);
        assert_eq!(result.final_cell, cell(4, 4));
        assert_eq!(result.steps_taken, 3);

        let updates = observer.updates();
        let cells: Vec<GridCell> = updates.iter().map(|u| u.cell).collect();
        assert_eq!(
            cells,
            vec![cell(2, 3), cell(3, 3), cell(4, 3), cell(4, 3), cell(4, 4)]
        );
        // N=3: drain 33/3 = 11 per step, corner reported twice.
        let batteries: Vec<u8> = updates.iter().map(|u| u.battery_percent).collect();
        assert_eq!(batteries, vec![100, 89, 78, 78, 67]);
        assert_eq!(updates.last().map(|u| u.status), Some(RideStatus::Finished));
        assert_eq!(vehicle.battery_percent, 67);
    }

    #[tokio::test]
    async fn zero_step_route_finishes_immediately() {
        let rental = route(cell(6, 6), cell(6, 6));
        let mut vehicle = test_scooter("SC-1");
        let observer = RecordingObserver::default();
        let result = simulate_route(
            &rental,
            &mut vehicle,
            &observer,
            Pacing::none(),
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(result.outcome, RouteOutcome::Finished);
        assert_eq!(result.steps_taken, 0);
        let updates = observer.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, RideStatus::Finished);
        assert_eq!(updates[0].battery_percent, 100);
    }

    #[tokio::test]
    async fn declared_fault_surfaces_at_the_corner() {
        let rental = route(cell(2, 3), cell(5, 8));
        let mut vehicle = test_scooter("SC-1");
        let mut model = crate::faults::FaultModel::new(Some(9));
        model.register_fault(&mut vehicle, rental.started_at);

        let observer = RecordingObserver::default();
        let result = simulate_route(
            &rental,
            &mut vehicle,
            &observer,
            Pacing::none(),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result.outcome, RouteOutcome::Faulted);
        assert_eq!(result.final_cell, cell(5, 3));
        assert_eq!(result.steps_taken, 3);
        let last = observer.updates().last().cloned().expect("updates");
        assert_eq!(last.status, RideStatus::Faulted);
        assert_eq!(last.cell, cell(5, 3));
    }

    #[tokio::test]
    async fn bicycle_past_autonomy_is_removed_mid_route() {
        let rental = route(cell(0, 0), cell(6, 4));
        let mut vehicle = test_bicycle("BI-1", 4);
        let observer = RecordingObserver::default();
        let result = simulate_route(
            &rental,
            &mut vehicle,
            &observer,
            Pacing::none(),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result.outcome, RouteOutcome::LowBattery);
        assert_eq!(result.steps_taken, 4);
        assert_eq!(result.final_battery, MIN_BATTERY_PERCENT);
        let last = observer.updates().last().cloned().expect("updates");
        assert_eq!(last.status, RideStatus::LowBatteryRemoved);
        assert_eq!(last.cell, cell(4, 0));
    }

    #[tokio::test]
    async fn pre_cancelled_token_stops_after_first_cell() {
        let rental = route(cell(0, 0), cell(5, 0));
        let mut vehicle = test_scooter("SC-1");
        let observer = RecordingObserver::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result =
            simulate_route(&rental, &mut vehicle, &observer, Pacing::none(), &cancel).await;
        assert_eq!(result.outcome, RouteOutcome::Cancelled);
        assert_eq!(observer.updates().len(), 1);
    }

    #[test]
    fn scooter_step_duration_is_speed_bounded() {
        let rental = {
            let mut r = route(cell(0, 0), cell(3, 0));
            r.duration_secs = 30;
            r
        };
        let scooter = test_scooter("SC-1"); // max_speed 10
        assert_eq!(step_duration_ms(&rental, &scooter), 3333);
        let bicycle = test_bicycle("BI-1", 100);
        assert_eq!(step_duration_ms(&rental, &bicycle), 10000);
    }

    #[test]
    fn axis_cells_run_both_directions() {
        assert_eq!(axis_cells(2, 5), vec![2, 3, 4, 5]);
        assert_eq!(axis_cells(5, 2), vec![5, 4, 3, 2]);
        assert_eq!(axis_cells(4, 4), vec![4]);
    }
}
