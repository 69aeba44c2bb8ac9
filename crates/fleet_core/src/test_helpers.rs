//! Shared fixtures for unit and integration tests.

use std::sync::Mutex;

use chrono::{NaiveDate, NaiveDateTime};

use crate::grid::GridCell;
use crate::movement::{PositionUpdate, RouteObserver};
use crate::rental::Rental;
use crate::vehicle::{Vehicle, VehicleKind};

pub fn ts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .unwrap_or_else(|| panic!("invalid test timestamp {year}-{month}-{day} {hour}:{minute}"))
}

pub fn cell(x: u8, y: u8) -> GridCell {
    GridCell::new(x, y).unwrap_or_else(|| panic!("invalid test cell ({x},{y})"))
}

pub fn test_scooter(id: &str) -> Vehicle {
    Vehicle::new(id, VehicleKind::Scooter { max_speed: 10 }, 450.0)
}

pub fn test_bicycle(id: &str, autonomy_steps: u32) -> Vehicle {
    Vehicle::new(id, VehicleKind::Bicycle { autonomy_steps }, 900.0)
}

pub fn test_car(id: &str) -> Vehicle {
    Vehicle::new(
        id,
        VehicleKind::Car {
            purchase_date: ts(2021, 3, 15, 0, 0).date(),
        },
        31_000.0,
    )
}

pub fn test_rental(
    user_id: &str,
    vehicle_id: &str,
    started_at: NaiveDateTime,
    start: GridCell,
    goal: GridCell,
) -> Rental {
    Rental {
        user_id: user_id.to_string(),
        vehicle_id: vehicle_id.to_string(),
        started_at,
        start,
        goal,
        duration_secs: 30,
        fault_declared: false,
        promo: false,
        discount: false,
    }
}

/// Observer that records every update for later assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    updates: Mutex<Vec<PositionUpdate>>,
}

impl RecordingObserver {
    pub fn updates(&self) -> Vec<PositionUpdate> {
        self.updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl RouteObserver for RecordingObserver {
    fn position_changed(&self, update: PositionUpdate) {
        self.updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(update);
    }
}
