//! CSV feeds for vehicles and rentals.
//!
//! Rows that fail validation are logged and skipped; only an unreadable
//! file is an error. Duplicate bookings of one vehicle at one timestamp
//! keep the first row and drop the rest.

use std::collections::HashSet;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::warn;

use crate::error::FeedError;
use crate::grid::GridCell;
use crate::registry::RentalRegistry;
use crate::rental::Rental;
use crate::vehicle::{Vehicle, VehicleKind};

/// Rental timestamps: `day.month.year hour:minute`.
pub const FEED_DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Car purchase dates carry a trailing dot.
pub const PURCHASE_DATE_FORMAT: &str = "%d.%m.%Y.";

/// Loads the vehicle feed. Columns: id, manufacturer, model, purchase
/// date, purchase price, battery, attribute, kind. The attribute column
/// is autonomy steps for bicycles and max speed for scooters.
pub fn load_vehicles(path: &Path) -> Result<Vec<Vehicle>, FeedError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| FeedError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let mut vehicles = Vec::new();
    let mut seen = HashSet::new();
    for (index, record) in reader.records().enumerate() {
        let line = index as u64 + 2;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(%err, line, "unreadable vehicle row, skipping");
                continue;
            }
        };
        match parse_vehicle(&record, line) {
            Ok(vehicle) => {
                if !seen.insert(vehicle.id.clone()) {
                    warn!(vehicle_id = %vehicle.id, line, "duplicate vehicle id, skipping");
                    continue;
                }
                vehicles.push(vehicle);
            }
            Err(err) => warn!(%err, line, "invalid vehicle row, skipping"),
        }
    }
    Ok(vehicles)
}

/// Loads the rental feed into a registry. Columns: timestamp, user id,
/// vehicle id, start x, start y, goal x, goal y, duration secs, fault
/// flag, promo flag. Rows naming an unknown vehicle are skipped.
pub fn load_rentals(
    path: &Path,
    known_vehicles: &HashSet<String>,
) -> Result<RentalRegistry, FeedError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| FeedError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let mut registry = RentalRegistry::new();
    for (index, record) in reader.records().enumerate() {
        let line = index as u64 + 2;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(%err, line, "unreadable rental row, skipping");
                continue;
            }
        };
        let rental = match parse_rental(&record, line) {
            Ok(rental) => rental,
            Err(err) => {
                warn!(%err, line, "invalid rental row, skipping");
                continue;
            }
        };
        if !known_vehicles.contains(&rental.vehicle_id) {
            warn!(vehicle_id = %rental.vehicle_id, line, "rental names unknown vehicle, skipping");
            continue;
        }
        if let Err(err) = registry.insert(rental) {
            warn!(%err, line, "skipping booking");
        }
    }
    Ok(registry)
}

fn parse_vehicle(record: &StringRecord, line: u64) -> Result<Vehicle, FeedError> {
    let id = field(record, line, 0, "id")?;
    let purchase_price: f64 = parse(field(record, line, 4, "purchase price")?, line)?;
    let battery: u8 = parse(field(record, line, 5, "battery")?, line)?;
    let kind_tag = field(record, line, 7, "kind")?;
    let kind = match kind_tag {
        "car" => {
            let raw = field(record, line, 3, "purchase date")?;
            let purchase_date = NaiveDate::parse_from_str(raw, PURCHASE_DATE_FORMAT)
                .map_err(|_| malformed(line, format!("bad purchase date {raw:?}")))?;
            VehicleKind::Car { purchase_date }
        }
        "bicycle" => VehicleKind::Bicycle {
            autonomy_steps: parse(field(record, line, 6, "autonomy")?, line)?,
        },
        "scooter" => VehicleKind::Scooter {
            max_speed: parse(field(record, line, 6, "max speed")?, line)?,
        },
        other => {
            return Err(FeedError::UnknownVehicleKind {
                kind: other.to_string(),
            })
        }
    };
    let mut vehicle = Vehicle::new(id, kind, purchase_price);
    vehicle.manufacturer = field(record, line, 1, "manufacturer")?.to_string();
    vehicle.model = field(record, line, 2, "model")?.to_string();
    vehicle.battery_percent = battery.min(crate::vehicle::FULL_BATTERY_PERCENT);
    Ok(vehicle)
}

fn parse_rental(record: &StringRecord, line: u64) -> Result<Rental, FeedError> {
    let raw_ts = field(record, line, 0, "timestamp")?;
    let started_at = NaiveDateTime::parse_from_str(raw_ts, FEED_DATE_FORMAT)
        .map_err(|_| malformed(line, format!("bad timestamp {raw_ts:?}")))?;
    let user_id = field(record, line, 1, "user id")?.to_string();
    let vehicle_id = field(record, line, 2, "vehicle id")?.to_string();
    let start = grid_cell(record, line, 3, 4)?;
    let goal = grid_cell(record, line, 5, 6)?;
    let duration_secs: u32 = parse(field(record, line, 7, "duration")?, line)?;
    let fault_declared = flag(field(record, line, 8, "fault flag")?, line)?;
    let promo = flag(field(record, line, 9, "promo flag")?, line)?;
    Ok(Rental {
        user_id,
        vehicle_id,
        started_at,
        start,
        goal,
        duration_secs,
        fault_declared,
        promo,
        discount: false,
    })
}

fn field<'a>(
    record: &'a StringRecord,
    line: u64,
    index: usize,
    name: &str,
) -> Result<&'a str, FeedError> {
    record
        .get(index)
        .ok_or_else(|| malformed(line, format!("missing {name} column")))
}

fn grid_cell(record: &StringRecord, line: u64, x: usize, y: usize) -> Result<GridCell, FeedError> {
    let x: u8 = parse(field(record, line, x, "x")?, line)?;
    let y: u8 = parse(field(record, line, y, "y")?, line)?;
    GridCell::new(x, y).ok_or_else(|| malformed(line, format!("coordinate ({x},{y}) off grid")))
}

fn parse<T: std::str::FromStr>(raw: &str, line: u64) -> Result<T, FeedError> {
    raw.parse()
        .map_err(|_| malformed(line, format!("not a number: {raw:?}")))
}

fn flag(raw: &str, line: u64) -> Result<bool, FeedError> {
    match raw {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(malformed(line, format!("flag must be yes/no, got {other:?}"))),
    }
}

fn malformed(line: u64, reason: String) -> FeedError {
    FeedError::Malformed { line, reason }
}
