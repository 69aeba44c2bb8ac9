//! Bill pricing and persistence.
//!
//! Prices combine the vehicle's per-second rate, an area multiplier and
//! the discount/promo percentages; faulted rentals are billed at zero.
//! Each bill is written as a flat `key: value` text file which the
//! reporting layer parses back.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::NaiveDateTime;
use tracing::info;

use crate::config::Properties;
use crate::error::{BillingError, ConfigError};
use crate::grid::Area;
use crate::rental::Rental;
use crate::vehicle::{Vehicle, VehicleKind};

/// Timestamp layout used in persisted bills.
pub const BILL_DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Per-second rates and pricing multipliers, loaded from a properties file.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    pub car_unit_price: f64,
    pub bicycle_unit_price: f64,
    pub scooter_unit_price: f64,
    pub distance_narrow: f64,
    pub distance_wide: f64,
    /// Percentage (0-100) taken off for a loyalty-discounted rental.
    pub discount_percent: f64,
    /// Percentage (0-100) taken off for a promotional rental.
    pub promo_percent: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            car_unit_price: 0.3,
            bicycle_unit_price: 0.1,
            scooter_unit_price: 0.15,
            distance_narrow: 1.0,
            distance_wide: 1.25,
            discount_percent: 10.0,
            promo_percent: 5.0,
        }
    }
}

impl PricingConfig {
    pub fn from_properties_file(path: &Path) -> Result<Self, ConfigError> {
        let props = Properties::load(path)?;
        Ok(Self {
            car_unit_price: props.require_f64("CAR_UNIT_PRICE")?,
            bicycle_unit_price: props.require_f64("BIKE_UNIT_PRICE")?,
            scooter_unit_price: props.require_f64("SCOOTER_UNIT_PRICE")?,
            distance_narrow: props.require_f64("DISTANCE_NARROW")?,
            distance_wide: props.require_f64("DISTANCE_WIDE")?,
            discount_percent: props.require_f64("DISCOUNT")?,
            promo_percent: props.require_f64("DISCOUNT_PROM")?,
        })
    }

    fn unit_price(&self, kind: &VehicleKind) -> f64 {
        match kind {
            VehicleKind::Car { .. } => self.car_unit_price,
            VehicleKind::Bicycle { .. } => self.bicycle_unit_price,
            VehicleKind::Scooter { .. } => self.scooter_unit_price,
        }
    }
}

/// Immutable pricing record for one completed rental.
#[derive(Debug, Clone, PartialEq)]
pub struct Bill {
    pub id: u64,
    pub area: Area,
    pub vehicle_id: String,
    pub started_at: NaiveDateTime,
    pub fault: bool,
    pub base_price: f64,
    pub distance_factor: f64,
    pub discount_factor: f64,
    pub promo_factor: f64,
    pub total_price: f64,
}

impl Bill {
    /// Area-adjusted price the discount and promo are taken from.
    pub fn area_price(&self) -> f64 {
        self.base_price * self.distance_factor
    }

    pub fn discount_amount(&self) -> f64 {
        self.discount_factor * self.area_price()
    }

    pub fn promo_amount(&self) -> f64 {
        self.promo_factor * self.area_price()
    }
}

/// Prices rentals and persists one bill file per rental.
#[derive(Debug)]
pub struct BillingEngine {
    pricing: PricingConfig,
    bills_dir: PathBuf,
    next_id: AtomicU64,
    ledger: Mutex<Vec<Bill>>,
}

impl BillingEngine {
    pub fn new(pricing: PricingConfig, bills_dir: impl Into<PathBuf>) -> Self {
        Self {
            pricing,
            bills_dir: bills_dir.into(),
            next_id: AtomicU64::new(1),
            ledger: Mutex::new(Vec::new()),
        }
    }

    /// Prices the rental without persisting anything.
    ///
    /// Discount and promo both apply to the area-adjusted price; a
    /// faulted rental is forced to zero, not discounted further.
    pub fn price(&self, rental: &Rental, vehicle: &Vehicle, faulted: bool) -> Bill {
        let area = Area::classify(rental.start, rental.goal);
        let distance_factor = match area {
            Area::Narrow => self.pricing.distance_narrow,
            Area::Wide => self.pricing.distance_wide,
        };
        let discount_factor = if rental.discount {
            self.pricing.discount_percent / 100.0
        } else {
            0.0
        };
        let promo_factor = if rental.promo {
            self.pricing.promo_percent / 100.0
        } else {
            0.0
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if faulted {
            return Bill {
                id,
                area,
                vehicle_id: rental.vehicle_id.clone(),
                started_at: rental.started_at,
                fault: true,
                base_price: 0.0,
                distance_factor,
                discount_factor,
                promo_factor,
                total_price: 0.0,
            };
        }
        let base_price =
            self.pricing.unit_price(&vehicle.kind) * f64::from(rental.duration_secs);
        let area_price = base_price * distance_factor;
        let total_price = area_price - discount_factor * area_price - promo_factor * area_price;
        Bill {
            id,
            area,
            vehicle_id: rental.vehicle_id.clone(),
            started_at: rental.started_at,
            fault: false,
            base_price,
            distance_factor,
            discount_factor,
            promo_factor,
            total_price,
        }
    }

    /// Prices the rental, appends the bill to the ledger and writes
    /// `{id}_rentbill.txt` under the bills directory.
    pub fn generate_bill(
        &self,
        rental: &Rental,
        vehicle: &Vehicle,
        faulted: bool,
    ) -> Result<Bill, BillingError> {
        let bill = self.price(rental, vehicle, faulted);
        let path = self.bills_dir.join(format!("{}_rentbill.txt", bill.id));
        fs::write(&path, render_bill(&bill)).map_err(|source| BillingError::Persistence {
            bill_id: bill.id,
            source,
        })?;
        info!(bill_id = bill.id, vehicle_id = %bill.vehicle_id, total = bill.total_price, "bill persisted");
        self.ledger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(bill.clone());
        Ok(bill)
    }

    /// Snapshot of every bill generated so far, in generation order.
    pub fn ledger(&self) -> Vec<Bill> {
        self.ledger
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Renders the flat text form persisted per bill.
pub fn render_bill(bill: &Bill) -> String {
    format!(
        "bill: {}\n\
         area: {}\n\
         vehicle: {}\n\
         date and time: {}\n\
         fault: {}\n\
         base price: {:.2}\n\
         distance factor: {:.2}\n\
         discount factor: {:.2}\n\
         promo factor: {:.2}\n\
         total price: {:.2}\n",
        bill.id,
        bill.area,
        bill.vehicle_id,
        bill.started_at.format(BILL_DATE_FORMAT),
        if bill.fault { "yes" } else { "no" },
        bill.base_price,
        bill.distance_factor,
        bill.discount_factor,
        bill.promo_factor,
        bill.total_price,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{cell, test_rental, test_scooter, ts};

    fn engine(dir: &Path) -> BillingEngine {
        BillingEngine::new(PricingConfig::default(), dir)
    }

    #[test]
    fn faulted_rental_is_zero_priced() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = engine(dir.path());
        let mut rental = test_rental("ana", "SC-1", ts(2024, 5, 1, 10, 0), cell(2, 2), cell(8, 8));
        rental.discount = true;
        rental.promo = true;
        let bill = engine.price(&rental, &test_scooter("SC-1"), true);
        assert_eq!(bill.base_price, 0.0);
        assert_eq!(bill.total_price, 0.0);
        assert!(bill.fault);
        // Factors are still recorded for the report.
        assert_eq!(bill.discount_factor, 0.1);
    }

    #[test]
    fn discount_and_promo_apply_to_area_price_independently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = engine(dir.path());
        let mut rental =
            test_rental("ana", "SC-1", ts(2024, 5, 1, 10, 0), cell(2, 2), cell(8, 8));
        rental.duration_secs = 100;
        rental.discount = true;
        rental.promo = true;
        let bill = engine.price(&rental, &test_scooter("SC-1"), false);
        // Wide area: start (2,2) is outside the inner ring.
        assert_eq!(bill.area, Area::Wide);
        let area_price = 0.15 * 100.0 * 1.25;
        assert!((bill.area_price() - area_price).abs() < 1e-9);
        let expected = area_price - 0.1 * area_price - 0.05 * area_price;
        assert!((bill.total_price - expected).abs() < 1e-9);
    }

    #[test]
    fn bill_ids_increase_monotonically() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = engine(dir.path());
        let rental = test_rental("ana", "SC-1", ts(2024, 5, 1, 10, 0), cell(6, 6), cell(8, 8));
        let vehicle = test_scooter("SC-1");
        let a = engine.generate_bill(&rental, &vehicle, false).expect("bill");
        let b = engine.generate_bill(&rental, &vehicle, false).expect("bill");
        assert!(b.id > a.id);
        assert_eq!(engine.ledger().len(), 2);
        assert!(dir.path().join(format!("{}_rentbill.txt", a.id)).exists());
    }

    #[test]
    fn rendered_bill_lists_every_field() {
        let bill = Bill {
            id: 7,
            area: Area::Narrow,
            vehicle_id: "SC-1".into(),
            started_at: ts(2024, 5, 1, 10, 0),
            fault: false,
            base_price: 15.0,
            distance_factor: 1.0,
            discount_factor: 0.1,
            promo_factor: 0.0,
            total_price: 13.5,
        };
        let text = render_bill(&bill);
        assert!(text.contains("bill: 7\n"));
        assert!(text.contains("area: narrow\n"));
        assert!(text.contains("date and time: 01.05.2024 10:00\n"));
        assert!(text.contains("fault: no\n"));
        assert!(text.contains("total price: 13.50\n"));
        assert_eq!(text.lines().count(), 10);
    }
}
