//! Read-only reporting over persisted bills: daily totals, the run
//! summary and the per-kind loss analysis with its JSON snapshot.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::billing::{Bill, BILL_DATE_FORMAT};
use crate::config::Properties;
use crate::error::{ConfigError, ReportError};
use crate::grid::Area;
use crate::vehicle::{Vehicle, VehicleKind};

/// Repair and overhead coefficients, loaded from a properties file.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairCostConfig {
    pub car_repair_coefficient: f64,
    pub bicycle_repair_coefficient: f64,
    pub scooter_repair_coefficient: f64,
    pub maintenance_coefficient: f64,
    pub expense_coefficient: f64,
    pub tax_coefficient: f64,
}

impl Default for RepairCostConfig {
    fn default() -> Self {
        Self {
            car_repair_coefficient: 0.07,
            bicycle_repair_coefficient: 0.04,
            scooter_repair_coefficient: 0.02,
            maintenance_coefficient: 0.2,
            expense_coefficient: 0.2,
            tax_coefficient: 0.1,
        }
    }
}

impl RepairCostConfig {
    pub fn from_properties_file(path: &Path) -> Result<Self, ConfigError> {
        let props = Properties::load(path)?;
        Ok(Self {
            car_repair_coefficient: props.require_f64("CAR_REPAIR_COEFFICIENT")?,
            bicycle_repair_coefficient: props.require_f64("BIKE_REPAIR_COEFFICIENT")?,
            scooter_repair_coefficient: props.require_f64("SCOOTER_REPAIR_COEFFICIENT")?,
            maintenance_coefficient: props.require_f64("MAINTENANCE_COEFFICIENT")?,
            expense_coefficient: props.require_f64("EXPENSE_COEFFICIENT")?,
            tax_coefficient: props.require_f64("TAX_COEFFICIENT")?,
        })
    }

    fn repair_coefficient(&self, kind: &VehicleKind) -> f64 {
        match kind {
            VehicleKind::Car { .. } => self.car_repair_coefficient,
            VehicleKind::Bicycle { .. } => self.bicycle_repair_coefficient,
            VehicleKind::Scooter { .. } => self.scooter_repair_coefficient,
        }
    }

    /// Cost of repairing one fault on `vehicle`.
    pub fn repair_cost(&self, vehicle: &Vehicle) -> f64 {
        self.repair_coefficient(&vehicle.kind) * vehicle.purchase_price
    }
}

/// Parses one persisted bill file back into a [`Bill`].
pub fn parse_bill(path: &Path) -> Result<Bill, ReportError> {
    let text = fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for line in text.lines() {
        // "date and time" contains no colon, so the first one splits.
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim(), value.trim());
        }
    }
    let take = |field: &str| -> Result<&str, ReportError> {
        fields
            .get(field)
            .copied()
            .ok_or_else(|| ReportError::MissingField {
                path: path.to_path_buf(),
                field: field.to_string(),
            })
    };
    let invalid = |field: &str, value: &str| ReportError::InvalidField {
        path: path.to_path_buf(),
        field: field.to_string(),
        value: value.to_string(),
    };
    let number = |field: &str| -> Result<f64, ReportError> {
        let raw = take(field)?;
        raw.parse().map_err(|_| invalid(field, raw))
    };

    let raw_id = take("bill")?;
    let id: u64 = raw_id.parse().map_err(|_| invalid("bill", raw_id))?;
    let raw_area = take("area")?;
    let area = match raw_area {
        "narrow" => Area::Narrow,
        "wide" => Area::Wide,
        other => return Err(invalid("area", other)),
    };
    let raw_date = take("date and time")?;
    let started_at = NaiveDateTime::parse_from_str(raw_date, BILL_DATE_FORMAT)
        .map_err(|_| invalid("date and time", raw_date))?;
    let raw_fault = take("fault")?;
    let fault = match raw_fault {
        "yes" => true,
        "no" => false,
        other => return Err(invalid("fault", other)),
    };

    Ok(Bill {
        id,
        area,
        vehicle_id: take("vehicle")?.to_string(),
        started_at,
        fault,
        base_price: number("base price")?,
        distance_factor: number("distance factor")?,
        discount_factor: number("discount factor")?,
        promo_factor: number("promo factor")?,
        total_price: number("total price")?,
    })
}

/// Loads every `*_rentbill.txt` under `dir`, skipping unparseable files
/// and duplicate ids, sorted by bill id.
pub fn load_bills(dir: &Path) -> Result<Vec<Bill>, ReportError> {
    let entries = fs::read_dir(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut bills: Vec<Bill> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for entry in entries {
        let entry = entry.map_err(|source| ReportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_bill = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with("_rentbill.txt"));
        if !is_bill {
            continue;
        }
        match parse_bill(&path) {
            Ok(bill) => {
                if !seen.insert(bill.id) {
                    warn!(bill_id = bill.id, ?path, "duplicate bill id, skipping");
                    continue;
                }
                bills.push(bill);
            }
            Err(err) => warn!(%err, ?path, "unparseable bill, skipping"),
        }
    }
    bills.sort_by_key(|b| b.id);
    Ok(bills)
}

/// Groups bills by the calendar day of their rental.
pub fn bills_by_day(bills: &[Bill]) -> BTreeMap<NaiveDate, Vec<&Bill>> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&Bill>> = BTreeMap::new();
    for bill in bills {
        by_day.entry(bill.started_at.date()).or_default().push(bill);
    }
    by_day
}

/// Totals folded over a set of bills. Repairs sum the per-kind repair
/// cost of every faulted bill; bills naming an unknown vehicle
/// contribute income but no repair cost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillTotals {
    pub rentals: usize,
    pub faulted: usize,
    pub income: f64,
    pub narrow_income: f64,
    pub wide_income: f64,
    pub discount_given: f64,
    pub promo_given: f64,
    pub maintenance: f64,
    pub repairs: f64,
}

impl BillTotals {
    pub fn fold<'a>(
        bills: impl IntoIterator<Item = &'a Bill>,
        vehicles: &HashMap<String, Vehicle>,
        config: &RepairCostConfig,
    ) -> Self {
        let mut totals = BillTotals::default();
        for bill in bills {
            totals.rentals += 1;
            totals.income += bill.total_price;
            match bill.area {
                Area::Narrow => totals.narrow_income += bill.total_price,
                Area::Wide => totals.wide_income += bill.total_price,
            }
            totals.discount_given += bill.discount_amount();
            totals.promo_given += bill.promo_amount();
            if bill.fault {
                totals.faulted += 1;
                if let Some(vehicle) = vehicles.get(&bill.vehicle_id) {
                    totals.repairs += config.repair_cost(vehicle);
                }
            }
        }
        totals.maintenance = totals.income * config.maintenance_coefficient;
        totals
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayTotals {
    pub day: NaiveDate,
    pub totals: BillTotals,
}

/// Per-day roll-up of the billing output.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyReport {
    pub days: Vec<DayTotals>,
}

impl DailyReport {
    pub fn generate(
        bills: &[Bill],
        vehicles: &HashMap<String, Vehicle>,
        config: &RepairCostConfig,
    ) -> Self {
        let days = bills_by_day(bills)
            .into_iter()
            .map(|(day, bills)| DayTotals {
                day,
                totals: BillTotals::fold(bills, vehicles, config),
            })
            .collect();
        Self { days }
    }
}

/// Whole-run financials derived from the billing output.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub totals: BillTotals,
    pub expenses: f64,
    pub tax: f64,
}

impl SummaryReport {
    pub fn generate(
        bills: &[Bill],
        vehicles: &HashMap<String, Vehicle>,
        config: &RepairCostConfig,
    ) -> Self {
        let totals = BillTotals::fold(bills, vehicles, config);
        let expenses = totals.income * config.expense_coefficient;
        let tax = (totals.income - totals.maintenance - totals.repairs - expenses).abs()
            * config.tax_coefficient;
        Self {
            totals,
            expenses,
            tax,
        }
    }

    pub fn profit(&self) -> f64 {
        self.totals.income - self.totals.maintenance - self.totals.repairs - self.expenses
            - self.tax
    }
}

/// A vehicle and the repair loss attributed to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleLoss {
    pub vehicle: Vehicle,
    pub loss: f64,
}

/// The costliest faulting vehicle of each kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossAnalysis {
    pub worst_car: Option<VehicleLoss>,
    pub worst_bicycle: Option<VehicleLoss>,
    pub worst_scooter: Option<VehicleLoss>,
}

impl LossAnalysis {
    pub fn generate(
        bills: &[Bill],
        vehicles: &HashMap<String, Vehicle>,
        config: &RepairCostConfig,
    ) -> Self {
        let mut losses: HashMap<&str, f64> = HashMap::new();
        for bill in bills.iter().filter(|b| b.fault) {
            if let Some(vehicle) = vehicles.get(&bill.vehicle_id) {
                *losses.entry(vehicle.id.as_str()).or_default() += config.repair_cost(vehicle);
            }
        }
        let mut analysis = LossAnalysis::default();
        for (vehicle_id, loss) in losses {
            let Some(vehicle) = vehicles.get(vehicle_id) else {
                continue;
            };
            let slot = match vehicle.kind {
                VehicleKind::Car { .. } => &mut analysis.worst_car,
                VehicleKind::Bicycle { .. } => &mut analysis.worst_bicycle,
                VehicleKind::Scooter { .. } => &mut analysis.worst_scooter,
            };
            if slot.as_ref().is_none_or(|current| loss > current.loss) {
                *slot = Some(VehicleLoss {
                    vehicle: vehicle.clone(),
                    loss,
                });
            }
        }
        analysis
    }

    pub fn write_snapshot(&self, path: &Path) -> Result<(), ReportError> {
        let snapshot = LossSnapshot::V1 {
            worst_car: self.worst_car.clone(),
            worst_bicycle: self.worst_bicycle.clone(),
            worst_scooter: self.worst_scooter.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(path, json).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read_snapshot(path: &Path) -> Result<Self, ReportError> {
        let text = fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let LossSnapshot::V1 {
            worst_car,
            worst_bicycle,
            worst_scooter,
        } = serde_json::from_str(&text)?;
        Ok(Self {
            worst_car,
            worst_bicycle,
            worst_scooter,
        })
    }
}

/// Versioned on-disk form of the loss analysis. New layouts get a new
/// tag so stale snapshots fail the schema check instead of misparsing.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "schema")]
enum LossSnapshot {
    #[serde(rename = "loss-analysis/v1")]
    V1 {
        worst_car: Option<VehicleLoss>,
        worst_bicycle: Option<VehicleLoss>,
        worst_scooter: Option<VehicleLoss>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::render_bill;
    use crate::test_helpers::{test_bicycle, test_car, test_scooter, ts};

    fn bill(id: u64, vehicle_id: &str, day: u32, fault: bool, total: f64) -> Bill {
        Bill {
            id,
            area: Area::Narrow,
            vehicle_id: vehicle_id.to_string(),
            started_at: ts(2024, 5, day, 10, 0),
            fault,
            base_price: total,
            distance_factor: 1.0,
            discount_factor: 0.0,
            promo_factor: 0.0,
            total_price: total,
        }
    }

    #[test]
    fn bill_round_trips_through_the_file_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = Bill {
            id: 42,
            area: Area::Wide,
            vehicle_id: "SC-1".into(),
            started_at: ts(2024, 5, 3, 18, 45),
            fault: false,
            base_price: 18.75,
            distance_factor: 1.25,
            discount_factor: 0.1,
            promo_factor: 0.05,
            total_price: 19.92,
        };
        let path = dir.path().join("42_rentbill.txt");
        std::fs::write(&path, render_bill(&original)).expect("write bill");
        let parsed = parse_bill(&path).expect("parse");
        assert_eq!(parsed, original);
    }

    #[test]
    fn load_bills_skips_garbage_and_sorts() {
        let dir = tempfile::tempdir().expect("tempdir");
        for bill in [bill(3, "SC-1", 1, false, 10.0), bill(1, "SC-1", 1, false, 5.0)] {
            let path = dir.path().join(format!("{}_rentbill.txt", bill.id));
            std::fs::write(&path, render_bill(&bill)).expect("write bill");
        }
        std::fs::write(dir.path().join("9_rentbill.txt"), "not a bill").expect("write");
        std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write");
        let bills = load_bills(dir.path()).expect("load");
        let ids: Vec<u64> = bills.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn daily_report_groups_and_sums() {
        let bills = vec![
            bill(1, "SC-1", 1, false, 10.0),
            bill(2, "SC-2", 1, true, 0.0),
            bill(3, "SC-1", 2, false, 7.5),
        ];
        let vehicles: HashMap<String, Vehicle> = [
            ("SC-1".to_string(), test_scooter("SC-1")),
            ("SC-2".to_string(), test_scooter("SC-2")),
        ]
        .into();
        let config = RepairCostConfig::default();
        let report = DailyReport::generate(&bills, &vehicles, &config);
        assert_eq!(report.days.len(), 2);
        assert_eq!(report.days[0].totals.rentals, 2);
        assert_eq!(report.days[0].totals.faulted, 1);
        assert!((report.days[0].totals.income - 10.0).abs() < 1e-9);
        assert!((report.days[0].totals.repairs - 9.0).abs() < 1e-9);
        assert!((report.days[1].totals.income - 7.5).abs() < 1e-9);
        assert!((report.days[1].totals.narrow_income - 7.5).abs() < 1e-9);
        assert_eq!(report.days[1].totals.wide_income, 0.0);
    }

    #[test]
    fn summary_report_applies_coefficients() {
        let mut discounted = bill(3, "SC-1", 2, false, 100.0);
        discounted.discount_factor = 0.1;
        let bills = vec![bill(1, "SC-1", 1, false, 100.0), bill(2, "SC-1", 1, true, 0.0)];
        let vehicles: HashMap<String, Vehicle> =
            [("SC-1".to_string(), test_scooter("SC-1"))].into();
        let config = RepairCostConfig::default();
        let summary = SummaryReport::generate(&bills, &vehicles, &config);
        assert!((summary.totals.income - 100.0).abs() < 1e-9);
        assert!((summary.totals.maintenance - 20.0).abs() < 1e-9);
        // Scooter repair: 0.02 * 450 purchase price.
        assert!((summary.totals.repairs - 9.0).abs() < 1e-9);
        assert!((summary.expenses - 20.0).abs() < 1e-9);
        assert!((summary.tax - 5.1).abs() < 1e-9);

        let with_discount = SummaryReport::generate(&[discounted], &vehicles, &config);
        assert!((with_discount.totals.discount_given - 10.0).abs() < 1e-9);
    }

    #[test]
    fn loss_analysis_picks_worst_vehicle_per_kind() {
        let bills = vec![
            bill(1, "SC-1", 1, true, 0.0),
            bill(2, "SC-1", 2, true, 0.0),
            bill(3, "SC-2", 1, true, 0.0),
            bill(4, "BI-1", 1, true, 0.0),
        ];
        let mut expensive = test_scooter("SC-2");
        expensive.purchase_price = 10_000.0;
        let vehicles: HashMap<String, Vehicle> = [
            ("SC-1".to_string(), test_scooter("SC-1")),
            ("SC-2".to_string(), expensive),
            ("BI-1".to_string(), test_bicycle("BI-1", 30)),
            ("CAR-1".to_string(), test_car("CAR-1")),
        ]
        .into();
        let analysis = LossAnalysis::generate(&bills, &vehicles, &RepairCostConfig::default());
        // Two faults on the cheap scooter still lose to one on the dear one.
        assert_eq!(
            analysis.worst_scooter.as_ref().map(|l| l.vehicle.id.as_str()),
            Some("SC-2")
        );
        assert!(analysis.worst_bicycle.is_some());
        assert!(analysis.worst_car.is_none());
    }

    #[test]
    fn snapshot_round_trips_and_checks_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("losses.json");
        let analysis = LossAnalysis {
            worst_scooter: Some(VehicleLoss {
                vehicle: test_scooter("SC-1"),
                loss: 9.0,
            }),
            ..LossAnalysis::default()
        };
        analysis.write_snapshot(&path).expect("write");
        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.contains("loss-analysis/v1"));
        let restored = LossAnalysis::read_snapshot(&path).expect("read snapshot");
        assert_eq!(restored, analysis);

        std::fs::write(&path, r#"{"schema":"loss-analysis/v9"}"#).expect("write");
        assert!(LossAnalysis::read_snapshot(&path).is_err());
    }
}
