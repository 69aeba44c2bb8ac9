//! Vehicle kinds, battery accounting and the fault taxonomy.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Battery level after a full recharge.
pub const FULL_BATTERY_PERCENT: u8 = 100;

/// Batteries never report below this while a route is in progress.
pub const MIN_BATTERY_PERCENT: u8 = 5;

/// Percent of charge a whole route consumes, spread across its steps.
pub const DRAIN_PER_ROUTE: u32 = 33;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum VehicleKind {
    Car {
        purchase_date: NaiveDate,
    },
    Bicycle {
        /// Steps the bicycle can cover on one charge before the battery
        /// drops straight to the floor.
        autonomy_steps: u32,
    },
    Scooter {
        /// Top speed in cells per hour; bounds how fast a route may replay.
        max_speed: u32,
    },
}

impl VehicleKind {
    pub fn label(&self) -> &'static str {
        match self {
            VehicleKind::Car { .. } => "car",
            VehicleKind::Bicycle { .. } => "bicycle",
            VehicleKind::Scooter { .. } => "scooter",
        }
    }
}

/// Defect categories a rental can declare against its vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    EngineFailure,
    BatteryIssue,
    BrakeFailure,
    ElectricalFault,
    SoftwareGlitch,
    TirePuncture,
}

impl FaultKind {
    pub const ALL: [FaultKind; 6] = [
        FaultKind::EngineFailure,
        FaultKind::BatteryIssue,
        FaultKind::BrakeFailure,
        FaultKind::ElectricalFault,
        FaultKind::SoftwareGlitch,
        FaultKind::TirePuncture,
    ];

    /// Draws a uniformly random fault kind from the model's rng.
    pub fn sample(rng: &mut StdRng) -> FaultKind {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FaultKind::EngineFailure => "engine failure",
            FaultKind::BatteryIssue => "battery issue",
            FaultKind::BrakeFailure => "brake failure",
            FaultKind::ElectricalFault => "electrical fault",
            FaultKind::SoftwareGlitch => "software glitch",
            FaultKind::TirePuncture => "tire puncture",
        };
        write!(f, "{label}")
    }
}

/// A concrete defect pinned to the rental it surfaced in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,
    pub occurred_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub manufacturer: String,
    pub model: String,
    pub kind: VehicleKind,
    /// Acquisition price, used for repair costing.
    pub purchase_price: f64,
    /// Current charge in percent.
    pub battery_percent: u8,
    /// Defects recorded so far, kept sorted by occurrence time.
    pub faults: Vec<Fault>,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, kind: VehicleKind, purchase_price: f64) -> Self {
        Self {
            id: id.into(),
            manufacturer: String::new(),
            model: String::new(),
            kind,
            purchase_price,
            battery_percent: FULL_BATTERY_PERCENT,
            faults: Vec::new(),
        }
    }

    /// Charge level after covering `steps` of a route `total_steps` long.
    ///
    /// Drain is absolute from a full battery: each route starts at 100
    /// and sheds [`DRAIN_PER_ROUTE`] percent spread evenly over its
    /// steps, never dipping below [`MIN_BATTERY_PERCENT`]. Bicycles that
    /// exceed their autonomy drop straight to the floor.
    pub fn battery_after_steps(&self, steps: u32, total_steps: u32) -> u8 {
        if total_steps == 0 {
            return FULL_BATTERY_PERCENT;
        }
        if let VehicleKind::Bicycle { autonomy_steps } = self.kind {
            if steps >= autonomy_steps {
                return MIN_BATTERY_PERCENT;
            }
        }
        let drained = u32::from(FULL_BATTERY_PERCENT)
            .saturating_sub(steps * DRAIN_PER_ROUTE / total_steps);
        drained.max(u32::from(MIN_BATTERY_PERCENT)) as u8
    }
}
