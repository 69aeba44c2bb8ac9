//! Error types shared across the crate.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Failures while loading the vehicle or rental feeds.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed record at line {line}: {reason}")]
    Malformed { line: u64, reason: String },

    #[error("duplicate booking for vehicle {vehicle_id} at {at}")]
    DuplicateBooking {
        vehicle_id: String,
        at: NaiveDateTime,
    },

    #[error("unknown vehicle kind {kind:?}")]
    UnknownVehicleKind { kind: String },

    #[error("failed to open feed {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("i/o error reading {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while pricing or persisting a bill.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("no vehicle registered under id {vehicle_id}")]
    UnknownVehicle { vehicle_id: String },

    #[error("failed to persist bill {bill_id}")]
    Persistence {
        bill_id: u64,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while driving the simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("time group at {at} did not finish within {timeout_ms} ms")]
    Timeout { at: NaiveDateTime, timeout_ms: u64 },
}

/// Failures while reading a properties configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing key {key:?} in {path}")]
    MissingKey { path: PathBuf, key: String },

    #[error("key {key:?} in {path} is not a number: {value:?}")]
    InvalidNumber {
        path: PathBuf,
        key: String,
        value: String,
    },
}

/// Failures while parsing persisted bills or writing reports.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("bill file {path} is missing field {field:?}")]
    MissingField { path: PathBuf, field: String },

    #[error("bill file {path} has invalid {field:?}: {value:?}")]
    InvalidField {
        path: PathBuf,
        field: String,
        value: String,
    },

    #[error("i/o error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot serialization failed")]
    Json(#[from] serde_json::Error),
}
