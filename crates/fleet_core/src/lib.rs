//! Fleet rental replay engine.
//!
//! Replays a historical log of shared-vehicle rentals (cars, e-bicycles,
//! e-scooters) over a 20x20 grid. Bookings sharing a start timestamp run
//! concurrently; the scheduler barrier-waits on each group, throttles
//! and moves on. Each rental walks its Manhattan route in simulated
//! wall-clock time, drains the battery, surfaces declared faults and
//! ends in a priced bill that the reporting layer folds into daily,
//! summary and loss-analysis views.

pub mod billing;
pub mod charging;
mod config;
pub mod error;
pub mod faults;
pub mod feed;
pub mod fleet;
pub mod grid;
pub mod movement;
pub mod registry;
pub mod rental;
pub mod reporting;
pub mod scenario;
pub mod scheduler;
pub mod vehicle;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
