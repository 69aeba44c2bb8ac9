//! Rental bookings and the users who place them.

use chrono::{Duration, NaiveDateTime};

use crate::grid::GridCell;

/// One historical booking to be replayed.
#[derive(Debug, Clone, PartialEq)]
pub struct Rental {
    pub user_id: String,
    pub vehicle_id: String,
    pub started_at: NaiveDateTime,
    pub start: GridCell,
    pub goal: GridCell,
    pub duration_secs: u32,
    /// Set when the booking itself declares the vehicle faulted.
    pub fault_declared: bool,
    /// Promotional pricing flag carried by the booking.
    pub promo: bool,
    /// Every tenth rental of a user earns the loyalty discount.
    pub discount: bool,
}

impl Rental {
    /// Manhattan length of the route in grid steps.
    pub fn total_steps(&self) -> u32 {
        self.start.steps_to(self.goal)
    }

    /// Wall-clock end of the booking.
    pub fn ends_at(&self) -> NaiveDateTime {
        self.started_at + Duration::seconds(i64::from(self.duration_secs))
    }
}

/// Per-user rental tally, used for discount assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub driver_license: Option<String>,
    pub rent_counter: u32,
}
