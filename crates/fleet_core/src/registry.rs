//! Booking registry: duplicate rejection, loyalty discount assignment and
//! the day/time-group schedule the simulation replays.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::FeedError;
use crate::rental::{Rental, User};

/// Every tenth chronological rental of a user is discounted.
const DISCOUNT_EVERY: u32 = 10;

/// Rentals sharing one start timestamp; replayed concurrently.
#[derive(Debug, Clone)]
pub struct TimeSlot {
    pub at: NaiveDateTime,
    pub rentals: Vec<Arc<Rental>>,
}

/// All time slots of one calendar day, in chronological order.
#[derive(Debug, Clone)]
pub struct DayGroup {
    pub day: NaiveDate,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Default)]
pub struct RentalRegistry {
    rentals: Vec<Rental>,
    bookings: HashSet<(String, NaiveDateTime)>,
    users: HashMap<String, User>,
}

impl RentalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a booking. A vehicle can only be booked once per
    /// timestamp; a second booking for the same pair is rejected.
    pub fn insert(&mut self, rental: Rental) -> Result<(), FeedError> {
        let key = (rental.vehicle_id.clone(), rental.started_at);
        if !self.bookings.insert(key) {
            return Err(FeedError::DuplicateBooking {
                vehicle_id: rental.vehicle_id,
                at: rental.started_at,
            });
        }
        self.users
            .entry(rental.user_id.clone())
            .or_insert_with(|| User {
                id: rental.user_id.clone(),
                ..User::default()
            });
        self.rentals.push(rental);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rentals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rentals.is_empty()
    }

    pub fn rentals(&self) -> &[Rental] {
        &self.rentals
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Walks the registry in chronological order and flags every tenth
    /// rental of each user. Ties on the start timestamp keep feed order.
    pub fn assign_discounts(&mut self) {
        self.rentals.sort_by_key(|r| r.started_at);
        for user in self.users.values_mut() {
            user.rent_counter = 0;
        }
        for rental in &mut self.rentals {
            let counter = self
                .users
                .get_mut(&rental.user_id)
                .map(|user| {
                    user.rent_counter += 1;
                    user.rent_counter
                })
                .unwrap_or(0);
            rental.discount = counter > 0 && counter % DISCOUNT_EVERY == 0;
        }
    }

    /// Groups rentals into calendar days and, within each day, time slots
    /// of identical start timestamps. Days and slots come out ordered.
    pub fn schedule(&self) -> Vec<DayGroup> {
        let mut by_slot: BTreeMap<NaiveDateTime, Vec<Arc<Rental>>> = BTreeMap::new();
        for rental in &self.rentals {
            by_slot
                .entry(rental.started_at)
                .or_default()
                .push(Arc::new(rental.clone()));
        }
        let mut days: Vec<DayGroup> = Vec::new();
        for (at, rentals) in by_slot {
            let slot = TimeSlot { at, rentals };
            if let Some(group) = days.last_mut() {
                if group.day == at.date() {
                    group.slots.push(slot);
                    continue;
                }
            }
            days.push(DayGroup {
                day: at.date(),
                slots: vec![slot],
            });
        }
        days
    }

    /// Start of the earliest booking of `vehicle_id` strictly after
    /// `after`, used to bound recharge time between back-to-back rentals.
    pub fn next_rental_start(
        &self,
        vehicle_id: &str,
        after: NaiveDateTime,
    ) -> Option<NaiveDateTime> {
        self.rentals
            .iter()
            .filter(|r| r.vehicle_id == vehicle_id && r.started_at > after)
            .map(|r| r.started_at)
            .min()
    }
}
