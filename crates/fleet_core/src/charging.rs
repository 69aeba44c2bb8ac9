//! Depot charging between bookings.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::vehicle::{Vehicle, FULL_BATTERY_PERCENT};

/// Percentage points gained per minute on the charger.
pub const CHARGE_PERCENT_PER_MINUTE: u8 = 1;

/// Charges the vehicle after a completed rental.
///
/// With a next booking the vehicle charges for the gap between
/// `rental_end` and that booking, capped at full; with none it returns
/// to the depot and comes back full.
pub fn charge_until_next(
    vehicle: &mut Vehicle,
    rental_end: NaiveDateTime,
    next_rental_start: Option<NaiveDateTime>,
) {
    let before = vehicle.battery_percent;
    match next_rental_start {
        Some(next_start) => {
            let minutes = (next_start - rental_end).num_minutes().max(0);
            let gained = minutes.saturating_mul(i64::from(CHARGE_PERCENT_PER_MINUTE));
            let charged = i64::from(before).saturating_add(gained);
            vehicle.battery_percent = charged.min(i64::from(FULL_BATTERY_PERCENT)) as u8;
        }
        None => vehicle.battery_percent = FULL_BATTERY_PERCENT,
    }
    debug!(vehicle_id = %vehicle.id, before, after = vehicle.battery_percent, "charged");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{test_scooter, ts};
    use chrono::Duration;

    #[test]
    fn charges_one_point_per_minute_capped_at_full() {
        let mut v = test_scooter("SC-1");
        v.battery_percent = 60;
        let end = ts(2024, 5, 1, 10, 0);
        charge_until_next(&mut v, end, Some(end + Duration::minutes(47)));
        assert_eq!(v.battery_percent, 100);

        v.battery_percent = 40;
        charge_until_next(&mut v, end, Some(end + Duration::minutes(47)));
        assert_eq!(v.battery_percent, 87);
    }

    #[test]
    fn no_next_booking_means_full_charge() {
        let mut v = test_scooter("SC-1");
        v.battery_percent = 12;
        charge_until_next(&mut v, ts(2024, 5, 1, 10, 0), None);
        assert_eq!(v.battery_percent, 100);
    }

    #[test]
    fn negative_gap_charges_nothing() {
        let mut v = test_scooter("SC-1");
        v.battery_percent = 55;
        let end = ts(2024, 5, 1, 10, 0);
        charge_until_next(&mut v, end, Some(end - Duration::minutes(5)));
        assert_eq!(v.battery_percent, 55);
    }
}
