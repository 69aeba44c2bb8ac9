//! Shared vehicle fleet keyed by vehicle id.
//!
//! Each vehicle sits behind its own async mutex so that route tasks for
//! different vehicles never contend, while back-to-back bookings of the
//! same vehicle serialize naturally.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::vehicle::Vehicle;

#[derive(Debug, Default)]
pub struct VehicleFleet {
    vehicles: HashMap<String, Arc<Mutex<Vehicle>>>,
}

impl VehicleFleet {
    pub fn new(vehicles: Vec<Vehicle>) -> Self {
        let vehicles = vehicles
            .into_iter()
            .map(|v| (v.id.clone(), Arc::new(Mutex::new(v))))
            .collect();
        Self { vehicles }
    }

    pub fn get(&self, vehicle_id: &str) -> Option<Arc<Mutex<Vehicle>>> {
        self.vehicles.get(vehicle_id).cloned()
    }

    pub fn contains(&self, vehicle_id: &str) -> bool {
        self.vehicles.contains_key(vehicle_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.vehicles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Clones the current state of every vehicle, keyed by id.
    pub async fn snapshot(&self) -> HashMap<String, Vehicle> {
        let mut out = HashMap::with_capacity(self.vehicles.len());
        for (id, slot) in &self.vehicles {
            let vehicle = slot.lock().await;
            out.insert(id.clone(), vehicle.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::test_scooter;

    #[tokio::test]
    async fn snapshot_reflects_mutations() {
        let fleet = VehicleFleet::new(vec![test_scooter("SC-1"), test_scooter("SC-2")]);
        {
            let slot = fleet.get("SC-1").expect("vehicle");
            slot.lock().await.battery_percent = 42;
        }
        let snap = fleet.snapshot().await;
        assert_eq!(snap["SC-1"].battery_percent, 42);
        assert_eq!(snap["SC-2"].battery_percent, 100);
    }

    #[test]
    fn lookup_by_id() {
        let fleet = VehicleFleet::new(vec![test_scooter("SC-1")]);
        assert!(fleet.contains("SC-1"));
        assert!(fleet.get("SC-9").is_none());
        assert_eq!(fleet.len(), 1);
    }
}
