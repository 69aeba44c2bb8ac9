//! Tunable parameters for one simulation run.

use std::time::Duration;

use crate::movement::Pacing;

/// Cooldown between time groups.
pub const DEFAULT_THROTTLE: Duration = Duration::from_secs(5);

/// Upper bound on one time group's barrier wait.
pub const DEFAULT_GROUP_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    /// Scales both step pauses and the throttle delay.
    pub pacing: Pacing,
    pub throttle: Duration,
    pub group_timeout: Duration,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            pacing: Pacing::default(),
            throttle: DEFAULT_THROTTLE,
            group_timeout: DEFAULT_GROUP_TIMEOUT,
        }
    }
}

impl SimulationParams {
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_group_timeout(mut self, group_timeout: Duration) -> Self {
        self.group_timeout = group_timeout;
        self
    }
}
