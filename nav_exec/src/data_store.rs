//! # Data Store

use comms_if::eqpt::drive::MotorTelemetry;
use log::warn;

use crate::loc::Pose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Debug, Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Session elapsed time, sampled at the start of the cycle
    pub sim_time_s: f64,

    // Localisation
    pub pose: Option<Pose>,

    // Motor controller
    pub motor_tm: Option<MotorTelemetry>,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of consecutive cycles without a pose
    pub num_consec_pose_losses: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a cycle.
    ///
    /// Sets the 1Hz cycle flag and samples the session time.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        let cycles_per_s = (cycle_frequency_hz as u128).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_s == 0;

        self.sim_time_s = util::session::get_elapsed_seconds();
    }

    /// Record this cycle's pose, counting consecutive losses.
    ///
    /// Warns once when the number of losses reaches `warn_limit`.
    pub fn set_pose(&mut self, pose: Option<Pose>, warn_limit: u64) {
        match pose {
            Some(_) => self.num_consec_pose_losses = 0,
            None => {
                self.num_consec_pose_losses += 1;
                if self.num_consec_pose_losses == warn_limit {
                    warn!(
                        "No pose for {} consecutive cycles, navigation is holding",
                        warn_limit
                    );
                }
            }
        }

        self.pose = pose;
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        self.num_cycles += 1;
    }
}
