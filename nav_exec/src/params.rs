//! # Navigation Executable Parameters
//!
//! This module provide parameters for the navigation executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavExecParams {
    /// Target period of one cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Directory, relative to the software root, in which sessions are created
    pub sessions_dir: String,

    /// Use the simulated robot rather than the motor controller and tracking sensor
    pub use_sim: bool,

    /// How long the stand-in audio output takes to "play" one cue.
    ///
    /// Units: seconds
    pub cue_duration_s: f64,

    /// Number of consecutive cycles without a pose after which a warning is raised
    pub pose_loss_warn_cycles: u64,

    /// Log levels for individual modules, keyed by module path (`"nav_lib::motor_link"`)
    pub module_log_levels: BTreeMap<String, String>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for NavExecParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.05,
            sessions_dir: String::from("sessions"),
            use_sim: false,
            cue_duration_s: 1.5,
            pose_loss_warn_cycles: 20,
            module_log_levels: BTreeMap::new(),
        }
    }
}

impl NavExecParams {
    /// Number of cycles per second
    pub fn cycle_frequency_hz(&self) -> f64 {
        1.0 / self.cycle_period_s
    }
}
