//! Parameters structure for the motor link

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the motor command link.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotorLinkParams {
    /// Minimum time between transmissions of an unchanged command.
    ///
    /// Units: seconds
    pub repeat_interval_s: f64,

    /// Maximum number of transmissions of one command value, including the first.
    pub max_sends: u32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for MotorLinkParams {
    fn default() -> Self {
        Self {
            repeat_interval_s: 0.1,
            max_sends: 3,
        }
    }
}
