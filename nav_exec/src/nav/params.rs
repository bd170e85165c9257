//! Parameters structure for NavCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for navigation control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NavCtrlParams {
    // ---- TOLERANCES ----

    /// Horizontal distance within which a waypoint counts as reached.
    ///
    /// Units: meters
    pub waypoint_radius_m: f64,

    /// Bearing error within which the robot is considered aligned with the waypoint.
    ///
    /// Units: degrees
    pub fine_accuracy_deg: f64,

    /// Bearing error above which the robot stops moving forward and realigns.
    ///
    /// Units: degrees
    pub off_course_deg: f64,

    // ---- TIMINGS ----

    /// Time allowed for the path planner to produce a path.
    ///
    /// Units: seconds
    pub pathfinding_wait_s: f64,

    /// Time spent stopped at each waypoint.
    ///
    /// Units: seconds
    pub waypoint_dwell_s: f64,

    // ---- SETTLING ----

    /// Interval between settle checks while paused.
    ///
    /// Units: seconds
    pub settle_interval_s: f64,

    /// Rotation per interval below which the robot is considered settled.
    ///
    /// Units: degrees
    pub settle_threshold_deg: f64,

    /// Additional time to wait once settled.
    ///
    /// Units: seconds
    pub settle_dwell_s: f64,

    // ---- TURNING ----

    /// Interval between stuck checks while turning.
    ///
    /// Units: seconds
    pub stuck_interval_s: f64,

    /// Rotation per interval below which a turning robot is considered stuck.
    ///
    /// Units: degrees
    pub stuck_threshold_deg: f64,

    /// Turn increments, by bearing error. The first entry whose `below_deg` exceeds the
    /// magnitude of the bearing error is used. Must be in ascending order of `below_deg`.
    pub turn_increments: Vec<TurnIncrement>,

    /// Turn increment used when the bearing error exceeds every entry of `turn_increments`.
    ///
    /// Units: degrees
    pub max_turn_increment_deg: f64,
}

/// One row of the turn increment table.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TurnIncrement {
    /// Units: degrees
    pub below_deg: f64,

    /// Units: degrees
    pub increment_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl NavCtrlParams {
    /// Angle to turn through before pausing, for the given bearing error.
    pub fn turn_increment_deg(&self, bearing_error_deg: f64) -> f64 {
        let error = bearing_error_deg.abs();

        self.turn_increments
            .iter()
            .find(|t| error < t.below_deg)
            .map(|t| t.increment_deg)
            .unwrap_or(self.max_turn_increment_deg)
    }
}

impl Default for NavCtrlParams {
    fn default() -> Self {
        Self {
            waypoint_radius_m: 0.10,
            fine_accuracy_deg: 8.0,
            off_course_deg: 20.0,
            pathfinding_wait_s: 0.5,
            waypoint_dwell_s: 0.5,
            settle_interval_s: 0.25,
            settle_threshold_deg: 1.0,
            settle_dwell_s: 0.25,
            stuck_interval_s: 2.0,
            stuck_threshold_deg: 1.0,
            turn_increments: vec![
                TurnIncrement {
                    below_deg: 15.0,
                    increment_deg: 5.0,
                },
                TurnIncrement {
                    below_deg: 25.0,
                    increment_deg: 10.0,
                },
                TurnIncrement {
                    below_deg: 35.0,
                    increment_deg: 15.0,
                },
            ],
            max_turn_increment_deg: 20.0,
        }
    }
}
