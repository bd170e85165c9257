//! # Navigation telemetry

use serde::{Deserialize, Serialize};

use super::NavState;

/// Navigation telemetry, also the text shown on the debug overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavTm {
    pub state: Option<NavState>,
    pub previous_state: Option<NavState>,

    /// Human readable description of what navigation is doing
    pub status: String,

    pub instruction: String,

    pub destination_m: Option<[f64; 3]>,

    pub waypoint_index: usize,
    pub num_waypoints: usize,

    pub bearing_error_deg: Option<f64>,
    pub distance_m: Option<f64>,

    pub is_turning: bool,

    pub debug_info: Option<DebugInfo>,
}

/// Snapshot of the control values at the end of a turn, or when moving was aborted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    /// State the snapshot was taken in
    pub state: NavState,

    pub bearing_error_deg: f64,

    pub start_yaw_deg: Option<f64>,
    pub current_yaw_deg: Option<f64>,
    pub rotated_deg: Option<f64>,
    pub elapsed_s: Option<f64>,

    pub distance_m: Option<f64>,
}
