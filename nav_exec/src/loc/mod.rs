//! # Localisation module
//!
//! The robot's pose is tracked by a sensor riding on it. This module defines the pose and the
//! trait through which the executable samples it once per cycle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod pose_client;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use util::maths::{bearing_error_deg, heading_to_forward, horizontal_distance};

pub use pose_client::{PoseClient, PoseClientError};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Something which can provide the robot's current pose.
pub trait PoseSource {
    /// The latest pose, or `None` if no pose is available yet.
    fn pose(&mut self) -> Option<Pose>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose of the robot in the room frame.
///
/// The room frame has y vertical. Yaw is measured clockwise from +z when viewed from above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// The position in the room frame
    pub position_m: Vector3<f64>,

    /// The heading of the robot
    pub yaw_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(position_m: Vector3<f64>, yaw_deg: f64) -> Self {
        Self {
            position_m,
            yaw_deg,
        }
    }

    /// Unit vector the robot is facing along.
    pub fn forward(&self) -> Vector3<f64> {
        heading_to_forward(self.yaw_deg)
    }

    /// Signed angle from the robot's heading to the target, positive to the right.
    pub fn bearing_error_deg(&self, target_m: &Vector3<f64>) -> f64 {
        bearing_error_deg(&self.position_m, self.yaw_deg, target_m)
    }

    /// Horizontal distance to the target.
    pub fn distance_m(&self, target_m: &Vector3<f64>) -> f64 {
        horizontal_distance(&self.position_m, target_m)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vector3::zeros(), 0.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pose_geometry() {
        let pose = Pose::new(Vector3::new(1.0, 0.3, 1.0), 90.0);

        assert!((pose.forward() - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-9);
        assert!(pose.bearing_error_deg(&Vector3::new(5.0, 0.0, 1.0)).abs() < 1e-9);
        assert!((pose.bearing_error_deg(&Vector3::new(1.0, 0.0, 5.0)) + 90.0).abs() < 1e-9);
        assert!((pose.distance_m(&Vector3::new(4.0, 2.0, 5.0)) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_pose_json() {
        let pose: Pose =
            serde_json::from_str(r#"{"position_m": [1.0, 0.0, 2.0], "yaw_deg": 45.0}"#).unwrap();
        assert_eq!(pose, Pose::new(Vector3::new(1.0, 0.0, 2.0), 45.0));
    }
}
