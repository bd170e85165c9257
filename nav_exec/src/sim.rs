//! # Simulated robot
//!
//! A kinematic model of the differential drive robot, used in place of the tracking sensor when
//! running without hardware and by the navigation tests.
//!
//! Each wheel is either stopped or driven at a fixed speed in one direction, so the robot can
//! only drive straight, spin on the spot or stop. Commands reach the wheels after a fixed
//! latency.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use nalgebra::Vector3;
use serde::Deserialize;
use std::collections::VecDeque;

use comms_if::eqpt::drive::{DriveCmd, WheelDir};
use util::maths::wrap_angle_deg;

use crate::loc::{Pose, PoseSource};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated robot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Speed when both wheels drive the same way.
    ///
    /// Units: meters/second
    pub linear_speed_ms: f64,

    /// Rate of rotation when the wheels drive in opposite directions.
    ///
    /// Units: degrees/second
    pub turn_rate_degs: f64,

    /// Delay between a command being recieved and the wheels responding.
    ///
    /// Units: seconds
    pub latency_s: f64,

    /// Starting position.
    ///
    /// Units: meters
    pub initial_position_m: [f64; 3],

    /// Starting heading.
    ///
    /// Units: degrees
    pub initial_yaw_deg: f64,
}

/// The simulated robot.
#[derive(Debug, Clone)]
pub struct SimRobot {
    params: SimParams,

    pose: Pose,

    time_s: f64,

    /// Commands waiting to reach the wheels, with the time they take effect
    pending: VecDeque<(f64, DriveCmd)>,

    /// Command currently driving the wheels
    applied: DriveCmd,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            linear_speed_ms: 0.3,
            turn_rate_degs: 30.0,
            latency_s: 0.0,
            initial_position_m: [0.0; 3],
            initial_yaw_deg: 0.0,
        }
    }
}

impl SimRobot {
    pub fn new(params: SimParams) -> Self {
        let p = params.initial_position_m;
        let pose = Pose::new(Vector3::new(p[0], p[1], p[2]), params.initial_yaw_deg);
        Self::with_pose(params, pose)
    }

    /// Create a robot starting at the given pose.
    pub fn with_pose(params: SimParams, pose: Pose) -> Self {
        Self {
            params,
            pose,
            time_s: 0.0,
            pending: VecDeque::new(),
            applied: DriveCmd::STOP,
        }
    }

    /// Advance the simulation with `cmd` as the command most recently recieved.
    pub fn step(&mut self, cmd: DriveCmd, dt_s: f64) {
        let last_queued = self.pending.back().map(|(_, c)| *c).unwrap_or(self.applied);
        if cmd != last_queued {
            self.pending
                .push_back((self.time_s + self.params.latency_s, cmd));
        }

        self.time_s += dt_s;

        while let Some((t, c)) = self.pending.front().copied() {
            if t > self.time_s {
                break;
            }
            trace!("Sim wheels now {}", c);
            self.applied = c;
            self.pending.pop_front();
        }

        let left = wheel_sign(self.applied.left());
        let right = wheel_sign(self.applied.right());

        let speed_ms = 0.5 * (left + right) * self.params.linear_speed_ms;
        let rate_degs = 0.5 * (left - right) * self.params.turn_rate_degs;

        self.pose.position_m += self.pose.forward() * speed_ms * dt_s;
        self.pose.yaw_deg = wrap_angle_deg(self.pose.yaw_deg + rate_degs * dt_s);
    }

    /// The robot's true pose.
    pub fn true_pose(&self) -> Pose {
        self.pose
    }

    /// Command currently driving the wheels.
    pub fn applied(&self) -> DriveCmd {
        self.applied
    }

    /// Teleport the robot.
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }
}

impl PoseSource for SimRobot {
    fn pose(&mut self) -> Option<Pose> {
        Some(self.pose)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn wheel_sign(dir: WheelDir) -> f64 {
    match dir {
        WheelDir::Forward => 1.0,
        WheelDir::Reverse => -1.0,
        WheelDir::Stop => 0.0,
    }
}
