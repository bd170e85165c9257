//! # [`NavCtrl`](super::NavCtrl) paused state
//!
//! Stops the robot and waits for it to settle. The heading is sampled at a fixed interval, the
//! robot is settled once the rotation between two samples falls below a threshold. A further
//! dwell must then pass before deciding again, any rotation above the threshold in the meantime
//! restarts the wait.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;

use comms_if::eqpt::drive::RobotAction;
use util::maths::delta_angle_deg;

use crate::fsm::{State, Transition};

use super::{NavCtx, NavState};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Default)]
pub(super) struct Paused {
    elapsed_s: f64,

    last_check_s: f64,

    last_check_yaw_deg: f64,

    /// Time at which the robot was first seen to be settled
    settled_at_s: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl State<NavState, NavCtx> for Paused {
    fn id(&self) -> NavState {
        NavState::Paused
    }

    fn enter(&mut self, ctx: &mut NavCtx) -> Transition<NavState> {
        self.elapsed_s = 0.0;
        self.last_check_s = 0.0;
        self.last_check_yaw_deg = ctx.yaw_deg();
        self.settled_at_s = None;

        ctx.set_status("Paused");
        ctx.drive(RobotAction::Stop);

        Transition::None
    }

    fn update(&mut self, ctx: &mut NavCtx, dt_s: f64) -> Transition<NavState> {
        if ctx.take_destination_moved() {
            return Transition::To(NavState::Pathfinding);
        }

        if ctx.waypoint_reached() {
            return Transition::To(NavState::Waypoint);
        }

        self.elapsed_s += dt_s;

        if self.elapsed_s - self.last_check_s >= ctx.params.settle_interval_s {
            let yaw_deg = ctx.yaw_deg();
            let rotation_deg = delta_angle_deg(self.last_check_yaw_deg, yaw_deg).abs();

            if rotation_deg < ctx.params.settle_threshold_deg {
                if self.settled_at_s.is_none() {
                    trace!("Settled after {:.2} s", self.elapsed_s);
                    self.settled_at_s = Some(self.elapsed_s);
                }
            } else {
                self.settled_at_s = None;
            }

            self.last_check_s = self.elapsed_s;
            self.last_check_yaw_deg = yaw_deg;
        }

        match self.settled_at_s {
            Some(t) if self.elapsed_s - t >= ctx.params.settle_dwell_s => {
                Transition::To(NavState::Deciding)
            }
            _ => Transition::None,
        }
    }
}
