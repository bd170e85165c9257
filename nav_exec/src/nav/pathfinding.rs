//! # [`NavCtrl`](super::NavCtrl) pathfinding state
//!
//! The planner works asynchronously, so after making the request the robot waits a fixed time
//! before reading the path back.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};

use comms_if::eqpt::drive::RobotAction;

use crate::fsm::{State, Transition};

use super::{NavCtx, NavState};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Default)]
pub(super) struct Pathfinding {
    elapsed_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl State<NavState, NavCtx> for Pathfinding {
    fn id(&self) -> NavState {
        NavState::Pathfinding
    }

    fn enter(&mut self, ctx: &mut NavCtx) -> Transition<NavState> {
        self.elapsed_s = 0.0;
        ctx.set_status("Finding a path");
        ctx.drive(RobotAction::Stop);

        let destination = match ctx.destination_m {
            Some(d) => d,
            None => {
                warn!("Pathfinding without a destination");
                return Transition::To(NavState::Idle);
            }
        };

        ctx.waypoints_m.clear();
        ctx.waypoint_index = 0;

        let start = ctx.position_m();
        if !ctx.planner.request_path(&start, &destination) {
            warn!(
                "Path request to {:?} rejected by the planner",
                destination.as_slice()
            );
            return Transition::To(NavState::Idle);
        }

        info!("Path requested to {:?}", destination.as_slice());

        Transition::None
    }

    fn update(&mut self, ctx: &mut NavCtx, dt_s: f64) -> Transition<NavState> {
        self.elapsed_s += dt_s;

        if self.elapsed_s >= ctx.params.pathfinding_wait_s {
            ctx.assign_path();
            return Transition::To(NavState::Deciding);
        }

        Transition::None
    }
}
