//! # [`NavCtrl`](super::NavCtrl) deciding state

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use crate::fsm::{State, Transition};

use super::{NavCtx, NavState};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub(super) struct Deciding;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl State<NavState, NavCtx> for Deciding {
    fn id(&self) -> NavState {
        NavState::Deciding
    }

    fn enter(&mut self, ctx: &mut NavCtx) -> Transition<NavState> {
        ctx.set_status("Deciding");
        Transition::None
    }

    fn update(&mut self, ctx: &mut NavCtx, _dt_s: f64) -> Transition<NavState> {
        if ctx.take_destination_moved() {
            return Transition::To(NavState::Pathfinding);
        }

        if ctx.waypoint_reached() {
            return Transition::To(NavState::Waypoint);
        }

        let error_deg = ctx.bearing_error_deg();
        debug!(
            "Bearing error {:.1}°, distance {:.2} m",
            error_deg,
            ctx.distance_to_target_m()
        );

        if error_deg.abs() <= ctx.params.fine_accuracy_deg {
            Transition::To(NavState::Moving)
        } else {
            Transition::To(NavState::Turning)
        }
    }
}
