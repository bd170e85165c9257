//! # [`NavCtrl`](super::NavCtrl) waypoint state

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;

use comms_if::eqpt::drive::RobotAction;

use crate::{
    audio::AudioCue,
    fsm::{State, Transition},
};

use super::{NavCtx, NavState};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Default)]
pub(super) struct Waypoint {
    elapsed_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl State<NavState, NavCtx> for Waypoint {
    fn id(&self) -> NavState {
        NavState::Waypoint
    }

    fn enter(&mut self, ctx: &mut NavCtx) -> Transition<NavState> {
        self.elapsed_s = 0.0;
        ctx.set_status("Waypoint reached");
        ctx.drive(RobotAction::Stop);

        Transition::None
    }

    fn update(&mut self, ctx: &mut NavCtx, dt_s: f64) -> Transition<NavState> {
        if ctx.take_destination_moved() {
            return Transition::To(NavState::Pathfinding);
        }

        self.elapsed_s += dt_s;

        if self.elapsed_s < ctx.params.waypoint_dwell_s {
            return Transition::None;
        }

        ctx.drive(RobotAction::Stop);

        if ctx.advance_waypoint() {
            info!(
                "Heading for waypoint {} of {}",
                ctx.waypoint_index + 1,
                ctx.waypoints_m.len()
            );
            ctx.play(AudioCue::Waypoint);
            Transition::To(NavState::Deciding)
        } else {
            info!("Destination reached");
            ctx.play(AudioCue::DestinationReached);
            Transition::To(NavState::Idle)
        }
    }
}
