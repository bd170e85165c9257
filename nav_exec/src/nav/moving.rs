//! # [`NavCtrl`](super::NavCtrl) moving state

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use comms_if::eqpt::drive::RobotAction;

use crate::{
    audio::AudioCue,
    fsm::{State, Transition},
};

use super::{DebugInfo, NavCtx, NavState};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub(super) struct Moving;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl State<NavState, NavCtx> for Moving {
    fn id(&self) -> NavState {
        NavState::Moving
    }

    fn enter(&mut self, ctx: &mut NavCtx) -> Transition<NavState> {
        ctx.set_status("Moving");
        ctx.play(AudioCue::Moving);
        ctx.set_turning(false);
        ctx.drive(RobotAction::Forward);

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
        if error_deg.abs() > ctx.params.off_course_deg {
            debug!("Off course by {:.1}°", error_deg);
            return Transition::To(NavState::Paused);
        }

        Transition::None
    }

    fn exit(&mut self, ctx: &mut NavCtx, next: NavState) {
        ctx.drive(RobotAction::Stop);

        if next == NavState::Abort {
            ctx.debug_info = Some(DebugInfo {
                state: NavState::Moving,
                bearing_error_deg: ctx.bearing_error_deg(),
                start_yaw_deg: None,
                current_yaw_deg: Some(ctx.yaw_deg()),
                rotated_deg: None,
                elapsed_s: None,
                distance_m: Some(ctx.distance_to_target_m()),
            });
        }
    }
}
