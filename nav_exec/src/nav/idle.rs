//! # [`NavCtrl`](super::NavCtrl) idle state
//!
//! Waits for a destination. Entering and leaving idle are announced on the broker, which is how
//! the robot mode machine knows whether the robot is stationary.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use comms_if::eqpt::drive::RobotAction;

use crate::{
    audio::AudioCue,
    events::{event_id, EventArgs},
    fsm::{State, Transition},
};

use super::{NavCtx, NavState};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub(super) struct Idle;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl State<NavState, NavCtx> for Idle {
    fn id(&self) -> NavState {
        NavState::Idle
    }

    fn enter(&mut self, ctx: &mut NavCtx) -> Transition<NavState> {
        ctx.set_status("Idle");
        ctx.drive(RobotAction::Stop);

        // No path is kept while idle, a new destination always replans
        ctx.waypoints_m.clear();
        ctx.waypoint_index = 0;
        ctx.target_m = None;
        ctx.broker
            .dispatch_or_warn(event_id::IDLE_NAV_ENTER, &EventArgs::None);

        Transition::None
    }

    fn update(&mut self, ctx: &mut NavCtx, _dt_s: f64) -> Transition<NavState> {
        if ctx.take_destination_moved() {
            return Transition::To(NavState::Pathfinding);
        }

        Transition::None
    }

    fn exit(&mut self, ctx: &mut NavCtx, next: NavState) {
        ctx.broker
            .dispatch_or_warn(event_id::IDLE_NAV_EXIT, &EventArgs::None);

        if next == NavState::Abort {
            return;
        }

        match AudioCue::going_to(&ctx.instruction) {
            Some(cue) => ctx.play(cue),
            None => debug!("No cue for instruction {:?}", ctx.instruction),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nav::test_util::test_ctx;
    use comms_if::eqpt::drive::DriveCmd;
    use nalgebra::Vector3;

    #[test]
    fn test_enter_clears_path() {
        let (mut ctx, _) = test_ctx();
        ctx.waypoints_m = vec![Vector3::zeros(), Vector3::new(2.0, 0.0, 2.0)];
        ctx.waypoint_index = 1;
        ctx.target_m = Some(Vector3::new(2.0, 0.0, 2.0));
        ctx.link.set_action(RobotAction::Forward);

        assert_eq!(Idle.enter(&mut ctx), Transition::None);

        assert!(ctx.waypoints_m.is_empty());
        assert_eq!(ctx.waypoint_index, 0);
        assert_eq!(ctx.target_m, None);
        assert_eq!(ctx.link.command(), DriveCmd::STOP);
    }
}
