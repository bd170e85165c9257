//! # [`NavCtrl`](super::NavCtrl) abort state
//!
//! Terminal, the controller only leaves abort when reset from outside.

use log::warn;

use comms_if::eqpt::drive::RobotAction;

use crate::{
    audio::AudioCue,
    fsm::{State, Transition},
};

use super::{NavCtx, NavState};

pub(super) struct Abort;

impl State<NavState, NavCtx> for Abort {
    fn id(&self) -> NavState {
        NavState::Abort
    }

    fn enter(&mut self, ctx: &mut NavCtx) -> Transition<NavState> {
        ctx.set_status("Aborted");
        ctx.play(AudioCue::Abort);
        ctx.drive(RobotAction::Stop);

        match ctx.debug_info {
            Some(ref info) => warn!("Navigation aborted: {:?}", info),
            None => warn!("Navigation aborted"),
        }

        Transition::None
    }

    fn update(&mut self, _ctx: &mut NavCtx, _dt_s: f64) -> Transition<NavState> {
        Transition::None
    }
}
