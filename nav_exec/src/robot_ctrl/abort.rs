//! # [`RobotCtrl`](super::RobotCtrl) abort mode

use log::error;

use crate::fsm::{State, Transition};

use super::{RobotCtx, RobotMode};

pub(super) struct Abort;

impl State<RobotMode, RobotCtx> for Abort {
    fn id(&self) -> RobotMode {
        RobotMode::Abort
    }

    fn enter(&mut self, ctx: &mut RobotCtx) -> Transition<RobotMode> {
        if let Err(e) = ctx.nav.abort() {
            error!("Could not abort navigation: {}", e);
        }

        Transition::None
    }

    fn update(&mut self, _ctx: &mut RobotCtx, _dt_s: f64) -> Transition<RobotMode> {
        Transition::None
    }
}
