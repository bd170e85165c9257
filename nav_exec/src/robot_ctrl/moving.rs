//! # [`RobotCtrl`](super::RobotCtrl) moving mode

use crate::fsm::{State, Transition};

use super::{RobotCtx, RobotMode};

pub(super) struct Moving;

impl State<RobotMode, RobotCtx> for Moving {
    fn id(&self) -> RobotMode {
        RobotMode::Moving
    }

    fn update(&mut self, _ctx: &mut RobotCtx, _dt_s: f64) -> Transition<RobotMode> {
        Transition::None
    }
}
