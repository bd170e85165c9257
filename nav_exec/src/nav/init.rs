//! # [`NavCtrl`](super::NavCtrl) init state

use crate::fsm::{State, Transition};

use super::{NavCtx, NavState};

pub(super) struct Init;

impl State<NavState, NavCtx> for Init {
    fn id(&self) -> NavState {
        NavState::Init
    }

    fn enter(&mut self, ctx: &mut NavCtx) -> Transition<NavState> {
        ctx.set_status("Starting");
        Transition::To(NavState::Idle)
    }

    fn update(&mut self, _ctx: &mut NavCtx, _dt_s: f64) -> Transition<NavState> {
        Transition::To(NavState::Idle)
    }
}
