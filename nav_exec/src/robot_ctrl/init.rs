//! # [`RobotCtrl`](super::RobotCtrl) init mode

use log::{error, info};

use crate::{
    events::event_id,
    fsm::{State, Transition},
};

use super::{subscriptions::Subscriptions, RobotCtx, RobotMode, RobotRequest};

#[derive(Default)]
pub(super) struct Init {
    subs: Subscriptions,
}

impl State<RobotMode, RobotCtx> for Init {
    fn id(&self) -> RobotMode {
        RobotMode::Init
    }

    fn enter(&mut self, ctx: &mut RobotCtx) -> Transition<RobotMode> {
        let poster = ctx.poster.clone();
        if let Err(e) = self.subs.add(&ctx.broker, event_id::SPATIAL_ANCHORS_LOADED, move |_| {
            poster.post(RobotRequest::LocationsLoaded)
        }) {
            error!("Cannot wait for locations: {}", e);
        }

        Transition::None
    }

    fn update(&mut self, ctx: &mut RobotCtx, _dt_s: f64) -> Transition<RobotMode> {
        if ctx.locations_loaded {
            info!("Robot ready");
            return Transition::To(RobotMode::Stationary);
        }

        Transition::None
    }

    fn exit(&mut self, _ctx: &mut RobotCtx, _next: RobotMode) {
        self.subs.release();
    }

    fn dispose(&mut self) {
        self.subs.release();
    }
}
