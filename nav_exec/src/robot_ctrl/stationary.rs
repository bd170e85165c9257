//! # [`RobotCtrl`](super::RobotCtrl) stationary mode
//!
//! While stationary the microphone listens for instructions, except while audio is playing so
//! the robot doesn't hear itself.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::error;
use std::sync::{atomic::Ordering, Arc};

use crate::{
    events::{event_id, EventArgs},
    fsm::{State, Transition},
};

use super::{subscriptions::Subscriptions, RobotCtx, RobotMode};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Default)]
pub(super) struct Stationary {
    subs: Subscriptions,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl State<RobotMode, RobotCtx> for Stationary {
    fn id(&self) -> RobotMode {
        RobotMode::Stationary
    }

    fn enter(&mut self, ctx: &mut RobotCtx) -> Transition<RobotMode> {
        for (event, forward) in [
            (event_id::AUDIO_STARTED, event_id::DISABLE_MIC_RECORDING),
            (event_id::AUDIO_FINISHED, event_id::ENABLE_MIC_RECORDING),
        ]
        .iter()
        {
            let broker = Arc::downgrade(&ctx.broker);
            let forward = *forward;
            let res = self.subs.add(&ctx.broker, event, move |_| {
                if let Some(b) = broker.upgrade() {
                    b.dispatch_or_warn(forward, &EventArgs::None);
                }
            });

            if let Err(e) = res {
                error!("Cannot gate the microphone on {}: {}", event, e);
            }
        }

        if !ctx.audio_playing.load(Ordering::Relaxed) {
            ctx.broker
                .dispatch_or_warn(event_id::ENABLE_MIC_RECORDING, &EventArgs::None);
        }

        Transition::None
    }

    fn update(&mut self, _ctx: &mut RobotCtx, _dt_s: f64) -> Transition<RobotMode> {
        Transition::None
    }

    fn exit(&mut self, ctx: &mut RobotCtx, _next: RobotMode) {
        self.subs.release();
        ctx.broker
            .dispatch_or_warn(event_id::DISABLE_MIC_RECORDING, &EventArgs::None);
    }

    fn dispose(&mut self) {
        self.subs.release();
    }
}
