//! # Robot control module
//!
//! [`RobotCtrl`] sits above navigation and tracks what the robot as a whole is doing:
//!
//! - `Init` - Waiting for the labelled locations to be loaded.
//! - `Stationary` - Navigation is idle. The microphone is enabled whenever no audio is playing, so
//!   that spoken instructions can be captured.
//! - `Moving` - Navigation is active.
//! - `Abort` - Navigation has been aborted.
//!
//! Mode changes are driven by navigation's idle enter/exit events. Event handlers only post
//! requests onto a channel, the requests are applied at the start of the next update so no
//! transition happens from inside a dispatch.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod abort;
mod init;
mod moving;
mod stationary;
mod subscriptions;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver, Sender},
    Arc, Mutex,
};

use comms_if::eqpt::drive::RobotAction;

use crate::{
    audio::{play_cue, AudioCue},
    events::{event_id, BrokerError, EventArgs, EventBroker, HandlerId},
    fsm::{FsmError, StateMachine},
    loc::Pose,
    locations::LocationRegistry,
    nav::{NavCtrl, NavError},
};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Modes of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RobotMode {
    Init,
    Stationary,
    Moving,
    Abort,
}

/// Requests posted by event handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum RobotRequest {
    SetMode(RobotMode),
    Instruction(String),
    LocationsLoaded,
}

#[derive(Debug, thiserror::Error)]
pub enum RobotCtrlError {
    #[error("Robot state machine error: {0}")]
    Fsm(#[from] FsmError),

    #[error("Navigation error: {0}")]
    Nav(#[from] NavError),

    #[error("Event broker error: {0}")]
    Broker(#[from] BrokerError),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Posts requests to the robot controller from any thread.
#[derive(Clone)]
pub struct RequestPoster(Arc<Mutex<Sender<RobotRequest>>>);

/// Robot controller.
pub struct RobotCtrl {
    fsm: StateMachine<RobotMode, RobotCtx>,

    ctx: RobotCtx,

    requests: Receiver<RobotRequest>,

    handler_ids: Vec<(&'static str, HandlerId)>,
}

/// Data shared by all robot states.
pub struct RobotCtx {
    pub nav: NavCtrl,

    pub broker: Arc<EventBroker>,

    pub poster: RequestPoster,

    pub locations: LocationRegistry,

    pub locations_loaded: bool,

    /// Mirrors the audio output's playing state
    pub audio_playing: Arc<AtomicBool>,

    /// Manual drive input, overriding navigation while set
    pub manual: Option<RobotAction>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RequestPoster {
    pub fn post(&self, request: RobotRequest) {
        match self.0.lock() {
            Ok(tx) => {
                if tx.send(request).is_err() {
                    warn!("Robot controller has gone, request dropped");
                }
            }
            Err(_) => error!("Request channel lock poisoned, request dropped"),
        }
    }
}

impl RobotCtrl {
    /// Create the controller around a navigation controller, ending up in `Init`.
    pub fn new(nav: NavCtrl, locations: LocationRegistry) -> Result<Self, RobotCtrlError> {
        let broker = nav.broker().clone();
        let (tx, requests) = mpsc::channel();
        let poster = RequestPoster(Arc::new(Mutex::new(tx)));

        let mut handler_ids = Vec::new();

        // Navigation idle drives the stationary/moving modes
        for (event, mode) in [
            (event_id::IDLE_NAV_ENTER, RobotMode::Stationary),
            (event_id::IDLE_NAV_EXIT, RobotMode::Moving),
        ]
        .iter()
        {
            let p = poster.clone();
            let mode = *mode;
            let id = broker.subscribe_fn(event, move |_| p.post(RobotRequest::SetMode(mode)))?;
            handler_ids.push((*event, id));
        }

        let p = poster.clone();
        let id = broker.subscribe_fn(event_id::INSTRUCTION_READY, move |args| {
            if let EventArgs::Instruction(s) = args {
                p.post(RobotRequest::Instruction(s.clone()))
            }
        })?;
        handler_ids.push((event_id::INSTRUCTION_READY, id));

        let audio_playing = Arc::new(AtomicBool::new(false));
        for (event, value) in [
            (event_id::AUDIO_STARTED, true),
            (event_id::AUDIO_FINISHED, false),
        ]
        .iter()
        {
            let flag = audio_playing.clone();
            let value = *value;
            let id = broker.subscribe_fn(event, move |_| flag.store(value, Ordering::Relaxed))?;
            handler_ids.push((*event, id));
        }

        let mut fsm = StateMachine::new("RobotCtrl");
        fsm.add_state(Box::new(init::Init::default()))?;
        fsm.add_state(Box::new(stationary::Stationary::default()))?;
        fsm.add_state(Box::new(moving::Moving))?;
        fsm.add_state(Box::new(abort::Abort))?;

        let mut ctx = RobotCtx {
            nav,
            broker,
            poster,
            locations,
            locations_loaded: false,
            audio_playing,
            manual: None,
        };

        fsm.set_state(RobotMode::Init, &mut ctx)?;

        Ok(Self {
            fsm,
            ctx,
            requests,
            handler_ids,
        })
    }

    /// Announce that the labelled locations are available.
    pub fn announce_locations_loaded(&self) {
        info!("{} location(s) loaded", self.ctx.locations.len());
        self.ctx
            .broker
            .dispatch_or_warn(event_id::SPATIAL_ANCHORS_LOADED, &EventArgs::None);
    }

    /// Step the robot and navigation.
    pub fn update(&mut self, dt_s: f64, pose: Option<Pose>) -> Result<(), RobotCtrlError> {
        self.apply_requests()?;

        self.fsm.update(&mut self.ctx, dt_s)?;
        self.ctx.nav.update(dt_s, pose)?;

        if let Some(action) = self.ctx.manual {
            self.ctx.nav.link_mut().set_action(action);
        }

        // Requests raised by this cycle's navigation, so the mode doesn't lag by a cycle
        self.apply_requests()
    }

    /// Drive the robot directly. Navigation keeps running but its commands are overridden.
    pub fn manual_drive(&mut self, action: RobotAction) {
        if action == RobotAction::Stop {
            self.manual_release();
            return;
        }

        if self.ctx.manual != Some(action) {
            info!("Manual drive {:?}", action);
        }
        self.ctx.manual = Some(action);
        self.ctx.nav.link_mut().set_action(action);
    }

    /// Release the manual input, stopping the robot once.
    pub fn manual_release(&mut self) {
        if self.ctx.manual.take().is_some() {
            info!("Manual drive released");
            self.ctx.nav.link_mut().set_action(RobotAction::Stop);
        }
    }

    /// Stop navigating and send Stop to the motors immediately.
    pub fn emergency_stop(&mut self, now_s: f64) -> Result<(), RobotCtrlError> {
        warn!("Emergency stop");
        self.ctx.manual = None;
        self.ctx.nav.stop_navigation()?;

        if let Err(e) = self.ctx.nav.link_mut().emergency_stop(now_s) {
            error!("Emergency stop not sent: {}", e);
        }

        Ok(())
    }

    /// Abort navigation.
    pub fn abort(&mut self) -> Result<(), RobotCtrlError> {
        self.fsm.set_state(RobotMode::Abort, &mut self.ctx)?;
        Ok(())
    }

    /// Select the next location.
    pub fn cycle_location(&mut self) {
        match self.ctx.locations.cycle_next() {
            Some(l) => info!("Selected {} at {:?}", l.label, l.position_m.as_slice()),
            None => info!("No location selected"),
        }
    }

    /// Send the robot to the selected location.
    pub fn go_to_selected(&mut self) {
        let location = match self.ctx.locations.selected() {
            Some(l) => l.clone(),
            None => {
                warn!("No location selected");
                return;
            }
        };

        self.ctx.nav.set_instruction(&location.label);
        self.ctx.nav.place_destination(location.position_m);
    }

    pub fn mode(&self) -> Option<RobotMode> {
        self.fsm.current()
    }

    pub fn nav(&self) -> &NavCtrl {
        &self.ctx.nav
    }

    pub fn nav_mut(&mut self) -> &mut NavCtrl {
        &mut self.ctx.nav
    }

    pub fn broker(&self) -> &Arc<EventBroker> {
        &self.ctx.broker
    }

    pub fn locations(&self) -> &LocationRegistry {
        &self.ctx.locations
    }

    pub fn is_manual(&self) -> bool {
        self.ctx.manual.is_some()
    }

    /// A handle through which requests can be posted.
    pub fn poster(&self) -> RequestPoster {
        self.ctx.poster.clone()
    }

    /// Unsubscribe from the broker and dispose of all states.
    pub fn shutdown(&mut self) {
        for (event, id) in self.handler_ids.drain(..) {
            if let Err(e) = self.ctx.broker.unsubscribe(event, id) {
                debug!("Could not unsubscribe from {}: {}", event, e);
            }
        }

        self.fsm.clear_states();
        self.ctx.nav.shutdown();
    }

    fn apply_requests(&mut self) -> Result<(), RobotCtrlError> {
        while let Ok(request) = self.requests.try_recv() {
            match request {
                RobotRequest::LocationsLoaded => self.ctx.locations_loaded = true,
                RobotRequest::SetMode(mode) => self.request_mode(mode)?,
                RobotRequest::Instruction(s) => self.ctx.handle_instruction(&s),
            }
        }

        Ok(())
    }

    fn request_mode(&mut self, mode: RobotMode) -> Result<(), RobotCtrlError> {
        match self.fsm.current() {
            Some(RobotMode::Init) => {
                debug!("{:?} requested before initialisation, ignored", mode);
                Ok(())
            }
            // Only a return to idle leaves abort
            Some(RobotMode::Abort) if mode != RobotMode::Stationary => {
                debug!("{:?} requested while aborted, ignored", mode);
                Ok(())
            }
            _ => {
                self.fsm.set_state(mode, &mut self.ctx)?;
                Ok(())
            }
        }
    }
}

impl RobotCtx {
    /// Act on a recognised instruction.
    pub fn handle_instruction(&mut self, instruction: &str) {
        let label = instruction.trim();

        if label.is_empty() {
            info!("Instruction not understood");
            self.nav.set_instruction("");
            play_cue(&self.broker, AudioCue::IDontUnderstand);
            return;
        }

        self.nav.set_instruction(label);

        let from = self.nav.ctx().position_m();
        match self.locations.nearest(label, &from) {
            Some(l) => {
                info!("Instruction {:?}, going to {:?}", label, l.position_m.as_slice());
                let position = l.position_m;
                self.nav.place_destination(position);
            }
            None => warn!("No location labelled {:?}", label),
        }
    }
}
