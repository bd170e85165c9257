//! # Audio module
//!
//! Audio playback and speech recognition live outside of this software. This module provides the
//! pieces of them the control software interacts with:
//!
//! - [`AudioCue`] - the cues the software can ask to be played, through the `play_audio` event.
//! - [`AudioMonitor`] - turns an "is playing" flag into `audio_started`/`audio_finished` events.
//! - [`CuePlayer`] - a stand-in audio sink which "plays" each cue for a fixed duration.
//! - [`MicGate`] - tracks whether microphone capture is currently allowed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use crate::events::{event_id, BrokerError, EventArgs, EventBroker, HandlerId};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Audio cues which can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCue {
    DestinationReached,
    GoingToFridge,
    GoingToSofa,
    GoingToTable,
    IDontUnderstand,
    Moving,
    Nudging,
    TargetReached,
    TargetSet,
    Turning,
    Waypoint,
    Abort,
    Pathfinding,
    Right,
    Left,
    Pause,
    Stuck,
}

/// An edge in the audio output's playing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEdge {
    Started,
    Finished,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Detects transitions of the audio output between silent and playing.
#[derive(Debug, Default)]
pub struct AudioMonitor {
    was_playing: bool,
}

/// Stand-in audio output.
///
/// Subscribes to `play_audio` and keeps track of which cue is playing. Cues which can't interrupt
/// are dropped if something is already playing.
pub struct CuePlayer {
    state: Arc<Mutex<PlayerState>>,

    handler_id: Option<HandlerId>,
}

#[derive(Debug)]
struct PlayerState {
    cue_duration_s: f64,
    playing: Option<AudioCue>,
    remaining_s: f64,
    num_played: u64,
}

/// Tracks the microphone capture enable flag.
pub struct MicGate {
    enabled: Arc<AtomicBool>,

    handler_ids: Vec<(&'static str, HandlerId)>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AudioCue {
    /// Whether this cue may cut off whatever is currently playing.
    ///
    /// The frequent motion cues are only played into silence.
    pub fn can_interrupt(&self) -> bool {
        !matches!(self, AudioCue::Turning | AudioCue::Moving)
    }

    /// The "going to" cue for a location label, if there is one.
    pub fn going_to(label: &str) -> Option<AudioCue> {
        match label.trim().to_lowercase().as_str() {
            "fridge" => Some(AudioCue::GoingToFridge),
            "sofa" => Some(AudioCue::GoingToSofa),
            "table" => Some(AudioCue::GoingToTable),
            _ => None,
        }
    }
}

/// Request that the given cue be played.
pub fn play_cue(broker: &EventBroker, cue: AudioCue) {
    debug!("Requesting cue {:?}", cue);
    broker.dispatch_or_warn(
        event_id::PLAY_AUDIO,
        &EventArgs::PlayAudio {
            cue,
            can_interrupt: cue.can_interrupt(),
        },
    );
}

impl AudioMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the playing flag against the last tick and dispatch the matching event on a
    /// change.
    pub fn tick(&mut self, is_playing: bool, broker: &EventBroker) -> Option<AudioEdge> {
        let edge = match (self.was_playing, is_playing) {
            (false, true) => Some(AudioEdge::Started),
            (true, false) => Some(AudioEdge::Finished),
            _ => None,
        };

        self.was_playing = is_playing;

        match edge {
            Some(AudioEdge::Started) => {
                debug!("Audio started");
                broker.dispatch_or_warn(event_id::AUDIO_STARTED, &EventArgs::None);
            }
            Some(AudioEdge::Finished) => {
                debug!("Audio finished");
                broker.dispatch_or_warn(event_id::AUDIO_FINISHED, &EventArgs::None);
            }
            None => (),
        }

        edge
    }
}

impl CuePlayer {
    /// Create a new player, subscribing it to `play_audio`.
    pub fn new(broker: &EventBroker, cue_duration_s: f64) -> Result<Self, BrokerError> {
        let state = Arc::new(Mutex::new(PlayerState {
            cue_duration_s,
            playing: None,
            remaining_s: 0.0,
            num_played: 0,
        }));

        let handler_state = state.clone();
        let handler_id = broker.subscribe_fn(event_id::PLAY_AUDIO, move |args| {
            if let EventArgs::PlayAudio { cue, can_interrupt } = args {
                match handler_state.lock() {
                    Ok(mut s) => s.play(*cue, *can_interrupt),
                    Err(_) => warn!("CuePlayer state poisoned, {:?} not played", cue),
                }
            }
        })?;

        Ok(Self {
            state,
            handler_id: Some(handler_id),
        })
    }

    /// Advance playback.
    pub fn tick(&mut self, dt_s: f64) {
        if let Ok(mut s) = self.state.lock() {
            if s.playing.is_some() {
                s.remaining_s -= dt_s;
                if s.remaining_s <= 0.0 {
                    trace!("Cue {:?} finished", s.playing);
                    s.playing = None;
                    s.remaining_s = 0.0;
                }
            }
        }
    }

    /// Returns true while a cue is playing.
    pub fn is_playing(&self) -> bool {
        self.current_cue().is_some()
    }

    /// The cue currently playing.
    pub fn current_cue(&self) -> Option<AudioCue> {
        self.state.lock().ok().and_then(|s| s.playing)
    }

    /// Number of cues played since creation.
    pub fn num_played(&self) -> u64 {
        self.state.lock().map(|s| s.num_played).unwrap_or(0)
    }

    /// Unsubscribe the player from the broker.
    pub fn detach(&mut self, broker: &EventBroker) {
        if let Some(id) = self.handler_id.take() {
            if let Err(e) = broker.unsubscribe(event_id::PLAY_AUDIO, id) {
                warn!("Could not detach CuePlayer: {}", e);
            }
        }
    }
}

impl PlayerState {
    fn play(&mut self, cue: AudioCue, can_interrupt: bool) {
        if self.playing.is_some() && !can_interrupt {
            debug!("{:?} dropped, {:?} is playing", cue, self.playing);
            return;
        }

        info!("Playing cue {:?}", cue);
        self.playing = Some(cue);
        self.remaining_s = self.cue_duration_s;
        self.num_played += 1;
    }
}

impl MicGate {
    /// Create a new gate, initially disabled, subscribed to the enable and disable events.
    pub fn new(broker: &EventBroker) -> Result<Self, BrokerError> {
        let enabled = Arc::new(AtomicBool::new(false));
        let mut handler_ids = Vec::with_capacity(2);

        for (event, value) in [
            (event_id::ENABLE_MIC_RECORDING, true),
            (event_id::DISABLE_MIC_RECORDING, false),
        ]
        .iter()
        {
            let flag = enabled.clone();
            let value = *value;
            let id = broker.subscribe_fn(event, move |_| {
                if flag.swap(value, Ordering::Relaxed) != value {
                    info!(
                        "Microphone recording {}",
                        if value { "enabled" } else { "disabled" }
                    );
                }
            })?;
            handler_ids.push((*event, id));
        }

        Ok(Self {
            enabled,
            handler_ids,
        })
    }

    /// Returns true if microphone capture is allowed.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Unsubscribe the gate from the broker.
    pub fn detach(&mut self, broker: &EventBroker) {
        for (event, id) in self.handler_ids.drain(..) {
            if let Err(e) = broker.unsubscribe(event, id) {
                warn!("Could not detach MicGate: {}", e);
            }
        }
    }
}
