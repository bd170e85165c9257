//! # Event Broker
//!
//! A named-event dispatcher used to decouple the navigation loop, the robot mode machine and the
//! audio/microphone collaborators. One broker is constructed by the executable and shared with
//! every component that needs it as an `Arc<EventBroker>`.
//!
//! Every event must be registered before it is dispatched or subscribed to. Handlers are called
//! synchronously in subscription order, with the slot's lock held for the whole dispatch. A
//! handler may dispatch a *different* event, but subscribing to or unsubscribing from the event
//! currently being dispatched from inside one of its handlers will deadlock.
//!
//! The broker is only used from the control thread, it is never touched by background threads.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace, warn};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use crate::audio::AudioCue;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Identifiers of all events used by the navigation software.
pub mod event_id {
    /// A spoken instruction has been recognised, payload [`super::EventArgs::Instruction`]
    pub const INSTRUCTION_READY: &str = "instruction_ready";

    /// Navigation has entered idle
    pub const IDLE_NAV_ENTER: &str = "idle_nav_enter";

    /// Navigation has left idle
    pub const IDLE_NAV_EXIT: &str = "idle_nav_exit";

    /// Request an audio cue, payload [`super::EventArgs::PlayAudio`]
    pub const PLAY_AUDIO: &str = "play_audio";

    /// Audio output went from silent to playing
    pub const AUDIO_STARTED: &str = "audio_started";

    /// Audio output went from playing to silent
    pub const AUDIO_FINISHED: &str = "audio_finished";

    /// The labelled locations have been loaded
    pub const SPATIAL_ANCHORS_LOADED: &str = "spatial_anchors_loaded";

    /// Microphone capture may start
    pub const ENABLE_MIC_RECORDING: &str = "enable_mic_recording";

    /// Microphone capture must stop
    pub const DISABLE_MIC_RECORDING: &str = "disable_mic_recording";

    /// All of the above
    pub const ALL: [&str; 9] = [
        INSTRUCTION_READY,
        IDLE_NAV_ENTER,
        IDLE_NAV_EXIT,
        PLAY_AUDIO,
        AUDIO_STARTED,
        AUDIO_FINISHED,
        SPATIAL_ANCHORS_LOADED,
        ENABLE_MIC_RECORDING,
        DISABLE_MIC_RECORDING,
    ];
}

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// Identifies one subscription so it can be removed later.
pub type HandlerId = u64;

/// An event handler.
pub type Handler = Arc<dyn Fn(&EventArgs) + Send + Sync>;

type Slot = Arc<Mutex<Vec<(HandlerId, Handler)>>>;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Payload carried by an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventArgs {
    None,

    /// A recognised instruction, empty if the instruction wasn't understood
    Instruction(String),

    /// An audio cue to play
    PlayAudio { cue: AudioCue, can_interrupt: bool },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("Event {0} has already been registered")]
    AlreadyRegistered(String),

    #[error("Event {0} has not been registered")]
    UnknownEvent(String),

    #[error("Event {0} has no handler with ID {1}")]
    UnknownHandler(String, HandlerId),

    #[error("A lock in the event broker has been poisoned")]
    LockPoisoned,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The event broker.
#[derive(Default)]
pub struct EventBroker {
    slots: Mutex<HashMap<String, Slot>>,

    next_handler_id: AtomicU64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl EventBroker {
    /// Create a new broker with no events registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new broker with every event in [`event_id::ALL`] registered.
    pub fn with_default_events() -> Result<Self, BrokerError> {
        let broker = Self::new();
        for id in event_id::ALL.iter() {
            broker.register(id)?;
        }
        Ok(broker)
    }

    /// Create an empty handler slot for the event.
    pub fn register(&self, event: &str) -> Result<(), BrokerError> {
        let mut slots = self.slots.lock().map_err(|_| BrokerError::LockPoisoned)?;

        if slots.contains_key(event) {
            return Err(BrokerError::AlreadyRegistered(event.into()));
        }

        slots.insert(event.into(), Arc::new(Mutex::new(Vec::new())));
        trace!("Event {} registered", event);

        Ok(())
    }

    /// Remove the event and all of its handlers.
    pub fn unregister(&self, event: &str) -> Result<(), BrokerError> {
        self.slots
            .lock()
            .map_err(|_| BrokerError::LockPoisoned)?
            .remove(event)
            .map(|_| ())
            .ok_or_else(|| BrokerError::UnknownEvent(event.into()))
    }

    /// Returns true if the event has been registered.
    pub fn is_registered(&self, event: &str) -> bool {
        self.slots
            .lock()
            .map(|s| s.contains_key(event))
            .unwrap_or(false)
    }

    /// Add a handler to the end of the event's handler list.
    pub fn subscribe(&self, event: &str, handler: Handler) -> Result<HandlerId, BrokerError> {
        let slot = self.slot(event)?;
        let id = self.next_handler_id.fetch_add(1, Ordering::Relaxed);

        slot.lock()
            .map_err(|_| BrokerError::LockPoisoned)?
            .push((id, handler));

        Ok(id)
    }

    /// Convenience wrapper around [`EventBroker::subscribe`] taking a closure.
    pub fn subscribe_fn<F>(&self, event: &str, f: F) -> Result<HandlerId, BrokerError>
    where
        F: Fn(&EventArgs) + Send + Sync + 'static,
    {
        self.subscribe(event, Arc::new(f))
    }

    /// Remove a handler from the event.
    pub fn unsubscribe(&self, event: &str, handler_id: HandlerId) -> Result<(), BrokerError> {
        let slot = self.slot(event)?;
        let mut handlers = slot.lock().map_err(|_| BrokerError::LockPoisoned)?;

        match handlers.iter().position(|(id, _)| *id == handler_id) {
            Some(i) => {
                handlers.remove(i);
                Ok(())
            }
            None => Err(BrokerError::UnknownHandler(event.into(), handler_id)),
        }
    }

    /// Call every handler of the event with the given payload.
    ///
    /// Returns the number of handlers called.
    pub fn dispatch(&self, event: &str, args: &EventArgs) -> Result<usize, BrokerError> {
        // The table lock is released before the handlers run so they can dispatch other events
        let slot = self.slot(event)?;
        let handlers = slot.lock().map_err(|_| BrokerError::LockPoisoned)?;

        trace!("Dispatching {} to {} handler(s)", event, handlers.len());

        for (_, handler) in handlers.iter() {
            handler(args);
        }

        Ok(handlers.len())
    }

    /// Dispatch an event, logging rather than returning any error.
    pub fn dispatch_or_warn(&self, event: &str, args: &EventArgs) {
        if let Err(e) = self.dispatch(event, args) {
            warn!("Could not dispatch {}: {}", event, e);
        }
    }

    /// Number of handlers subscribed to the event.
    pub fn num_handlers(&self, event: &str) -> Result<usize, BrokerError> {
        let slot = self.slot(event)?;
        let handlers = slot.lock().map_err(|_| BrokerError::LockPoisoned)?;
        Ok(handlers.len())
    }

    /// Remove every event and handler.
    pub fn clear_all(&self) {
        match self.slots.lock() {
            Ok(mut s) => {
                s.clear();
                debug!("All events cleared");
            }
            Err(_) => warn!("Could not clear events, lock poisoned"),
        }
    }

    fn slot(&self, event: &str) -> Result<Slot, BrokerError> {
        self.slots
            .lock()
            .map_err(|_| BrokerError::LockPoisoned)?
            .get(event)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownEvent(event.into()))
    }
}
