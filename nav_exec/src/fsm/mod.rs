//! # Finite State Machine module
//!
//! A generic state machine holding a table of states keyed by a small identifier type. States
//! never change the machine directly. Instead they return a [`Transition`] from `enter` or
//! `update` and the machine performs it, calling `exit` on the old state before `enter` on the
//! new one.
//!
//! The owner of the machine passes its own context (`C`) into every call, so states get a typed
//! handle on whatever they control without holding a reference back to the machine.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, error, trace};
use std::{collections::HashMap, fmt::Debug, hash::Hash};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum number of times a state's `enter` may redirect to another state in one transition.
pub const MAX_REDIRECTS: usize = 4;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A single state of a [`StateMachine`].
pub trait State<I, C> {
    /// Identifier of this state.
    fn id(&self) -> I;

    /// Called when the machine enters this state. Per-activation fields must be reset here.
    ///
    /// Returning [`Transition::To`] immediately redirects the machine to another state.
    fn enter(&mut self, _ctx: &mut C) -> Transition<I> {
        Transition::None
    }

    /// Called once per tick while this state is current.
    fn update(&mut self, ctx: &mut C, dt_s: f64) -> Transition<I>;

    /// Called when the machine leaves this state, `next` is the state being entered.
    fn exit(&mut self, _ctx: &mut C, _next: I) {}

    /// Called when the machine is torn down.
    fn dispose(&mut self) {}
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A transition requested by a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition<I> {
    /// Stay in the current state
    None,

    /// Move to the given state
    To(I),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FsmError {
    #[error("{0}: a state with ID {1} has already been added")]
    DuplicateState(&'static str, String),

    #[error("{0}: no state with ID {1} has been added")]
    UnknownState(&'static str, String),

    #[error("{0}: entering {1} redirected more than {} times", MAX_REDIRECTS)]
    RedirectLimit(&'static str, String),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A generic state machine.
pub struct StateMachine<I, C> {
    name: &'static str,

    states: HashMap<I, Box<dyn State<I, C>>>,

    current: Option<I>,

    previous: Option<I>,

    next: Option<I>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<I, C> StateMachine<I, C>
where
    I: Copy + Eq + Hash + Debug,
{
    /// Create a new, empty, machine. The name is only used for logging.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            states: HashMap::new(),
            current: None,
            previous: None,
            next: None,
        }
    }

    /// Add a state to the machine.
    ///
    /// Adding two states with the same ID is a configuration error, the second state is rejected.
    pub fn add_state(&mut self, state: Box<dyn State<I, C>>) -> Result<(), FsmError> {
        let id = state.id();

        if self.states.contains_key(&id) {
            return Err(FsmError::DuplicateState(self.name, format!("{:?}", id)));
        }

        self.states.insert(id, state);
        Ok(())
    }

    /// Move the machine into the given state.
    ///
    /// If the machine is already in this state nothing happens. An unknown ID is rejected and the
    /// machine stays in the current state.
    pub fn set_state(&mut self, id: I, ctx: &mut C) -> Result<(), FsmError> {
        if self.current == Some(id) {
            trace!("{}: already in {:?}", self.name, id);
            return Ok(());
        }

        self.force_state(id, ctx)
    }

    /// Move the machine into the given state, even if it is the current one.
    ///
    /// When the current state is requested it is exited and entered again.
    pub fn force_state(&mut self, id: I, ctx: &mut C) -> Result<(), FsmError> {
        if !self.states.contains_key(&id) {
            let err = FsmError::UnknownState(self.name, format!("{:?}", id));
            error!("{}", err);
            return Err(err);
        }

        let mut target = id;

        for _ in 0..=MAX_REDIRECTS {
            match self.transition(target, ctx) {
                Transition::None => return Ok(()),
                Transition::To(redirect) => {
                    if redirect == target {
                        return Ok(());
                    }
                    if !self.states.contains_key(&redirect) {
                        let err = FsmError::UnknownState(self.name, format!("{:?}", redirect));
                        error!("{}", err);
                        return Err(err);
                    }
                    debug!("{}: {:?} redirected to {:?}", self.name, target, redirect);
                    target = redirect;
                }
            }
        }

        let err = FsmError::RedirectLimit(self.name, format!("{:?}", id));
        error!("{}", err);
        Err(err)
    }

    /// Step the current state.
    ///
    /// Does nothing if there is no current state.
    pub fn update(&mut self, ctx: &mut C, dt_s: f64) -> Result<(), FsmError> {
        let current = match self.current {
            Some(c) => c,
            None => return Ok(()),
        };

        let transition = match self.states.get_mut(&current) {
            Some(s) => s.update(ctx, dt_s),
            None => Transition::None,
        };

        match transition {
            Transition::None => Ok(()),
            Transition::To(id) => self.set_state(id, ctx),
        }
    }

    /// Dispose of every state and empty the table.
    pub fn clear_states(&mut self) {
        for (_, state) in self.states.iter_mut() {
            state.dispose();
        }
        self.states.clear();

        self.current = None;
        self.previous = None;
        self.next = None;

        debug!("{}: all states cleared", self.name);
    }

    /// ID of the current state.
    pub fn current(&self) -> Option<I> {
        self.current
    }

    /// ID of the previous state.
    pub fn previous(&self) -> Option<I> {
        self.previous
    }

    /// ID of the state being entered, only set while a transition is in progress.
    pub fn next(&self) -> Option<I> {
        self.next
    }

    /// Returns true if the machine is in the given state.
    pub fn is_in(&self, id: I) -> bool {
        self.current == Some(id)
    }

    /// Number of states in the machine.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Exit the current state and enter the target, returning the target's redirect request.
    fn transition(&mut self, target: I, ctx: &mut C) -> Transition<I> {
        self.next = Some(target);

        if let Some(current) = self.current {
            if let Some(state) = self.states.get_mut(&current) {
                state.exit(ctx, target);
            }
        }

        debug!("{}: {:?} -> {:?}", self.name, self.current, target);

        self.previous = self.current;
        self.current = Some(target);
        self.next = None;

        match self.states.get_mut(&target) {
            Some(state) => state.enter(ctx),
            None => Transition::None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Id {
        A,
        B,
        C,
        Loop1,
        Loop2,
    }

    /// Records every call made on the states
    #[derive(Default)]
    struct Log {
        calls: Vec<String>,
        goto: Option<Id>,
    }

    struct TestState {
        id: Id,
        redirect: Option<Id>,
    }

    impl State<Id, Log> for TestState {
        fn id(&self) -> Id {
            self.id
        }

        fn enter(&mut self, ctx: &mut Log) -> Transition<Id> {
            ctx.calls.push(format!("enter {:?}", self.id));
            match self.redirect {
                Some(r) => Transition::To(r),
                None => Transition::None,
            }
        }

        fn update(&mut self, ctx: &mut Log, _dt_s: f64) -> Transition<Id> {
            ctx.calls.push(format!("update {:?}", self.id));
            match ctx.goto.take() {
                Some(id) => Transition::To(id),
                None => Transition::None,
            }
        }

        fn exit(&mut self, ctx: &mut Log, next: Id) {
            ctx.calls.push(format!("exit {:?} -> {:?}", self.id, next));
        }
    }

    fn machine() -> StateMachine<Id, Log> {
        let mut fsm = StateMachine::new("test");
        fsm.add_state(Box::new(TestState {
            id: Id::A,
            redirect: None,
        }))
        .unwrap();
        fsm.add_state(Box::new(TestState {
            id: Id::B,
            redirect: None,
        }))
        .unwrap();
        fsm.add_state(Box::new(TestState {
            id: Id::C,
            redirect: Some(Id::A),
        }))
        .unwrap();
        fsm.add_state(Box::new(TestState {
            id: Id::Loop1,
            redirect: Some(Id::Loop2),
        }))
        .unwrap();
        fsm.add_state(Box::new(TestState {
            id: Id::Loop2,
            redirect: Some(Id::Loop1),
        }))
        .unwrap();
        fsm
    }

    #[test]
    fn test_duplicate_state() {
        let mut fsm = machine();
        let r = fsm.add_state(Box::new(TestState {
            id: Id::A,
            redirect: None,
        }));
        assert!(matches!(r, Err(FsmError::DuplicateState(_, _))));
        assert_eq!(fsm.num_states(), 5);
    }

    #[test]
    fn test_transition_order() {
        let mut fsm = machine();
        let mut log = Log::default();

        fsm.set_state(Id::A, &mut log).unwrap();
        fsm.set_state(Id::B, &mut log).unwrap();

        assert_eq!(log.calls, vec!["enter A", "exit A -> B", "enter B"]);
        assert_eq!(fsm.current(), Some(Id::B));
        assert_eq!(fsm.previous(), Some(Id::A));
        assert_eq!(fsm.next(), None);
    }

    #[test]
    fn test_set_current_state_is_noop() {
        let mut fsm = machine();
        let mut log = Log::default();

        for id in [Id::A, Id::B].iter() {
            fsm.set_state(*id, &mut log).unwrap();
            log.calls.clear();

            fsm.set_state(*id, &mut log).unwrap();
            assert!(log.calls.is_empty());
        }

        // Forcing re-enters
        fsm.force_state(Id::B, &mut log).unwrap();
        assert_eq!(log.calls, vec!["exit B -> B", "enter B"]);
    }

    #[test]
    fn test_unknown_state() {
        let mut fsm: StateMachine<Id, Log> = StateMachine::new("small");
        let mut log = Log::default();
        fsm.add_state(Box::new(TestState {
            id: Id::A,
            redirect: None,
        }))
        .unwrap();
        fsm.set_state(Id::A, &mut log).unwrap();

        assert!(matches!(
            fsm.set_state(Id::B, &mut log),
            Err(FsmError::UnknownState(_, _))
        ));
        assert_eq!(fsm.current(), Some(Id::A));
        assert_eq!(log.calls, vec!["enter A"]);
    }

    #[test]
    fn test_enter_redirect() {
        let mut fsm = machine();
        let mut log = Log::default();

        fsm.set_state(Id::B, &mut log).unwrap();
        fsm.set_state(Id::C, &mut log).unwrap();

        assert_eq!(
            log.calls,
            vec!["enter B", "exit B -> C", "enter C", "exit C -> A", "enter A"]
        );
        assert_eq!(fsm.current(), Some(Id::A));
        assert_eq!(fsm.previous(), Some(Id::C));
    }

    #[test]
    fn test_redirect_limit() {
        let mut fsm = machine();
        let mut log = Log::default();

        assert!(matches!(
            fsm.set_state(Id::Loop1, &mut log),
            Err(FsmError::RedirectLimit(_, _))
        ));
    }

    #[test]
    fn test_update() {
        let mut fsm = machine();
        let mut log = Log::default();

        // No current state, nothing happens
        fsm.update(&mut log, 0.1).unwrap();
        assert!(log.calls.is_empty());

        fsm.set_state(Id::A, &mut log).unwrap();
        log.goto = Some(Id::B);
        fsm.update(&mut log, 0.1).unwrap();
        assert_eq!(
            log.calls,
            vec!["enter A", "update A", "exit A -> B", "enter B"]
        );

        fsm.clear_states();
        assert_eq!(fsm.current(), None);
        assert_eq!(fsm.num_states(), 0);
    }
}
