//! # Navigation control module
//!
//! This module implements [`NavCtrl`], the state machine which drives the robot towards the
//! destination. It is broken down into the following states:
//!
//! - `Init` - Startup, moves straight to `Idle`.
//! - `Idle` - No destination, waiting for one to be placed.
//! - `Pathfinding` - The robot is stopped while the path planner finds a path to the destination.
//! - `Deciding` - Chooses between turning and moving towards the current waypoint.
//! - `Turning` - Turns on the spot through a limited increment towards the waypoint.
//! - `Moving` - Drives forward while the waypoint is roughly ahead.
//! - `Paused` - Stopped, waiting for the robot to settle after a manoeuvre.
//! - `Waypoint` - A waypoint has been reached, dwells then moves on to the next one.
//! - `Abort` - Stopped until navigation is reset.
//!
//! Placing a new destination from any active state restarts pathfinding.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod abort;
mod deciding;
mod idle;
mod init;
mod moving;
pub mod params;
mod pathfinding;
mod paused;
pub mod tm;
mod turning;
mod waypoint;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use comms_if::eqpt::drive::RobotAction;
use util::maths::horizontal;

use crate::{
    audio::{play_cue, AudioCue},
    events::EventBroker,
    fsm::{FsmError, StateMachine},
    loc::Pose,
    motor_link::MotorLink,
    path_planner::{PathPlanner, PathStatus},
};

pub use params::NavCtrlParams;
pub use tm::{DebugInfo, NavTm};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Identifiers of the navigation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavState {
    Init,
    Idle,
    Pathfinding,
    Deciding,
    Turning,
    Moving,
    Paused,
    Waypoint,
    Abort,
}

#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error("Navigation state machine error: {0}")]
    Fsm(#[from] FsmError),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Navigation controller.
pub struct NavCtrl {
    fsm: StateMachine<NavState, NavCtx>,

    ctx: NavCtx,
}

/// Data shared by all navigation states.
pub struct NavCtx {
    pub params: NavCtrlParams,

    /// Pose for the current cycle
    pub pose: Option<Pose>,

    /// Most recent valid pose, held through pose losses
    pub last_pose: Option<Pose>,

    pub link: MotorLink,

    pub planner: Box<dyn PathPlanner>,

    pub broker: Arc<EventBroker>,

    pub destination_m: Option<Vector3<f64>>,

    /// The point currently being driven towards, either a waypoint or the destination.
    pub target_m: Option<Vector3<f64>>,

    /// Set when a destination is placed, cleared when a state acts on it.
    pub destination_moved: bool,

    pub waypoints_m: Vec<Vector3<f64>>,

    pub waypoint_index: usize,

    /// True between entering `Turning` and entering `Moving`
    pub is_turning: bool,

    /// Label of the location being travelled to
    pub instruction: String,

    pub debug_info: Option<DebugInfo>,

    pub status: String,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl NavCtrl {
    /// Create the controller, ending up in `Idle`.
    pub fn new(
        params: NavCtrlParams,
        link: MotorLink,
        planner: Box<dyn PathPlanner>,
        broker: Arc<EventBroker>,
    ) -> Result<Self, NavError> {
        let mut fsm = StateMachine::new("NavCtrl");

        fsm.add_state(Box::new(init::Init))?;
        fsm.add_state(Box::new(idle::Idle))?;
        fsm.add_state(Box::new(pathfinding::Pathfinding::default()))?;
        fsm.add_state(Box::new(deciding::Deciding))?;
        fsm.add_state(Box::new(turning::Turning::default()))?;
        fsm.add_state(Box::new(moving::Moving))?;
        fsm.add_state(Box::new(paused::Paused::default()))?;
        fsm.add_state(Box::new(waypoint::Waypoint::default()))?;
        fsm.add_state(Box::new(abort::Abort))?;

        let mut ctx = NavCtx {
            params,
            pose: None,
            last_pose: None,
            link,
            planner,
            broker,
            destination_m: None,
            target_m: None,
            destination_moved: false,
            waypoints_m: Vec::new(),
            waypoint_index: 0,
            is_turning: false,
            instruction: String::new(),
            debug_info: None,
            status: String::new(),
        };

        fsm.set_state(NavState::Init, &mut ctx)?;

        Ok(Self { fsm, ctx })
    }

    /// Step the controller with the pose for this cycle.
    ///
    /// Without a pose the robot is stopped, and an in-progress turn or move is paused.
    pub fn update(&mut self, dt_s: f64, pose: Option<Pose>) -> Result<(), NavError> {
        self.ctx.pose = pose;
        if pose.is_some() {
            self.ctx.last_pose = pose;
        }

        if pose.is_none() {
            if self.is_in(NavState::Turning) || self.is_in(NavState::Moving) {
                warn!("Pose lost, pausing navigation");
                self.fsm.set_state(NavState::Paused, &mut self.ctx)?;
            }
            self.ctx.drive(RobotAction::Stop);
            return Ok(());
        }

        self.fsm.update(&mut self.ctx, dt_s)?;

        Ok(())
    }

    /// Place the destination, starting or restarting pathfinding.
    pub fn place_destination(&mut self, destination_m: Vector3<f64>) {
        info!("Destination placed at {:?}", destination_m.as_slice());
        self.ctx.destination_m = Some(destination_m);
        self.ctx.target_m = Some(destination_m);
        self.ctx.destination_moved = true;
    }

    pub fn set_state(&mut self, state: NavState) -> Result<(), NavError> {
        self.fsm.set_state(state, &mut self.ctx)?;
        Ok(())
    }

    /// Stop navigating and return to `Idle`.
    pub fn stop_navigation(&mut self) -> Result<(), NavError> {
        info!("Navigation stopped");
        self.ctx.destination_moved = false;
        self.set_state(NavState::Idle)
    }

    /// Force navigation into `Abort`.
    pub fn abort(&mut self) -> Result<(), NavError> {
        self.set_state(NavState::Abort)
    }

    /// Leave `Abort`, returning to `Idle`.
    pub fn reset(&mut self) -> Result<(), NavError> {
        if !self.is_in(NavState::Abort) {
            debug!("Navigation reset while in {:?}", self.state());
        }
        self.ctx.debug_info = None;
        self.stop_navigation()
    }

    pub fn state(&self) -> Option<NavState> {
        self.fsm.current()
    }

    pub fn previous_state(&self) -> Option<NavState> {
        self.fsm.previous()
    }

    pub fn is_in(&self, state: NavState) -> bool {
        self.fsm.is_in(state)
    }

    pub fn set_instruction(&mut self, instruction: &str) {
        self.ctx.instruction = instruction.into();
    }

    pub fn instruction(&self) -> &str {
        &self.ctx.instruction
    }

    pub fn ctx(&self) -> &NavCtx {
        &self.ctx
    }

    pub fn link(&self) -> &MotorLink {
        &self.ctx.link
    }

    pub fn link_mut(&mut self) -> &mut MotorLink {
        &mut self.ctx.link
    }

    pub fn broker(&self) -> &Arc<EventBroker> {
        &self.ctx.broker
    }

    pub fn tm(&self) -> NavTm {
        let ctx = &self.ctx;
        let has_target = ctx.pose.is_some() && ctx.target_m.is_some();

        NavTm {
            state: self.state(),
            previous_state: self.previous_state(),
            status: ctx.status.clone(),
            instruction: ctx.instruction.clone(),
            destination_m: ctx.destination_m.map(|d| [d[0], d[1], d[2]]),
            waypoint_index: ctx.waypoint_index,
            num_waypoints: ctx.waypoints_m.len(),
            bearing_error_deg: if has_target {
                Some(ctx.bearing_error_deg())
            } else {
                None
            },
            distance_m: if has_target {
                Some(ctx.distance_to_target_m())
            } else {
                None
            },
            is_turning: ctx.is_turning,
            debug_info: ctx.debug_info.clone(),
        }
    }

    /// Dispose of all states. The controller can't be used afterwards.
    pub fn shutdown(&mut self) {
        self.ctx.drive(RobotAction::Stop);
        self.fsm.clear_states();
    }
}

impl NavCtx {
    /// Pose for this cycle, or the last one seen if it was lost.
    pub fn latest_pose(&self) -> Option<Pose> {
        self.pose.or(self.last_pose)
    }

    pub fn yaw_deg(&self) -> f64 {
        self.latest_pose().map(|p| p.yaw_deg).unwrap_or(0.0)
    }

    pub fn position_m(&self) -> Vector3<f64> {
        self.latest_pose()
            .map(|p| p.position_m)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Signed bearing error to the target, zero if there is no target.
    pub fn bearing_error_deg(&self) -> f64 {
        match (self.latest_pose(), self.target_m) {
            (Some(p), Some(t)) => p.bearing_error_deg(&t),
            _ => 0.0,
        }
    }

    /// Horizontal distance to the target, `f64::MAX` if there is no target.
    pub fn distance_to_target_m(&self) -> f64 {
        match (self.latest_pose(), self.target_m) {
            (Some(p), Some(t)) => p.distance_m(&t),
            _ => f64::MAX,
        }
    }

    pub fn waypoint_reached(&self) -> bool {
        self.distance_to_target_m() <= self.params.waypoint_radius_m
    }

    /// Returns true, clearing the flag, if a destination has been placed since last checked.
    pub fn take_destination_moved(&mut self) -> bool {
        std::mem::replace(&mut self.destination_moved, false)
    }

    pub fn drive(&mut self, action: RobotAction) {
        self.link.set_action(action)
    }

    pub fn play(&self, cue: AudioCue) {
        play_cue(&self.broker, cue)
    }

    /// Set the turning flag, announcing the start of a turn.
    pub fn set_turning(&mut self, turning: bool) {
        if turning && !self.is_turning {
            self.play(AudioCue::Turning);
        }
        self.is_turning = turning;
    }

    pub fn set_status(&mut self, status: &str) {
        if self.status != status {
            debug!("Nav status: {}", status);
            self.status = status.into();
        }
    }

    /// Replace the waypoints with the planner's latest path.
    ///
    /// With no usable path the robot heads straight for the destination.
    pub fn assign_path(&mut self) {
        let path = self.planner.path();

        match path.status {
            PathStatus::Complete | PathStatus::Partial if !path.corners_m.is_empty() => {
                if path.status == PathStatus::Partial {
                    warn!("Only a partial path to the destination was found");
                }
                // The first corner is the robot's own position
                self.waypoint_index = if path.corners_m.len() > 1 { 1 } else { 0 };
                self.waypoints_m = path.corners_m;
            }
            _ => {
                warn!("No path found, heading straight for the destination");
                let destination = self.destination_m.unwrap_or_else(|| self.position_m());
                self.waypoints_m = vec![horizontal(&self.position_m()), destination];
                self.waypoint_index = 1;
            }
        }

        info!(
            "{} waypoint(s) assigned, heading for #{}",
            self.waypoints_m.len(),
            self.waypoint_index
        );

        self.update_target();
    }

    /// Move on to the next waypoint.
    ///
    /// Returns false if there are no more waypoints. The target stays on the last one.
    pub fn advance_waypoint(&mut self) -> bool {
        self.waypoint_index += 1;
        self.update_target();
        self.waypoint_index < self.waypoints_m.len()
    }

    fn update_target(&mut self) {
        if let Some(w) = self.waypoints_m.get(self.waypoint_index) {
            self.target_m = Some(*w);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::{
        events::{event_id, EventArgs},
        motor_link::MotorLinkParams,
        path_planner::DirectPlanner,
    };
    use std::sync::Mutex;

    /// A context with an offline link, recording every cue requested.
    pub fn test_ctx() -> (NavCtx, Arc<Mutex<Vec<AudioCue>>>) {
        let broker = Arc::new(EventBroker::with_default_events().unwrap());
        let cues = Arc::new(Mutex::new(Vec::new()));
        let c = cues.clone();
        broker
            .subscribe_fn(event_id::PLAY_AUDIO, move |a| {
                if let EventArgs::PlayAudio { cue, .. } = a {
                    c.lock().unwrap().push(*cue);
                }
            })
            .unwrap();

        let ctx = NavCtx {
            params: NavCtrlParams::default(),
            pose: None,
            last_pose: None,
            link: MotorLink::offline(MotorLinkParams::default()),
            planner: Box::new(DirectPlanner::new()),
            broker,
            destination_m: None,
            target_m: None,
            destination_moved: false,
            waypoints_m: Vec::new(),
            waypoint_index: 0,
            is_turning: false,
            instruction: String::new(),
            debug_info: None,
            status: String::new(),
        };

        (ctx, cues)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        events::{event_id, EventArgs},
        motor_link::MotorLinkParams,
        path_planner::{DirectPlanner, PlannedPath},
    };
    use comms_if::eqpt::drive::DriveCmd;
    use std::sync::Mutex;

    /// Planner returning a fixed result.
    struct Fixed(PlannedPath, bool);

    impl PathPlanner for Fixed {
        fn request_path(&mut self, _: &Vector3<f64>, _: &Vector3<f64>) -> bool {
            self.1
        }

        fn path(&self) -> PlannedPath {
            self.0.clone()
        }
    }

    fn nav_with(planner: Box<dyn PathPlanner>) -> (NavCtrl, Arc<Mutex<Vec<AudioCue>>>) {
        let broker = Arc::new(EventBroker::with_default_events().unwrap());
        let cues = Arc::new(Mutex::new(Vec::new()));
        let c = cues.clone();
        broker
            .subscribe_fn(event_id::PLAY_AUDIO, move |a| {
                if let EventArgs::PlayAudio { cue, .. } = a {
                    c.lock().unwrap().push(*cue);
                }
            })
            .unwrap();

        let nav = NavCtrl::new(
            NavCtrlParams::default(),
            MotorLink::offline(MotorLinkParams::default()),
            planner,
            broker,
        )
        .unwrap();

        (nav, cues)
    }

    fn at(x: f64, z: f64, yaw_deg: f64) -> Option<Pose> {
        Some(Pose::new(Vector3::new(x, 0.0, z), yaw_deg))
    }

    /// Step the controller with a fixed pose until it leaves its current state.
    fn step_until_change(nav: &mut NavCtrl, pose: Option<Pose>) -> NavState {
        let start = nav.state();
        for _ in 0..200 {
            nav.update(0.05, pose).unwrap();
            if nav.state() != start {
                break;
            }
        }
        nav.state().unwrap()
    }

    #[test]
    fn test_starts_idle() {
        let (nav, _) = nav_with(Box::new(DirectPlanner::new()));
        assert_eq!(nav.state(), Some(NavState::Idle));
        assert_eq!(nav.previous_state(), Some(NavState::Init));
        assert_eq!(nav.link().command(), DriveCmd::STOP);
    }

    #[test]
    fn test_plan_then_move() {
        let (mut nav, cues) = nav_with(Box::new(DirectPlanner::new()));
        let pose = at(0.0, 0.0, 0.0);

        nav.update(0.05, pose).unwrap();
        assert_eq!(nav.state(), Some(NavState::Idle));

        nav.place_destination(Vector3::new(0.0, 0.0, 5.0));
        nav.update(0.05, pose).unwrap();
        assert_eq!(nav.state(), Some(NavState::Pathfinding));

        assert_eq!(step_until_change(&mut nav, pose), NavState::Deciding);
        assert_eq!(nav.ctx().waypoint_index, 1);
        assert_eq!(nav.ctx().waypoints_m.len(), 2);

        nav.update(0.05, pose).unwrap();
        assert_eq!(nav.state(), Some(NavState::Moving));
        assert_eq!(
            nav.link().command(),
            DriveCmd::from(RobotAction::Forward)
        );
        assert!(cues.lock().unwrap().contains(&AudioCue::Moving));
    }

    #[test]
    fn test_rejected_request_returns_to_idle() {
        let (mut nav, _) = nav_with(Box::new(Fixed(PlannedPath::none(), false)));
        nav.place_destination(Vector3::new(1.0, 0.0, 1.0));
        nav.update(0.05, at(0.0, 0.0, 0.0)).unwrap();

        assert_eq!(nav.state(), Some(NavState::Idle));
        assert_eq!(nav.previous_state(), Some(NavState::Pathfinding));
        assert_eq!(nav.link().command(), DriveCmd::STOP);
    }

    #[test]
    fn test_no_path_fallback() {
        let (mut nav, _) = nav_with(Box::new(Fixed(PlannedPath::none(), true)));
        let pose = Some(Pose::new(Vector3::new(1.0, 0.4, 2.0), 0.0));
        let dest = Vector3::new(3.0, 0.0, 6.0);

        nav.place_destination(dest);
        nav.update(0.05, pose).unwrap();
        assert_eq!(step_until_change(&mut nav, pose), NavState::Deciding);

        assert_eq!(
            nav.ctx().waypoints_m,
            vec![Vector3::new(1.0, 0.0, 2.0), dest]
        );
        assert_eq!(nav.ctx().waypoint_index, 1);
        assert_eq!(nav.ctx().target_m, Some(dest));
    }

    #[test]
    fn test_single_corner_path() {
        let corner = Vector3::new(2.0, 0.0, 0.0);
        let path = PlannedPath {
            status: PathStatus::Partial,
            corners_m: vec![corner],
        };
        let (mut nav, _) = nav_with(Box::new(Fixed(path, true)));
        let pose = at(0.0, 0.0, 0.0);

        nav.place_destination(Vector3::new(4.0, 0.0, 0.0));
        nav.update(0.05, pose).unwrap();
        step_until_change(&mut nav, pose);

        assert_eq!(nav.ctx().waypoint_index, 0);
        assert_eq!(nav.ctx().target_m, Some(corner));
    }

    #[test]
    fn test_abort_and_reset() {
        let (mut nav, cues) = nav_with(Box::new(DirectPlanner::new()));
        let pose = at(0.0, 0.0, 0.0);

        nav.place_destination(Vector3::new(0.0, 0.0, 5.0));
        nav.update(0.05, pose).unwrap();
        step_until_change(&mut nav, pose);
        nav.update(0.05, pose).unwrap();
        assert_eq!(nav.state(), Some(NavState::Moving));

        nav.abort().unwrap();
        assert_eq!(nav.state(), Some(NavState::Abort));
        assert_eq!(nav.link().command(), DriveCmd::STOP);
        assert!(cues.lock().unwrap().contains(&AudioCue::Abort));

        // Moving into abort leaves a snapshot of the control values
        let info = nav.tm().debug_info.unwrap();
        assert_eq!(info.state, NavState::Moving);
        assert!((info.distance_m.unwrap() - 5.0).abs() < 1e-9);

        // Abort is terminal, even a new destination is ignored
        nav.place_destination(Vector3::new(1.0, 0.0, 1.0));
        for _ in 0..20 {
            nav.update(0.05, pose).unwrap();
        }
        assert_eq!(nav.state(), Some(NavState::Abort));

        nav.reset().unwrap();
        assert_eq!(nav.state(), Some(NavState::Idle));
        assert!(nav.tm().debug_info.is_none());
    }

    #[test]
    fn test_pose_loss_pauses() {
        let (mut nav, _) = nav_with(Box::new(DirectPlanner::new()));
        let pose = at(0.0, 0.0, 0.0);

        nav.place_destination(Vector3::new(0.0, 0.0, 5.0));
        nav.update(0.05, pose).unwrap();
        step_until_change(&mut nav, pose);
        nav.update(0.05, pose).unwrap();
        assert_eq!(nav.state(), Some(NavState::Moving));

        nav.update(0.05, None).unwrap();
        assert_eq!(nav.state(), Some(NavState::Paused));
        assert_eq!(nav.link().command(), DriveCmd::STOP);
    }

    #[test]
    fn test_pose_loss_keeps_heading() {
        let (mut nav, _) = nav_with(Box::new(DirectPlanner::new()));
        let pose = at(0.0, 0.0, 30.0);

        // Target straight ahead of a robot facing 30°
        nav.place_destination(Vector3::new(2.5, 0.0, 4.33));
        nav.update(0.05, pose).unwrap();
        step_until_change(&mut nav, pose);
        nav.update(0.05, pose).unwrap();
        assert_eq!(nav.state(), Some(NavState::Moving));

        nav.update(0.05, None).unwrap();
        assert_eq!(nav.state(), Some(NavState::Paused));
        assert_eq!(nav.ctx().yaw_deg(), 30.0);
        assert_eq!(nav.ctx().position_m(), Vector3::zeros());

        // Back at the same heading the robot counts as settled from the first check, so only
        // the 0.25 s check interval and 0.25 s dwell pass before deciding
        let mut ticks = 0;
        while nav.is_in(NavState::Paused) {
            nav.update(0.05, pose).unwrap();
            ticks += 1;
            assert!(ticks <= 11);
        }
        assert!(ticks >= 10);
        assert_eq!(nav.state(), Some(NavState::Deciding));
    }

    #[test]
    fn test_stop_clears_path() {
        let (mut nav, _) = nav_with(Box::new(DirectPlanner::new()));
        let pose = at(0.0, 0.0, 0.0);

        nav.place_destination(Vector3::new(2.0, 0.0, 2.0));
        for _ in 0..40 {
            nav.update(0.05, pose).unwrap();
        }
        assert_eq!(nav.state(), Some(NavState::Turning));
        assert_eq!(nav.ctx().waypoints_m.len(), 2);

        nav.stop_navigation().unwrap();
        assert_eq!(nav.state(), Some(NavState::Idle));
        assert!(nav.ctx().waypoints_m.is_empty());
        assert_eq!(nav.ctx().waypoint_index, 0);
        assert_eq!(nav.ctx().target_m, None);

        let tm = nav.tm();
        assert_eq!(tm.num_waypoints, 0);
        assert_eq!(tm.bearing_error_deg, None);
        assert_eq!(tm.distance_m, None);
    }

    #[test]
    fn test_new_destination_replans() {
        let (mut nav, _) = nav_with(Box::new(DirectPlanner::new()));
        let pose = at(0.0, 0.0, 0.0);

        nav.place_destination(Vector3::new(0.0, 0.0, 5.0));
        nav.update(0.05, pose).unwrap();
        step_until_change(&mut nav, pose);
        nav.update(0.05, pose).unwrap();
        assert_eq!(nav.state(), Some(NavState::Moving));

        nav.place_destination(Vector3::new(5.0, 0.0, 0.0));
        nav.update(0.05, pose).unwrap();
        assert_eq!(nav.state(), Some(NavState::Pathfinding));
        assert_eq!(nav.link().command(), DriveCmd::STOP);
    }
}
