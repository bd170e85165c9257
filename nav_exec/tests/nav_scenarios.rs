//! Closed loop navigation scenarios
//!
//! Each scenario runs the navigation controller against the simulated robot, with the motor link
//! sending over a recording transport. The simulated robot only sees the commands which were
//! actually delivered.

use std::{
    io,
    sync::{Arc, Mutex},
};

use nalgebra::Vector3;

use comms_if::eqpt::drive::{DriveCmd, RobotAction};
use nav_lib::{
    audio::AudioCue,
    events::{event_id, EventArgs, EventBroker},
    loc::{Pose, PoseSource},
    motor_link::{MotorLink, MotorLinkParams, Transport},
    nav::{NavCtrl, NavCtrlParams, NavState},
    path_planner::{DirectPlanner, PathPlanner, PathStatus, PlannedPath},
    sim::{SimParams, SimRobot},
};

const DT_S: f64 = 0.05;

// ------------------------------------------------------------------------------------------------
// FIXTURES
// ------------------------------------------------------------------------------------------------

#[derive(Default)]
struct Wire {
    /// Every byte the link transmitted
    sent: Vec<u8>,

    /// Last byte to reach the robot
    delivered: Option<u8>,
}

/// Records transmissions, optionally losing the first datagram of every new command.
struct WireTransport {
    wire: Arc<Mutex<Wire>>,
    lose_first: bool,
}

impl Transport for WireTransport {
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        let mut wire = self.wire.lock().unwrap();
        let is_new = wire.sent.last() != data.last();

        wire.sent.extend_from_slice(data);

        if !(self.lose_first && is_new) {
            wire.delivered = data.last().copied();
        }

        Ok(())
    }

    fn take_latest(&mut self) -> Option<Vec<u8>> {
        None
    }

    fn rx_count(&self) -> u64 {
        0
    }

    fn close(&mut self) {}
}

/// Returns a fixed path regardless of the request.
struct ScriptedPlanner {
    path: PlannedPath,
}

impl PathPlanner for ScriptedPlanner {
    fn request_path(&mut self, _: &Vector3<f64>, _: &Vector3<f64>) -> bool {
        true
    }

    fn path(&self) -> PlannedPath {
        self.path.clone()
    }
}

struct Harness {
    nav: NavCtrl,
    robot: SimRobot,
    wire: Arc<Mutex<Wire>>,
    cues: Arc<Mutex<Vec<AudioCue>>>,
    now_s: f64,

    /// State and desired command after every tick
    history: Vec<(NavState, DriveCmd)>,
}

impl Harness {
    fn new(start: Pose) -> Self {
        Self::build(start, SimParams::default(), Box::new(DirectPlanner::new()), false)
    }

    fn build(
        start: Pose,
        sim_params: SimParams,
        planner: Box<dyn PathPlanner>,
        lose_first: bool,
    ) -> Self {
        let broker = Arc::new(EventBroker::with_default_events().unwrap());
        let cues = Arc::new(Mutex::new(Vec::new()));

        let c = cues.clone();
        broker
            .subscribe_fn(event_id::PLAY_AUDIO, move |args| {
                if let EventArgs::PlayAudio { cue, .. } = args {
                    c.lock().unwrap().push(*cue);
                }
            })
            .unwrap();

        let wire = Arc::new(Mutex::new(Wire::default()));
        let link = MotorLink::with_transport(
            MotorLinkParams::default(),
            Box::new(WireTransport {
                wire: wire.clone(),
                lose_first,
            }),
        );

        let nav = NavCtrl::new(NavCtrlParams::default(), link, planner, broker).unwrap();

        Self {
            nav,
            robot: SimRobot::with_pose(sim_params, start),
            wire,
            cues,
            now_s: 0.0,
            history: Vec::new(),
        }
    }

    fn tick(&mut self) {
        let pose = self.robot.pose();
        self.tick_with(pose);
    }

    fn tick_with(&mut self, pose: Option<Pose>) {
        self.nav.update(DT_S, pose).unwrap();
        self.nav.link_mut().process(self.now_s);

        let delivered = self
            .wire
            .lock()
            .unwrap()
            .delivered
            .map(DriveCmd::from_bits)
            .unwrap_or(DriveCmd::STOP);
        self.robot.step(delivered, DT_S);

        self.now_s += DT_S;
        self.history
            .push((self.nav.state().unwrap(), self.nav.link().command()));
    }

    /// Tick until the destination is reached, returning the number of ticks taken.
    fn run_to_arrival(&mut self, max_s: f64) -> Option<usize> {
        let max_ticks = (max_s / DT_S) as usize;

        for i in 1..=max_ticks {
            self.tick();
            if self.nav.is_in(NavState::Idle)
                && self.nav.previous_state() == Some(NavState::Waypoint)
            {
                return Some(i);
            }
        }

        None
    }

    fn distance_to(&self, x: f64, z: f64) -> f64 {
        self.robot
            .true_pose()
            .distance_m(&Vector3::new(x, 0.0, z))
    }

    fn sent(&self) -> Vec<u8> {
        self.wire.lock().unwrap().sent.clone()
    }

    fn cues(&self) -> Vec<AudioCue> {
        self.cues.lock().unwrap().clone()
    }

    /// Lengths in ticks of each consecutive run of `state`, with the state that followed it.
    fn episodes(&self, state: NavState) -> Vec<(usize, Option<NavState>)> {
        let mut episodes = Vec::new();
        let mut len = 0;

        for (s, _) in self.history.iter() {
            if *s == state {
                len += 1;
            } else if len > 0 {
                episodes.push((len, Some(*s)));
                len = 0;
            }
        }
        if len > 0 {
            episodes.push((len, None));
        }

        episodes
    }
}

fn origin() -> Pose {
    Pose::new(Vector3::zeros(), 0.0)
}

fn byte(action: RobotAction) -> u8 {
    DriveCmd::from(action).as_byte()
}

// ------------------------------------------------------------------------------------------------
// SCENARIOS
// ------------------------------------------------------------------------------------------------

#[test]
fn test_idle_stop_is_bounded() {
    let mut h = Harness::new(origin());

    for _ in 0..40 {
        h.tick();
    }

    // Stop is set every time idle is entered, but only ever sent up to the repeat bound
    assert!(h.nav.is_in(NavState::Idle));
    assert_eq!(h.sent(), vec![0, 0, 0]);
}

#[test]
fn test_straight_line() {
    let mut h = Harness::new(origin());
    h.nav.place_destination(Vector3::new(0.0, 0.0, 2.0));

    let ticks = h.run_to_arrival(30.0).expect("destination not reached");
    assert!(ticks > 100);

    // Never turns, drives forward for the whole time it's moving
    assert!(h.history.iter().all(|(s, _)| *s != NavState::Turning));
    let moving: Vec<_> = h
        .history
        .iter()
        .filter(|(s, _)| *s == NavState::Moving)
        .collect();
    assert!(moving.len() > 100);
    assert!(moving
        .iter()
        .all(|(_, c)| *c == DriveCmd::from(RobotAction::Forward)));

    // Forward is held for many seconds but only sent three times
    let sent = h.sent();
    assert_eq!(
        sent.iter().filter(|b| **b == byte(RobotAction::Forward)).count(),
        3
    );
    assert_eq!(sent.last(), Some(&0));

    assert!(h.distance_to(0.0, 2.0) <= 0.1);
    assert_eq!(h.cues(), vec![AudioCue::Moving, AudioCue::DestinationReached]);
}

#[test]
fn test_right_angle_turn() {
    let mut h = Harness::new(origin());
    h.nav.place_destination(Vector3::new(2.0, 0.0, 0.0));

    while !(h.nav.is_in(NavState::Paused) && h.nav.previous_state() == Some(NavState::Turning)) {
        h.tick();
        assert!(h.history.len() < 200);
    }

    // The target is to the right, the first turn is limited to the largest increment
    assert_eq!(
        h.sent()
            .iter()
            .filter(|b| **b == byte(RobotAction::TurnLeft))
            .count(),
        0
    );
    assert!(h.sent().contains(&byte(RobotAction::TurnRight)));
    let yaw_deg = h.robot.true_pose().yaw_deg;
    assert!(yaw_deg >= 20.0 && yaw_deg < 22.0, "yaw {}", yaw_deg);

    h.run_to_arrival(60.0).expect("destination not reached");
    assert!(h.distance_to(2.0, 0.0) <= 0.1);
    assert_eq!(h.cues().first(), Some(&AudioCue::Turning));
}

#[test]
fn test_waypoints() {
    let planner = ScriptedPlanner {
        path: PlannedPath {
            status: PathStatus::Complete,
            corners_m: vec![
                Vector3::zeros(),
                Vector3::new(0.0, 0.0, 1.0),
                Vector3::new(1.0, 0.0, 1.0),
            ],
        },
    };
    let mut h = Harness::build(origin(), SimParams::default(), Box::new(planner), false);
    h.nav.place_destination(Vector3::new(1.0, 0.0, 1.0));

    h.run_to_arrival(60.0).expect("destination not reached");

    let cues = h.cues();
    assert_eq!(cues.iter().filter(|c| **c == AudioCue::Waypoint).count(), 1);
    assert_eq!(cues.last(), Some(&AudioCue::DestinationReached));
    assert!(h.distance_to(1.0, 1.0) <= 0.1);

    // The finished path is dropped on arrival
    assert!(h.nav.ctx().waypoints_m.is_empty());
    assert_eq!(h.nav.ctx().target_m, None);
    assert_eq!(h.nav.tm().distance_m, None);
}

#[test]
fn test_latency_overshoot() {
    let sim_params = SimParams {
        latency_s: 0.2,
        ..SimParams::default()
    };
    let mut h = Harness::build(
        origin(),
        sim_params,
        Box::new(DirectPlanner::new()),
        false,
    );
    h.nav.place_destination(Vector3::new(2.0, 0.0, 1.0));

    h.run_to_arrival(60.0).expect("destination not reached");
    assert!(h.distance_to(2.0, 1.0) <= 0.1);

    // No turn ever reverses direction, and every pause settles before deciding again
    let mut dirs = Vec::new();
    for (s, c) in h.history.iter() {
        match s {
            NavState::Turning => {
                if *c != DriveCmd::STOP && !dirs.contains(c) {
                    dirs.push(*c);
                }
            }
            _ => {
                assert!(dirs.len() <= 1);
                dirs.clear();
            }
        }
    }

    let pauses = h.episodes(NavState::Paused);
    assert!(!pauses.is_empty());
    for (len, next) in pauses {
        if next == Some(NavState::Deciding) {
            assert!(len >= 10, "paused for only {} ticks", len);
        }
    }
}

#[test]
fn test_pose_loss() {
    let mut h = Harness::new(origin());
    h.nav.place_destination(Vector3::new(0.0, 0.0, 2.0));

    for _ in 0..60 {
        h.tick();
    }
    assert!(h.nav.is_in(NavState::Moving));
    let before = h.robot.true_pose().position_m;

    for _ in 0..10 {
        h.tick_with(None);
    }
    assert!(h.nav.is_in(NavState::Paused));
    assert_eq!(h.nav.link().command(), DriveCmd::STOP);
    assert!((h.robot.true_pose().position_m - before).norm() < 1e-9);

    h.run_to_arrival(30.0).expect("destination not reached");
    assert!(h.distance_to(0.0, 2.0) <= 0.1);
}

#[test]
fn test_no_path_fallback() {
    let planner = ScriptedPlanner {
        path: PlannedPath::none(),
    };
    let mut h = Harness::build(origin(), SimParams::default(), Box::new(planner), false);
    h.nav.place_destination(Vector3::new(1.0, 0.0, 1.0));

    for _ in 0..40 {
        h.tick();
        if !h.nav.ctx().waypoints_m.is_empty() {
            break;
        }
    }
    assert_eq!(
        h.nav.ctx().waypoints_m,
        vec![Vector3::zeros(), Vector3::new(1.0, 0.0, 1.0)]
    );
    assert_eq!(h.nav.ctx().waypoint_index, 1);

    h.run_to_arrival(60.0).expect("destination not reached");

    assert!(h.distance_to(1.0, 1.0) <= 0.1);
    assert!(h.nav.ctx().waypoints_m.is_empty());
}

#[test]
fn test_datagram_loss() {
    let mut h = Harness::build(
        origin(),
        SimParams::default(),
        Box::new(DirectPlanner::new()),
        true,
    );
    h.nav.place_destination(Vector3::new(1.0, 0.0, 2.0));

    // Every command's first datagram is lost, the repeats still get it through
    h.run_to_arrival(60.0).expect("destination not reached");
    assert!(h.distance_to(1.0, 2.0) <= 0.1);
}

#[test]
fn test_new_destination_while_moving() {
    let mut h = Harness::new(origin());
    h.nav.place_destination(Vector3::new(0.0, 0.0, 3.0));

    for _ in 0..40 {
        h.tick();
    }
    assert!(h.nav.is_in(NavState::Moving));

    h.nav.place_destination(Vector3::new(0.0, 0.0, 1.0));
    h.tick();
    assert!(h.nav.is_in(NavState::Pathfinding));
    assert_eq!(h.nav.link().command(), DriveCmd::STOP);

    h.run_to_arrival(30.0).expect("destination not reached");
    assert!(h.distance_to(0.0, 1.0) <= 0.1);
}
