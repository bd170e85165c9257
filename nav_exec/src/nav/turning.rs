//! # [`NavCtrl`](super::NavCtrl) turning state
//!
//! Turns on the spot towards the target, but only through a limited increment before pausing to
//! let the robot settle and re-measure. The increment shrinks as the bearing error gets smaller.
//!
//! The direction is latched on the first update. If the error changes sign while turning the
//! robot has overshot, and it pauses rather than reversing straight away.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, warn};

use comms_if::eqpt::drive::RobotAction;
use util::maths::delta_angle_deg;

use crate::{
    audio::AudioCue,
    fsm::{State, Transition},
};

use super::{DebugInfo, NavCtx, NavState};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnDir {
    Unassigned,
    Left,
    Right,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug)]
pub(super) struct Turning {
    elapsed_s: f64,

    dir: TurnDir,

    start_yaw_deg: f64,

    last_stuck_check_s: f64,

    last_stuck_check_yaw_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Turning {
    fn default() -> Self {
        Self {
            elapsed_s: 0.0,
            dir: TurnDir::Unassigned,
            start_yaw_deg: 0.0,
            last_stuck_check_s: 0.0,
            last_stuck_check_yaw_deg: 0.0,
        }
    }
}

impl Turning {
    fn rotated_deg(&self, ctx: &NavCtx) -> f64 {
        delta_angle_deg(self.start_yaw_deg, ctx.yaw_deg()).abs()
    }

    /// Check the robot is actually rotating, resending the turn command if not.
    fn check_stuck(&mut self, ctx: &mut NavCtx) {
        if self.elapsed_s - self.last_stuck_check_s < ctx.params.stuck_interval_s {
            return;
        }

        let yaw_deg = ctx.yaw_deg();
        let rotation_deg = delta_angle_deg(self.last_stuck_check_yaw_deg, yaw_deg).abs();

        if rotation_deg < ctx.params.stuck_threshold_deg && self.dir != TurnDir::Unassigned {
            warn!(
                "Stuck turning {:?}, only {:.2}° in {:.1} s, resending",
                self.dir,
                rotation_deg,
                self.elapsed_s - self.last_stuck_check_s
            );
            ctx.play(AudioCue::Stuck);
            ctx.link.resend();
        }

        self.last_stuck_check_s = self.elapsed_s;
        self.last_stuck_check_yaw_deg = yaw_deg;
    }
}

impl State<NavState, NavCtx> for Turning {
    fn id(&self) -> NavState {
        NavState::Turning
    }

    fn enter(&mut self, ctx: &mut NavCtx) -> Transition<NavState> {
        self.elapsed_s = 0.0;
        self.dir = TurnDir::Unassigned;
        self.start_yaw_deg = ctx.yaw_deg();
        self.last_stuck_check_s = 0.0;
        self.last_stuck_check_yaw_deg = self.start_yaw_deg;

        ctx.set_status("Turning");
        ctx.set_turning(true);

        Transition::None
    }

    fn update(&mut self, ctx: &mut NavCtx, dt_s: f64) -> Transition<NavState> {
        if ctx.take_destination_moved() {
            return Transition::To(NavState::Pathfinding);
        }

        if ctx.waypoint_reached() {
            return Transition::To(NavState::Waypoint);
        }

        self.elapsed_s += dt_s;

        let error_deg = ctx.bearing_error_deg();
        let increment_deg = ctx.params.turn_increment_deg(error_deg);
        let rotated_deg = self.rotated_deg(ctx);

        self.check_stuck(ctx);

        if rotated_deg >= increment_deg {
            debug!("Turned {:.1}° of a {:.0}° increment", rotated_deg, increment_deg);
            return Transition::To(NavState::Paused);
        }

        if error_deg.abs() <= ctx.params.fine_accuracy_deg {
            return Transition::To(NavState::Paused);
        }

        let wanted = if error_deg > 0.0 {
            TurnDir::Right
        } else {
            TurnDir::Left
        };

        match self.dir {
            TurnDir::Unassigned => {
                self.dir = wanted;
                ctx.set_status(match wanted {
                    TurnDir::Right => "Turning right",
                    _ => "Turning left",
                });
                ctx.drive(match wanted {
                    TurnDir::Right => RobotAction::TurnRight,
                    _ => RobotAction::TurnLeft,
                });
                Transition::None
            }
            d if d == wanted => Transition::None,
            _ => {
                debug!("Overshot while turning {:?}", self.dir);
                Transition::To(NavState::Paused)
            }
        }
    }

    fn exit(&mut self, ctx: &mut NavCtx, _next: NavState) {
        ctx.drive(RobotAction::Stop);

        ctx.debug_info = Some(DebugInfo {
            state: NavState::Turning,
            bearing_error_deg: ctx.bearing_error_deg(),
            start_yaw_deg: Some(self.start_yaw_deg),
            current_yaw_deg: Some(ctx.yaw_deg()),
            rotated_deg: Some(self.rotated_deg(ctx)),
            elapsed_s: Some(self.elapsed_s),
            distance_m: None,
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{loc::Pose, nav::test_util::test_ctx};
    use comms_if::eqpt::drive::DriveCmd;
    use nalgebra::Vector3;

    fn set_yaw(ctx: &mut NavCtx, yaw_deg: f64) {
        ctx.pose = Some(Pose::new(Vector3::zeros(), yaw_deg));
    }

    #[test]
    fn test_turns_towards_target() {
        let (mut ctx, cues) = test_ctx();
        // Target 90° to the right
        ctx.target_m = Some(Vector3::new(5.0, 0.0, 0.0));
        set_yaw(&mut ctx, 0.0);

        let mut state = Turning::default();
        state.enter(&mut ctx);
        assert!(ctx.is_turning);
        assert_eq!(*cues.lock().unwrap(), vec![AudioCue::Turning]);

        assert_eq!(state.update(&mut ctx, 0.05), Transition::None);
        assert_eq!(ctx.link.command(), DriveCmd::from(RobotAction::TurnRight));

        // 19° isn't enough for a 20° increment
        set_yaw(&mut ctx, 19.0);
        assert_eq!(state.update(&mut ctx, 0.05), Transition::None);

        set_yaw(&mut ctx, 20.0);
        assert_eq!(
            state.update(&mut ctx, 0.05),
            Transition::To(NavState::Paused)
        );

        state.exit(&mut ctx, NavState::Paused);
        assert_eq!(ctx.link.command(), DriveCmd::STOP);
        let info = ctx.debug_info.clone().unwrap();
        assert_eq!(info.rotated_deg, Some(20.0));
        assert_eq!(info.start_yaw_deg, Some(0.0));
    }

    #[test]
    fn test_overshoot_guard() {
        let (mut ctx, _) = test_ctx();
        ctx.target_m = Some(Vector3::new(-5.0, 0.0, 5.0));
        set_yaw(&mut ctx, 0.0);

        let mut state = Turning::default();
        state.enter(&mut ctx);
        state.update(&mut ctx, 0.05);
        assert_eq!(ctx.link.command(), DriveCmd::from(RobotAction::TurnLeft));

        // Swung past the target, the error is now to the right but still outside fine accuracy
        // and the increment hasn't been used up
        ctx.target_m = Some(Vector3::new(10.0, 0.0, 10.0));
        set_yaw(&mut ctx, -3.0);
        assert_eq!(
            state.update(&mut ctx, 0.05),
            Transition::To(NavState::Paused)
        );
        assert_eq!(ctx.link.command(), DriveCmd::from(RobotAction::TurnLeft));
    }

    #[test]
    fn test_fresh_latch_on_enter() {
        let (mut ctx, cues) = test_ctx();
        ctx.target_m = Some(Vector3::new(-5.0, 0.0, 0.0));
        set_yaw(&mut ctx, 0.0);

        let mut state = Turning::default();
        state.enter(&mut ctx);
        state.update(&mut ctx, 0.05);
        state.exit(&mut ctx, NavState::Paused);

        ctx.target_m = Some(Vector3::new(5.0, 0.0, 0.0));
        state.enter(&mut ctx);
        state.update(&mut ctx, 0.05);
        assert_eq!(ctx.link.command(), DriveCmd::from(RobotAction::TurnRight));

        // Still turning, so the cue isn't repeated
        assert_eq!(*cues.lock().unwrap(), vec![AudioCue::Turning]);
    }

    #[test]
    fn test_stuck_resends() {
        let (mut ctx, cues) = test_ctx();
        ctx.target_m = Some(Vector3::new(5.0, 0.0, 0.0));
        set_yaw(&mut ctx, 0.0);

        let mut state = Turning::default();
        state.enter(&mut ctx);

        let mut now_s = 0.0;
        let mut sent = 0;
        for _ in 0..45 {
            assert_eq!(state.update(&mut ctx, 0.05), Transition::None);
            if ctx.link.process(now_s).is_some() {
                sent += 1;
            }
            now_s += 0.05;
        }

        // Three sends for the new command, then at 2 s the robot hasn't moved so it's resent
        assert!(cues.lock().unwrap().contains(&AudioCue::Stuck));
        assert!(sent > 3);
    }

    #[test]
    fn test_target_reached_while_turning() {
        let (mut ctx, _) = test_ctx();
        ctx.target_m = Some(Vector3::new(0.05, 0.0, 0.0));
        set_yaw(&mut ctx, 0.0);

        let mut state = Turning::default();
        state.enter(&mut ctx);
        assert_eq!(
            state.update(&mut ctx, 0.05),
            Transition::To(NavState::Waypoint)
        );
    }
}
