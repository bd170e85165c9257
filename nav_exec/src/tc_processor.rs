//! # Telecommand processor module
//!
//! The telecommand processor handles various TCs coming from any source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use nalgebra::Vector3;

// Internal
use crate::{
    data_store::DataStore,
    events::{event_id, EventArgs},
    robot_ctrl::RobotCtrl,
};
use comms_if::tc::Tc;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Errors raised by the receiving module are logged, a failed TC never stops the executable.
pub fn exec(ds: &mut DataStore, robot: &mut RobotCtrl, tc: &Tc) {
    debug!("Recieved {:?}", tc);

    // Handle different Tcs
    let result = match tc {
        Tc::PlaceDestination { x, y, z } => {
            robot.nav_mut().place_destination(Vector3::new(*x, *y, *z));
            Ok(())
        }
        Tc::Instruction(s) => {
            robot
                .broker()
                .dispatch_or_warn(event_id::INSTRUCTION_READY, &EventArgs::Instruction(s.clone()));
            Ok(())
        }
        Tc::Abort => robot.abort().map_err(|e| e.to_string()),
        Tc::StopNavigation => robot.nav_mut().stop_navigation().map_err(|e| e.to_string()),
        Tc::EmergencyStop => robot.emergency_stop(ds.sim_time_s).map_err(|e| e.to_string()),
        Tc::ResetNav => robot.nav_mut().reset().map_err(|e| e.to_string()),
        Tc::ManualDrive(a) => {
            robot.manual_drive(*a);
            Ok(())
        }
        Tc::ManualRelease => {
            robot.manual_release();
            Ok(())
        }
        Tc::ReinitLink => robot.nav_mut().link_mut().reinit().map_err(|e| e.to_string()),
        Tc::CycleLocation => {
            robot.cycle_location();
            Ok(())
        }
        Tc::GoToSelectedLocation => {
            robot.go_to_selected();
            Ok(())
        }
    };

    if let Err(e) = result {
        warn!("Could not execute {:?}: {}", tc, e);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        events::EventBroker,
        loc::Pose,
        locations::{Location, LocationRegistry},
        motor_link::{MotorLink, MotorLinkParams},
        nav::{params::NavCtrlParams, NavCtrl, NavState},
        path_planner::DirectPlanner,
        robot_ctrl::RobotMode,
    };
    use comms_if::eqpt::drive::{DriveCmd, RobotAction};
    use std::sync::Arc;

    fn robot() -> RobotCtrl {
        let broker = Arc::new(EventBroker::with_default_events().unwrap());
        let nav = NavCtrl::new(
            NavCtrlParams::default(),
            MotorLink::offline(MotorLinkParams::default()),
            Box::new(DirectPlanner::new()),
            broker,
        )
        .unwrap();
        let locations = LocationRegistry::new(vec![
            Location::new("sofa", Vector3::new(0.0, 0.0, 3.0)),
            Location::new("table", Vector3::new(-2.0, 0.0, 1.0)),
        ]);

        let mut robot = RobotCtrl::new(nav, locations).unwrap();
        robot.announce_locations_loaded();
        robot.update(0.05, pose()).unwrap();
        robot
    }

    fn pose() -> Option<Pose> {
        Some(Pose::new(Vector3::zeros(), 0.0))
    }

    #[test]
    fn test_place_and_stop() {
        let mut ds = DataStore::default();
        let mut robot = robot();

        exec(
            &mut ds,
            &mut robot,
            &Tc::PlaceDestination {
                x: 1.0,
                y: 0.0,
                z: 2.0,
            },
        );
        robot.update(0.05, pose()).unwrap();
        assert_eq!(robot.nav().state(), Some(NavState::Pathfinding));

        exec(&mut ds, &mut robot, &Tc::StopNavigation);
        robot.update(0.05, pose()).unwrap();
        assert_eq!(robot.nav().state(), Some(NavState::Idle));
        assert_eq!(robot.mode(), Some(RobotMode::Stationary));
    }

    #[test]
    fn test_instruction_tc() {
        let mut ds = DataStore::default();
        let mut robot = robot();

        exec(&mut ds, &mut robot, &Tc::Instruction(String::from("table")));
        robot.update(0.05, pose()).unwrap();

        assert_eq!(
            robot.nav().ctx().destination_m,
            Some(Vector3::new(-2.0, 0.0, 1.0))
        );
    }

    #[test]
    fn test_abort_and_reset_tcs() {
        let mut ds = DataStore::default();
        let mut robot = robot();

        exec(&mut ds, &mut robot, &Tc::Abort);
        robot.update(0.05, pose()).unwrap();
        assert_eq!(robot.nav().state(), Some(NavState::Abort));

        exec(&mut ds, &mut robot, &Tc::ResetNav);
        robot.update(0.05, pose()).unwrap();
        assert_eq!(robot.nav().state(), Some(NavState::Idle));
    }

    #[test]
    fn test_manual_tcs() {
        let mut ds = DataStore::default();
        let mut robot = robot();

        exec(&mut ds, &mut robot, &Tc::ManualDrive(RobotAction::Forward));
        robot.update(0.05, pose()).unwrap();
        assert_eq!(
            robot.nav().link().command(),
            DriveCmd::from(RobotAction::Forward)
        );

        exec(&mut ds, &mut robot, &Tc::ManualRelease);
        assert!(!robot.is_manual());
        assert_eq!(robot.nav().link().command(), DriveCmd::STOP);
    }

    #[test]
    fn test_location_tcs() {
        let mut ds = DataStore::default();
        let mut robot = robot();

        // Nothing selected, nothing happens
        exec(&mut ds, &mut robot, &Tc::GoToSelectedLocation);
        assert_eq!(robot.nav().ctx().destination_m, None);

        exec(&mut ds, &mut robot, &Tc::CycleLocation);
        exec(&mut ds, &mut robot, &Tc::GoToSelectedLocation);
        assert_eq!(
            robot.nav().ctx().destination_m,
            Some(Vector3::new(0.0, 0.0, 3.0))
        );
        assert_eq!(robot.nav().instruction(), "sofa");
    }
}
