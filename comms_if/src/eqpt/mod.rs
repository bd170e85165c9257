//! # Equipment Interface
//!
//! This module defines the interface structures which will be sent to and recieved from the
//! motor controller.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod drive;

pub use drive::{DriveCmd, MotorTelemetry, RobotAction};
