//! # Drive Equipment Commands
//!
//! The motor controller accepts a single byte per datagram. The lower four bits give the
//! direction of each motor of the differential drive:
//!
//! | Bit | Meaning        |
//! |-----|----------------|
//! | 0   | Left forward   |
//! | 1   | Left reverse   |
//! | 2   | Right forward  |
//! | 3   | Right reverse  |
//!
//! A value of zero stops both motors. Anything the controller sends back is free-form UTF-8 text.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Left motor forward bit
pub const LEFT_FWD: u8 = 1 << 0;

/// Left motor reverse bit
pub const LEFT_REV: u8 = 1 << 1;

/// Right motor forward bit
pub const RIGHT_FWD: u8 = 1 << 2;

/// Right motor reverse bit
pub const RIGHT_REV: u8 = 1 << 3;

/// Mask of all bits the motor controller understands
const DRIVE_MASK: u8 = LEFT_FWD | LEFT_REV | RIGHT_FWD | RIGHT_REV;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An encoded drive command, exactly the byte placed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DriveCmd(u8);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// High level actions the robot can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RobotAction {
    Stop,
    Forward,
    TurnLeft,
    TurnRight,
    Backward,
}

/// Direction of a single wheel motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDir {
    Stop,
    Forward,
    Reverse,
}

/// Telemetry recieved from the motor controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotorTelemetry {
    /// The controller's status LED has been switched on
    LedOn,

    /// The controller's status LED has been switched off
    LedOff,

    /// Any other status string, passed through unmodified
    Status(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DriveCmd {
    /// Both motors stopped.
    pub const STOP: DriveCmd = DriveCmd(0);

    /// Build a command from raw bits. Bits above bit 3 are not part of the protocol and are
    /// cleared.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & DRIVE_MASK)
    }

    /// Get the byte to be transmitted.
    pub fn as_byte(&self) -> u8 {
        self.0
    }

    /// Direction of the left motor.
    pub fn left(&self) -> WheelDir {
        wheel_dir(self.0, LEFT_FWD, LEFT_REV)
    }

    /// Direction of the right motor.
    pub fn right(&self) -> WheelDir {
        wheel_dir(self.0, RIGHT_FWD, RIGHT_REV)
    }

    /// Get the action this command represents, or `None` if the bit combination doesn't match
    /// one of the defined actions.
    pub fn action(&self) -> Option<RobotAction> {
        match (self.left(), self.right()) {
            (WheelDir::Stop, WheelDir::Stop) => Some(RobotAction::Stop),
            (WheelDir::Forward, WheelDir::Forward) => Some(RobotAction::Forward),
            (WheelDir::Reverse, WheelDir::Forward) => Some(RobotAction::TurnLeft),
            (WheelDir::Forward, WheelDir::Reverse) => Some(RobotAction::TurnRight),
            (WheelDir::Reverse, WheelDir::Reverse) => Some(RobotAction::Backward),
            _ => None,
        }
    }
}

impl Default for DriveCmd {
    fn default() -> Self {
        Self::STOP
    }
}

impl From<RobotAction> for DriveCmd {
    fn from(action: RobotAction) -> Self {
        match action {
            RobotAction::Stop => DriveCmd::STOP,
            // Both motors clockwise
            RobotAction::Forward => DriveCmd(LEFT_FWD | RIGHT_FWD),
            // Left motor anticlockwise, right motor clockwise
            RobotAction::TurnLeft => DriveCmd(LEFT_REV | RIGHT_FWD),
            // Left motor clockwise, right motor anticlockwise
            RobotAction::TurnRight => DriveCmd(LEFT_FWD | RIGHT_REV),
            // Both motors anticlockwise
            RobotAction::Backward => DriveCmd(LEFT_REV | RIGHT_REV),
        }
    }
}

impl fmt::Display for DriveCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action() {
            Some(a) => write!(f, "{:?} (0b{:04b})", a, self.0),
            None => write!(f, "0b{:04b}", self.0),
        }
    }
}

impl MotorTelemetry {
    /// Decode a datagram recieved from the motor controller.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected, the controller's status strings
    /// are for display only.
    pub fn from_datagram(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);

        match text.as_ref() {
            "LED_ON" => MotorTelemetry::LedOn,
            "LED_OFF" => MotorTelemetry::LedOff,
            _ => MotorTelemetry::Status(text.into_owned()),
        }
    }
}

impl fmt::Display for MotorTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorTelemetry::LedOn => write!(f, "LED_ON"),
            MotorTelemetry::LedOff => write!(f, "LED_OFF"),
            MotorTelemetry::Status(s) => write!(f, "{}", s),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn wheel_dir(bits: u8, fwd: u8, rev: u8) -> WheelDir {
    match (bits & fwd != 0, bits & rev != 0) {
        (true, false) => WheelDir::Forward,
        (false, true) => WheelDir::Reverse,
        // Both or neither bits set, the controller treats this as stopped
        _ => WheelDir::Stop,
    }
}
