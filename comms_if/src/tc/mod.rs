//! # Telecommand module
//!
//! Telecommands are the instructions an operator (or a script) sends to the navigation
//! executable. They are serialised as externally tagged JSON, for example:
//!
//! ```json
//! {"PlaceDestination": {"x": 1.0, "y": 0.0, "z": 2.5}}
//! {"Instruction": "fridge"}
//! {"ManualDrive": "TurnLeft"}
//! "EmergencyStop"
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::eqpt::drive::RobotAction;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the navigation software by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tc {
    /// Place the destination at the given point, in metres. Starts (or restarts) pathfinding.
    PlaceDestination { x: f64, y: f64, z: f64 },

    /// A recognised spoken instruction, i.e. the label of a location to go to. An empty label
    /// means the instruction wasn't understood.
    Instruction(String),

    /// Force navigation into the terminal abort state.
    Abort,

    /// Stop navigating and return to idle.
    StopNavigation,

    /// Stop navigating and command the motors to stop immediately.
    EmergencyStop,

    /// Reset navigation out of abort, back to idle.
    ResetNav,

    /// Drive the robot directly, overriding navigation.
    ManualDrive(RobotAction),

    /// Release the manual drive input, stopping the robot once.
    ManualRelease,

    /// Reinitialise the motor link, clearing any degraded state.
    ReinitLink,

    /// Select the next known location, wrapping through an empty selection.
    CycleLocation,

    /// Place the destination at the selected location.
    GoToSelectedLocation,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Could not serialise the TC: {0}")]
    SerialiseError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str.trim()).map_err(TcParseError::InvalidJson)
    }

    /// Serialise the TC into a JSON string
    pub fn to_json(&self) -> Result<String, TcParseError> {
        serde_json::to_string(self).map_err(TcParseError::SerialiseError)
    }
}
