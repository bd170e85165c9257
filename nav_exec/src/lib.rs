//! # Navigation library.
//!
//! This library allows other crates in the workspace, and the integration tests, to access items
//! defined inside the navigation crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Audio cues and the microphone gate
pub mod audio;

/// Global data store for the executable
pub mod data_store;

/// Event broker - decouples navigation from robot control and audio
pub mod events;

/// Generic finite state machine
pub mod fsm;

/// Localisation - the robot pose and the sources it comes from
pub mod loc;

/// Labelled locations the robot can be sent to
pub mod locations;

/// Motor link - sends drive commands to the motor controller
pub mod motor_link;

/// Navigation control - drives the robot along a path to the destination
pub mod nav;

/// Executable parameters
pub mod params;

/// Path planning interface
pub mod path_planner;

/// Robot control - the top level mode of the robot
pub mod robot_ctrl;

/// Simulated robot, used without hardware
pub mod sim;

/// Telecommand client - recieves telecommands from the ground
pub mod tc_client;

/// Telecommand processor
pub mod tc_processor;
