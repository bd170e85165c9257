//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the navigation software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Navigation telecommands
pub mod tc;

/// Command and telemetry definitions for equipment (the motor controller)
pub mod eqpt;

/// Network module
pub mod net;
