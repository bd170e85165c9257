//! # Path planner
//!
//! Path planning itself is done by an external navigation mesh service. This module defines the
//! seam the navigation loop talks to it through.
//!
//! A request is made with [`PathPlanner::request_path`] and the result read back some time later
//! with [`PathPlanner::path`], the loop waits a fixed time in between for the planner to finish.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use util::maths::horizontal;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A path planning service.
pub trait PathPlanner: Send {
    /// Ask for a path from `start_m` to `destination_m`.
    ///
    /// Returns false if the request was rejected outright.
    fn request_path(&mut self, start_m: &Vector3<f64>, destination_m: &Vector3<f64>) -> bool;

    /// The result of the last request.
    fn path(&self) -> PlannedPath;
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// How much of the requested path could be planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathStatus {
    /// The path reaches the destination
    Complete,

    /// The path gets as close as possible to the destination
    Partial,

    /// No path could be found
    None,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A planned path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPath {
    pub status: PathStatus,

    /// Corners of the path, starting at the agent's position.
    pub corners_m: Vec<Vector3<f64>>,
}

/// A planner for an empty room: every path is a straight line.
#[derive(Debug, Clone)]
pub struct DirectPlanner {
    last: PlannedPath,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PlannedPath {
    pub fn none() -> Self {
        Self {
            status: PathStatus::None,
            corners_m: Vec::new(),
        }
    }
}

impl Default for DirectPlanner {
    fn default() -> Self {
        Self {
            last: PlannedPath::none(),
        }
    }
}

impl DirectPlanner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PathPlanner for DirectPlanner {
    fn request_path(&mut self, start_m: &Vector3<f64>, destination_m: &Vector3<f64>) -> bool {
        // The agent is pinned to the floor
        self.last = PlannedPath {
            status: PathStatus::Complete,
            corners_m: vec![horizontal(start_m), *destination_m],
        };

        debug!(
            "Direct path planned from {:?} to {:?}",
            start_m.as_slice(),
            destination_m.as_slice()
        );

        true
    }

    fn path(&self) -> PlannedPath {
        self.last.clone()
    }
}
