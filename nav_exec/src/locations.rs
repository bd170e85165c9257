//! # Locations
//!
//! Labelled positions in the room the robot can be sent to, loaded from `locations.toml`:
//!
//! ```toml
//! [[location]]
//! label = "fridge"
//! position_m = [2.0, 0.0, 3.5]
//! ```
//!
//! Several locations may share a label, in which case the one nearest the robot is used.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use util::maths::horizontal_distance;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A labelled position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub label: String,

    /// Units: meters
    pub position_m: Vector3<f64>,
}

/// Contents of the locations parameter file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocationsParams {
    pub location: Vec<Location>,
}

/// The set of known locations, with an operator selection.
#[derive(Debug, Clone)]
pub struct LocationRegistry {
    locations: Vec<Location>,

    /// Index of the selected location, equal to the number of locations when nothing is
    /// selected.
    selected: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Location {
    pub fn new(label: &str, position_m: Vector3<f64>) -> Self {
        Self {
            label: label.into(),
            position_m,
        }
    }

    /// Returns true if this location has the given label, ignoring case and surrounding
    /// whitespace.
    pub fn has_label(&self, label: &str) -> bool {
        self.label.trim().eq_ignore_ascii_case(label.trim())
    }
}

impl LocationRegistry {
    pub fn new(locations: Vec<Location>) -> Self {
        debug!("{} location(s) registered", locations.len());
        Self {
            selected: locations.len(),
            locations,
        }
    }

    pub fn from_params(params: LocationsParams) -> Self {
        Self::new(params.location)
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// The location with the given label nearest to `from_m`, measured horizontally.
    pub fn nearest(&self, label: &str, from_m: &Vector3<f64>) -> Option<&Location> {
        self.locations
            .iter()
            .filter(|l| l.has_label(label))
            .min_by(|a, b| {
                horizontal_distance(from_m, &a.position_m)
                    .partial_cmp(&horizontal_distance(from_m, &b.position_m))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Move the selection to the next location.
    ///
    /// After the last location the selection becomes empty, and the next call selects the first
    /// location again.
    pub fn cycle_next(&mut self) -> Option<&Location> {
        self.selected = (self.selected + 1) % (self.locations.len() + 1);
        self.selected()
    }

    /// The selected location.
    pub fn selected(&self) -> Option<&Location> {
        self.locations.get(self.selected)
    }
}
