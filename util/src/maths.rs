//! Utility maths functions
//!
//! Angles here are in degrees, measured clockwise when viewed from above. A heading of 0° faces
//! along +z and 90° faces along +x. The vertical axis is y.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Wrap an angle in degrees into the range (-180, 180].
pub fn wrap_angle_deg<T>(angle: T) -> T
where
    T: Float,
{
    let full = num(360.0);
    let half = num(180.0);

    let r = rem_euclid(angle, full);
    if r > half {
        r - full
    } else {
        r
    }
}

/// Get the shortest signed difference from `current` to `target`, in degrees.
///
/// The result is in the range (-180, 180] and is positive if `target` lies clockwise of
/// `current`.
pub fn delta_angle_deg<T>(current: T, target: T) -> T
where
    T: Float,
{
    wrap_angle_deg(target - current)
}

/// Get the unit forward vector for a heading in degrees.
pub fn heading_to_forward(yaw_deg: f64) -> Vector3<f64> {
    let yaw_rad = yaw_deg.to_radians();
    Vector3::new(yaw_rad.sin(), 0.0, yaw_rad.cos())
}

/// Project a vector onto the horizontal plane.
pub fn horizontal(v: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(v[0], 0.0, v[2])
}

/// Euclidian distance between two points, ignoring their vertical components.
pub fn horizontal_distance(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    horizontal(&(b - a)).norm()
}

/// Signed horizontal angle in degrees from a heading to the direction of `target` as seen from
/// `position`.
///
/// The result is in the range (-180, 180], positive when the target is to the right (clockwise).
/// If the target is directly above or below the position the result is zero.
pub fn bearing_error_deg(position: &Vector3<f64>, yaw_deg: f64, target: &Vector3<f64>) -> f64 {
    let to_target = horizontal(&(target - position));

    if to_target.norm() < std::f64::EPSILON {
        return 0.0;
    }

    let forward = heading_to_forward(yaw_deg);

    let target_heading = to_target[0].atan2(to_target[2]).to_degrees();
    let current_heading = forward[0].atan2(forward[2]).to_degrees();

    delta_angle_deg(current_heading, target_heading)
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a literal into `T`, every `Float` can represent these constants
fn num<T: Float>(v: f64) -> T {
    T::from(v).unwrap_or_else(T::nan)
}
