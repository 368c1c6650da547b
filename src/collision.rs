//! Collision response for spheres inside an axis-aligned box.
//!
//! Both procedures mutate the spheres in place. Degenerate inputs
//! (coincident centres, vanishing inverse mass) are silent no-ops.

use crate::{math::Vector3, sphere::Sphere};

/// Velocity retained (and reversed) on a wall bounce.
pub const WALL_DAMPING: f64 = 0.9;

/// Squared centre distance below which a pair is not resolved.
const COINCIDENT_EPSILON: f64 = 1e-9;

/// Combined inverse mass below which a pair is treated as immovable.
const INV_MASS_EPSILON: f64 = 1e-9;

/// Clamps the sphere into `[min + r, max - r]` on each axis and reflects
/// the velocity component of every axis that was violated.
///
/// Axes are handled independently, so a corner contact bounces on each
/// touched axis in the same call.
pub fn resolve_walls(sphere: &mut Sphere, bounds_min: Vector3, bounds_max: Vector3, damping: f64) {
    let radius = sphere.radius();
    for axis in 0..3 {
        let low = bounds_min.axis(axis) + radius;
        let high = bounds_max.axis(axis) - radius;
        let position = sphere.position.axis(axis);
        if position < low {
            *sphere.position.axis_mut(axis) = low;
            *sphere.velocity.axis_mut(axis) *= -damping;
        } else if position > high {
            *sphere.position.axis_mut(axis) = high;
            *sphere.velocity.axis_mut(axis) *= -damping;
        }
    }
}

/// Separates an overlapping pair and applies a perfectly elastic impulse.
///
/// Returns `true` when the pair was overlapping and positions were corrected.
pub fn resolve_pair(a: &mut Sphere, b: &mut Sphere) -> bool {
    let offset = a.position - b.position;
    let distance_sq = offset.magnitude_squared();
    let min_distance = a.radius() + b.radius();

    if distance_sq <= COINCIDENT_EPSILON || distance_sq >= min_distance * min_distance {
        return false;
    }

    let distance = distance_sq.sqrt();
    let normal = offset / distance;
    let overlap = min_distance - distance;

    let inv_mass_a = a.inverse_mass();
    let inv_mass_b = b.inverse_mass();
    let inv_mass_sum = inv_mass_a + inv_mass_b;

    let (share_a, share_b) = if inv_mass_sum > INV_MASS_EPSILON {
        (inv_mass_a / inv_mass_sum, inv_mass_b / inv_mass_sum)
    } else {
        (0.5, 0.5)
    };
    a.position += normal * (overlap * share_a);
    b.position -= normal * (overlap * share_b);

    let vel_along_normal = (a.velocity - b.velocity).dot(&normal);
    if vel_along_normal > 0.0 {
        return true;
    }

    let j = if inv_mass_sum > INV_MASS_EPSILON {
        -2.0 * vel_along_normal / inv_mass_sum
    } else {
        0.0
    };
    let impulse = normal * j;
    a.velocity += impulse * inv_mass_a;
    b.velocity -= impulse * inv_mass_b;
    true
}
