//! Sphere bodies, their ids and the snapshot projection handed to clients.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::math::Vector3;

/// Smallest radius and mass a sphere may carry.
pub const MIN_RADIUS: f64 = 0.1;
pub const MIN_MASS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SphereId(u64);

impl SphereId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SphereId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mass of a solid sphere of unit density, floored at [`MIN_MASS`].
pub fn unit_density_mass(radius: f64) -> f64 {
    (4.0 / 3.0 * PI * radius.powi(3)).max(MIN_MASS)
}

/// Parameters for a sphere that has not been inserted into a world yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewSphere {
    pub position: Vector3,
    pub velocity: Vector3,
    pub radius: f64,
    pub mass: f64,
}

impl NewSphere {
    pub fn new(position: Vector3, velocity: Vector3, radius: f64, mass: f64) -> Self {
        Self {
            position,
            velocity,
            radius,
            mass,
        }
    }

    /// Uses the unit-density solid volume as the mass.
    pub fn with_unit_density(position: Vector3, velocity: Vector3, radius: f64) -> Self {
        Self::new(position, velocity, radius, unit_density_mass(radius))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    id: SphereId,
    pub position: Vector3,
    pub velocity: Vector3,
    radius: f64,
    mass: f64,
}

impl Sphere {
    /// Builds a sphere, clamping radius and mass to their floors.
    pub fn new(id: SphereId, params: NewSphere) -> Self {
        Self {
            id,
            position: params.position,
            velocity: params.velocity,
            radius: params.radius.max(MIN_RADIUS),
            mass: params.mass.max(MIN_MASS),
        }
    }

    pub fn id(&self) -> SphereId {
        self.id
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn inverse_mass(&self) -> f64 {
        1.0 / self.mass
    }

    pub fn integrate(&mut self, dt: f64) {
        self.position += self.velocity * dt;
    }

    pub fn momentum(&self) -> Vector3 {
        self.velocity * self.mass
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.magnitude_squared()
    }

    pub fn state(&self) -> SphereState {
        SphereState {
            id: self.id,
            position: self.position.to_array(),
            radius: self.radius,
        }
    }
}

/// Externally visible projection of a sphere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SphereState {
    pub id: SphereId,
    pub position: [f64; 3],
    pub radius: f64,
}
