use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::{
    collision::{resolve_pair, resolve_walls, WALL_DAMPING},
    config::SimConfig,
    math::Vector3,
    sphere::{NewSphere, Sphere, SphereId, SphereState},
};

/// World handle shared by the stepping thread and request handlers.
pub type SharedWorld = Arc<Mutex<SimulationWorld>>;

/// Locks the world, recovering the guard if a previous holder panicked.
pub fn lock_world(world: &Mutex<SimulationWorld>) -> MutexGuard<'_, SimulationWorld> {
    world.lock().unwrap_or_else(PoisonError::into_inner)
}

const RANDOM_SPHERES: usize = 6;
const SPAWN_MARGIN: f64 = 1.0;
const RANDOM_SPEED: f64 = 8.0;
const RANDOM_RADIUS: (f64, f64) = (0.3, 0.8);

/// The spheres every reset starts from, as (position, velocity, radius, mass).
const INITIAL_SPHERES: [([f64; 3], [f64; 3], f64, f64); 4] = [
    ([-5.0, 0.0, 0.0], [15.0, 5.0, 2.0], 1.0, 1.0),
    ([5.0, 1.0, -1.0], [-10.0, 2.0, -3.0], 1.5, 3.375),
    ([0.0, -6.0, 2.0], [2.0, 10.0, 0.0], 0.8, 0.512),
    ([0.0, 6.0, -2.0], [-3.0, -12.0, 5.0], 1.2, 1.728),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSettings {
    pub sub_steps: u32,
    pub max_frame: Duration,
    pub wall_damping: f64,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            sub_steps: 5,
            max_frame: Duration::from_secs_f64(1.0 / 30.0),
            wall_damping: WALL_DAMPING,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BoundsSnapshot {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub spheres: Vec<SphereState>,
    pub bounds: BoundsSnapshot,
}

pub struct SimulationWorld {
    spheres: Vec<Sphere>,
    bounds_min: Vector3,
    bounds_max: Vector3,
    settings: StepSettings,
    next_id: u64,
    last_step: Instant,
    rng: ChaCha8Rng,
}

impl SimulationWorld {
    /// Empty world with default stepping settings and an entropy-seeded generator.
    pub fn new(bounds_min: Vector3, bounds_max: Vector3) -> Self {
        Self::with_rng(
            bounds_min,
            bounds_max,
            StepSettings::default(),
            ChaCha8Rng::from_entropy(),
        )
    }

    pub fn from_config(config: &SimConfig) -> Self {
        let settings = StepSettings {
            sub_steps: config.stepping.sub_steps.max(1),
            max_frame: config.stepping.max_frame(),
            wall_damping: config.stepping.wall_damping,
        };
        let rng = match config.population.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(config.bounds.min(), config.bounds.max(), settings, rng)
    }

    pub fn with_rng(
        bounds_min: Vector3,
        bounds_max: Vector3,
        settings: StepSettings,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            spheres: Vec::new(),
            bounds_min,
            bounds_max,
            settings,
            next_id: 0,
            last_step: Instant::now(),
            rng,
        }
    }

    pub fn bounds(&self) -> (Vector3, Vector3) {
        (self.bounds_min, self.bounds_max)
    }

    pub fn settings(&self) -> StepSettings {
        self.settings
    }

    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn sphere(&self, id: SphereId) -> Option<&Sphere> {
        self.spheres.iter().find(|sphere| sphere.id() == id)
    }

    /// Inserts a new sphere and returns the id assigned to it.
    pub fn add(&mut self, params: NewSphere) -> SphereId {
        let id = SphereId::new(self.next_id);
        self.next_id += 1;
        self.spheres.push(Sphere::new(id, params));
        id
    }

    pub fn remove_by_id(&mut self, id: SphereId) -> bool {
        match self.spheres.iter().position(|sphere| sphere.id() == id) {
            Some(index) => {
                self.spheres.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn step(&mut self) {
        self.step_at(Instant::now());
    }

    /// Advances by the time elapsed since the previous step, capped at the
    /// configured maximum frame. Does nothing when no time has passed.
    pub fn step_at(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_step);
        self.last_step = now;
        let dt = elapsed.min(self.settings.max_frame).as_secs_f64();
        if dt <= 0.0 {
            return;
        }
        self.advance(dt);
    }

    /// Integrates one frame of `dt` seconds split into equal sub-steps.
    pub fn advance(&mut self, dt: f64) {
        let sub_steps = self.settings.sub_steps.max(1);
        let sub_dt = dt / f64::from(sub_steps);
        for _ in 0..sub_steps {
            for sphere in &mut self.spheres {
                sphere.integrate(sub_dt);
            }
            for sphere in &mut self.spheres {
                resolve_walls(
                    sphere,
                    self.bounds_min,
                    self.bounds_max,
                    self.settings.wall_damping,
                );
            }
            self.resolve_pairs();
        }
    }

    fn resolve_pairs(&mut self) {
        let count = self.spheres.len();
        for i in 0..count {
            let (head, tail) = self.spheres.split_at_mut(i + 1);
            let a = &mut head[i];
            for b in tail.iter_mut() {
                resolve_pair(a, b);
            }
        }
    }

    pub fn snapshot(&self) -> Vec<SphereState> {
        self.spheres.iter().map(Sphere::state).collect()
    }

    pub fn world_snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            spheres: self.snapshot(),
            bounds: BoundsSnapshot {
                min: self.bounds_min.to_array(),
                max: self.bounds_max.to_array(),
            },
        }
    }

    /// Restarts ids at zero and repopulates with the four fixed spheres
    /// followed by the random ones.
    pub fn reset(&mut self) {
        self.spheres.clear();
        self.next_id = 0;
        self.last_step = Instant::now();

        for (position, velocity, radius, mass) in INITIAL_SPHERES {
            self.add(NewSphere::new(
                position.into(),
                velocity.into(),
                radius,
                mass,
            ));
        }
        for _ in 0..RANDOM_SPHERES {
            let params = self.random_sphere();
            self.add(params);
        }
    }

    fn random_sphere(&mut self) -> NewSphere {
        let mut position = Vector3::ZERO;
        let mut velocity = Vector3::ZERO;
        for axis in 0..3 {
            let low = self.bounds_min.axis(axis) + SPAWN_MARGIN;
            let high = self.bounds_max.axis(axis) - SPAWN_MARGIN;
            *position.axis_mut(axis) = if low < high {
                self.rng.gen_range(low..=high)
            } else {
                (self.bounds_min.axis(axis) + self.bounds_max.axis(axis)) * 0.5
            };
            *velocity.axis_mut(axis) = self.rng.gen_range(-RANDOM_SPEED..=RANDOM_SPEED);
        }
        let radius = self.rng.gen_range(RANDOM_RADIUS.0..=RANDOM_RADIUS.1);
        NewSphere::with_unit_density(position, velocity, radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> SimulationWorld {
        SimulationWorld::with_rng(
            Vector3::new(-15.0, -10.0, -15.0),
            Vector3::new(15.0, 10.0, 15.0),
            StepSettings::default(),
            ChaCha8Rng::seed_from_u64(5),
        )
    }

    #[test]
    fn ids_are_monotonic_and_not_reused() {
        let mut world = world();
        let a = world.add(NewSphere::with_unit_density(Vector3::ZERO, Vector3::ZERO, 1.0));
        let b = world.add(NewSphere::with_unit_density(Vector3::ZERO, Vector3::ZERO, 1.0));
        assert!(world.remove_by_id(b));
        let c = world.add(NewSphere::with_unit_density(Vector3::ZERO, Vector3::ZERO, 1.0));
        assert_eq!((a.raw(), b.raw(), c.raw()), (0, 1, 2));
    }

    #[test]
    fn reset_restarts_the_counter() {
        let mut world = world();
        for _ in 0..3 {
            world.add(NewSphere::with_unit_density(Vector3::ZERO, Vector3::ZERO, 0.5));
        }
        world.reset();
        let ids: Vec<u64> = world.spheres().iter().map(|s| s.id().raw()).collect();
        assert_eq!(ids, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn long_pause_is_clamped() {
        let mut world = world();
        let id = world.add(NewSphere::new(
            Vector3::ZERO,
            Vector3::new(3.0, 0.0, 0.0),
            0.5,
            1.0,
        ));
        let start = Instant::now();
        world.step_at(start);
        world.step_at(start + Duration::from_secs(10));
        let x = world.sphere(id).unwrap().position.x;
        assert!((x - 3.0 / 30.0).abs() < 1e-3, "moved {x}");
    }

    #[test]
    fn clock_going_backwards_is_a_no_op() {
        let mut world = world();
        let id = world.add(NewSphere::new(
            Vector3::ZERO,
            Vector3::new(1.0, 1.0, 1.0),
            0.5,
            1.0,
        ));
        let later = Instant::now() + Duration::from_millis(5);
        world.step_at(later);
        let before = world.sphere(id).unwrap().clone();
        world.step_at(later - Duration::from_millis(3));
        assert_eq!(world.sphere(id).unwrap(), &before);
    }

    #[test]
    fn seeded_worlds_reset_identically() {
        let mut a = world();
        let mut b = world();
        a.reset();
        b.reset();
        assert_eq!(a.snapshot(), b.snapshot());
    }
}
