pub mod collision;
pub mod config;
pub mod error;
pub mod math;
pub mod scheduler;
pub mod sphere;
pub mod web;
pub mod world;

pub use config::SimConfig;
pub use math::Vector3;
pub use scheduler::{SchedulerHandle, SteppingScheduler};
pub use sphere::{NewSphere, Sphere, SphereId, SphereState};
pub use world::{SharedWorld, SimulationWorld, WorldSnapshot};
