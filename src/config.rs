//! Runtime configuration, optionally loaded from YAML.

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{collision::WALL_DAMPING, error::ConfigError, math::Vector3};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub bounds: BoundsConfig,
    #[serde(default)]
    pub stepping: SteppingConfig,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundsConfig {
    #[serde(default = "default_bounds_min")]
    pub min: [f64; 3],
    #[serde(default = "default_bounds_max")]
    pub max: [f64; 3],
}

fn default_bounds_min() -> [f64; 3] {
    [-15.0, -10.0, -15.0]
}

fn default_bounds_max() -> [f64; 3] {
    [15.0, 10.0, 15.0]
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            min: default_bounds_min(),
            max: default_bounds_max(),
        }
    }
}

impl BoundsConfig {
    pub fn min(&self) -> Vector3 {
        Vector3::from(self.min)
    }

    pub fn max(&self) -> Vector3 {
        Vector3::from(self.max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteppingConfig {
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,
    #[serde(default = "default_sub_steps")]
    pub sub_steps: u32,
    #[serde(default = "default_max_frame_secs")]
    pub max_frame_secs: f64,
    #[serde(default = "default_wall_damping")]
    pub wall_damping: f64,
}

fn default_rate_hz() -> f64 {
    60.0
}

fn default_sub_steps() -> u32 {
    5
}

fn default_max_frame_secs() -> f64 {
    1.0 / 30.0
}

fn default_wall_damping() -> f64 {
    WALL_DAMPING
}

impl Default for SteppingConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            sub_steps: default_sub_steps(),
            max_frame_secs: default_max_frame_secs(),
            wall_damping: default_wall_damping(),
        }
    }
}

impl SteppingConfig {
    pub fn frame_budget(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_hz)
    }

    pub fn max_frame(&self) -> Duration {
        Duration::from_secs_f64(self.max_frame_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Seeds the generator for the randomly placed spheres; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub reset_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Publish a frame on the event stream every N steps; 0 disables it.
    #[serde(default = "default_broadcast_every")]
    pub broadcast_every: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_broadcast_every() -> u64 {
    6
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            broadcast_every: default_broadcast_every(),
        }
    }
}

impl SimConfig {
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for axis in 0..3 {
            let (min, max) = (self.bounds.min[axis], self.bounds.max[axis]);
            if !(min.is_finite() && max.is_finite() && min < max) {
                return Err(ConfigError::Invalid(format!(
                    "bounds axis {axis}: min {min} must be below max {max}"
                )));
            }
        }

        let stepping = &self.stepping;
        if !(stepping.rate_hz.is_finite() && stepping.rate_hz > 0.0) {
            return Err(ConfigError::Invalid("stepping.rate_hz must be > 0".into()));
        }
        if Duration::try_from_secs_f64(1.0 / stepping.rate_hz).is_err() {
            return Err(ConfigError::Invalid(format!(
                "stepping.rate_hz {} gives an unrepresentable frame budget",
                stepping.rate_hz
            )));
        }
        if stepping.sub_steps == 0 {
            return Err(ConfigError::Invalid(
                "stepping.sub_steps must be at least 1".into(),
            ));
        }
        if !(stepping.max_frame_secs.is_finite() && stepping.max_frame_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "stepping.max_frame_secs must be > 0".into(),
            ));
        }
        if Duration::try_from_secs_f64(stepping.max_frame_secs).is_err() {
            return Err(ConfigError::Invalid(format!(
                "stepping.max_frame_secs {} is too large",
                stepping.max_frame_secs
            )));
        }
        if !(0.0..=1.0).contains(&stepping.wall_damping) {
            return Err(ConfigError::Invalid(
                "stepping.wall_damping must lie in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}
