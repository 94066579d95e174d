//! Flocking behaviour and spawn parameters.

use serde::{Deserialize, Serialize};

use crate::error::FlockError;

/// Resolution of the precomputed obstacle-avoidance direction set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RayQuality {
    /// 50 directions
    Low,
    /// 100 directions
    Medium,
    /// 300 directions
    #[default]
    High,
}

impl RayQuality {
    /// Number of sphere samples for this quality level
    pub fn sample_count(self) -> usize {
        match self {
            Self::Low => 50,
            Self::Medium => 100,
            Self::High => 300,
        }
    }
}

/// Keeps agents below the water surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConstraint {
    /// Minimum distance below the displaced water height (m)
    pub margin_m: f32,
}

impl Default for SurfaceConstraint {
    fn default() -> Self {
        Self { margin_m: 0.5 }
    }
}

/// Steering behaviour shared by every agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockSettings {
    /// Minimum cruise speed (m/s)
    pub min_speed: f32,

    /// Maximum cruise speed (m/s)
    pub max_speed: f32,

    /// Distance within which other agents count as flockmates (m)
    pub perception_radius: f32,

    /// Distance within which flockmates repel (m)
    pub avoidance_radius: f32,

    /// Upper bound on any single steering force
    pub max_steer_force: f32,

    pub align_weight: f32,
    pub cohesion_weight: f32,
    pub separate_weight: f32,
    pub target_weight: f32,

    /// Weight of the obstacle-avoidance steering term
    pub avoid_collision_weight: f32,

    /// Radius of the sphere cast used for obstacle probing (m)
    pub probe_radius: f32,

    /// How far ahead obstacles are probed (m)
    pub collision_check_distance: f32,

    /// Obstacle probing runs every `frame_skip_interval` frames per agent (1 = every frame)
    pub frame_skip_interval: u32,

    pub ray_quality: RayQuality,

    /// Frame times at or above this skip position integration (s)
    pub lag_spike_threshold_s: f32,

    /// Seed for spawn placement and zero-velocity recovery
    pub seed: u64,

    /// Optional constraint keeping agents under the ocean surface
    pub surface: Option<SurfaceConstraint>,
}

impl Default for FlockSettings {
    fn default() -> Self {
        Self {
            min_speed: 2.0,
            max_speed: 5.0,
            perception_radius: 2.5,
            avoidance_radius: 1.0,
            max_steer_force: 3.0,
            align_weight: 1.0,
            cohesion_weight: 1.0,
            separate_weight: 1.0,
            target_weight: 1.0,
            avoid_collision_weight: 10.0,
            probe_radius: 0.27,
            collision_check_distance: 5.0,
            frame_skip_interval: 1,
            ray_quality: RayQuality::High,
            lag_spike_threshold_s: 0.1,
            seed: 7,
            surface: Some(SurfaceConstraint::default()),
        }
    }
}

impl FlockSettings {
    /// Validate speed range and non-negative distances
    pub fn validate(&self) -> Result<(), FlockError> {
        let speeds_ok = self.min_speed.is_finite()
            && self.max_speed.is_finite()
            && self.min_speed > 0.0
            && self.min_speed <= self.max_speed;
        if !speeds_ok {
            return Err(FlockError::InvalidSpeedRange {
                min: self.min_speed,
                max: self.max_speed,
            });
        }

        let non_negative = [
            ("perception_radius", self.perception_radius),
            ("avoidance_radius", self.avoidance_radius),
            ("max_steer_force", self.max_steer_force),
            ("probe_radius", self.probe_radius),
            ("collision_check_distance", self.collision_check_distance),
            ("lag_spike_threshold_s", self.lag_spike_threshold_s),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(FlockError::InvalidSetting { name, value });
            }
        }
        Ok(())
    }
}

/// Spawn configuration for the agent pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSettings {
    pub count: usize,

    /// Spawn sphere centre (world space)
    pub center: [f32; 3],

    /// Minimum spawn distance from the centre (m)
    pub radius_min: f32,

    /// Maximum spawn distance from the centre (m)
    pub radius_max: f32,

    /// Shared seek target (world space)
    pub target: Option<[f32; 3]>,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            count: 500,
            center: [0.0, -10.0, 0.0],
            radius_min: 0.0,
            radius_max: 8.0,
            target: Some([0.0, -10.0, 0.0]),
        }
    }
}

impl SpawnSettings {
    pub fn validate(&self) -> Result<(), FlockError> {
        let ok = self.radius_min.is_finite()
            && self.radius_max.is_finite()
            && self.radius_min >= 0.0
            && self.radius_min <= self.radius_max;
        if !ok {
            return Err(FlockError::InvalidSpawnRadius {
                min: self.radius_min,
                max: self.radius_max,
            });
        }
        Ok(())
    }
}

/// Static obstacle geometry probed by the avoidance step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ObstacleShape {
    /// Solid ball
    Sphere { center: [f32; 3], radius: f32 },
    /// Solid half-space behind `point`; `normal` faces open water
    Plane { point: [f32; 3], normal: [f32; 3] },
}

/// Complete flock configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    pub settings: FlockSettings,
    pub spawn: SpawnSettings,
    pub obstacles: Vec<ObstacleShape>,
}

impl FlockConfig {
    pub fn validate(&self) -> Result<(), FlockError> {
        self.settings.validate()?;
        self.spawn.validate()?;
        for shape in &self.obstacles {
            if let ObstacleShape::Sphere { radius, .. } = shape {
                if !(radius.is_finite() && *radius >= 0.0) {
                    return Err(FlockError::InvalidSetting {
                        name: "obstacle radius",
                        value: *radius,
                    });
                }
            }
        }
        Ok(())
    }
}
