//! Obstacle probing for the avoidance step.

use glam::Vec3;

use crate::params::ObstacleShape;

/// Swept-sphere queries against the static scene
pub trait ObstacleProbe: Send + Sync {
    /// `true` if a sphere of `radius` moving from `origin` along unit
    /// `direction` for `distance` touches any obstacle
    fn sphere_cast(&self, origin: Vec3, direction: Vec3, radius: f32, distance: f32) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Obstacle {
    Sphere { center: Vec3, radius: f32 },
    Plane { point: Vec3, normal: Vec3 },
}

impl Obstacle {
    fn from_shape(shape: &ObstacleShape) -> Option<Self> {
        match *shape {
            ObstacleShape::Sphere { center, radius } => Some(Obstacle::Sphere {
                center: Vec3::from(center),
                radius,
            }),
            ObstacleShape::Plane { point, normal } => {
                let normal = Vec3::from(normal).try_normalize()?;
                Some(Obstacle::Plane {
                    point: Vec3::from(point),
                    normal,
                })
            }
        }
    }

    fn sphere_cast(&self, origin: Vec3, direction: Vec3, radius: f32, distance: f32) -> bool {
        match *self {
            Obstacle::Sphere {
                center,
                radius: obstacle_radius,
            } => {
                let along = (center - origin).dot(direction).clamp(0.0, distance);
                let closest = origin + direction * along;
                closest.distance(center) <= obstacle_radius + radius
            }
            Obstacle::Plane { point, normal } => {
                let start = (origin - point).dot(normal);
                let end = (origin + direction * distance - point).dot(normal);
                start.min(end) < radius
            }
        }
    }
}

/// Spheres and half-spaces probed by brute force
#[derive(Debug, Clone, Default)]
pub struct ObstacleSet {
    obstacles: Vec<Obstacle>,
}

impl ObstacleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configured shapes; planes with a zero normal are skipped
    pub fn from_shapes(shapes: &[ObstacleShape]) -> Self {
        Self {
            obstacles: shapes.iter().filter_map(Obstacle::from_shape).collect(),
        }
    }

    pub fn add_sphere(&mut self, center: Vec3, radius: f32) {
        self.obstacles.push(Obstacle::Sphere { center, radius });
    }

    pub fn add_plane(&mut self, point: Vec3, normal: Vec3) {
        if let Some(normal) = normal.try_normalize() {
            self.obstacles.push(Obstacle::Plane { point, normal });
        }
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

impl ObstacleProbe for ObstacleSet {
    fn sphere_cast(&self, origin: Vec3, direction: Vec3, radius: f32, distance: f32) -> bool {
        self.obstacles
            .iter()
            .any(|o| o.sphere_cast(origin, direction, radius, distance))
    }
}
