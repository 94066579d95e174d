//! Agent records and their per-frame scratch data.

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};

/// Persistent state of one agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlockAgent {
    /// Stable index into the pool
    pub id: usize,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Seek target; `None` disables seeking
    pub target: Option<Vec3>,
}

impl FlockAgent {
    pub fn new(id: usize, position: Vec3, velocity: Vec3) -> Self {
        Self {
            id,
            position,
            velocity,
            target: None,
        }
    }

    /// Unit heading, zero for a stationary agent
    pub fn forward(&self) -> Vec3 {
        self.velocity.normalize_or_zero()
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Rendering transform facing along the velocity (`+Z` forward)
    pub fn transform(&self) -> AgentTransform {
        let forward = self.forward();
        let rotation = if forward == Vec3::ZERO {
            Quat::IDENTITY
        } else {
            Quat::from_rotation_arc(Vec3::Z, forward)
        };
        AgentTransform {
            position: self.position.to_array(),
            rotation: rotation.to_array(),
        }
    }
}

/// Neighbour aggregates for one agent, rebuilt from zero every frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NeighborAccumulator {
    pub neighbor_count: u32,
    /// Sum of neighbours' forward vectors
    pub heading_sum: Vec3,
    /// Sum of neighbours' positions
    pub center_sum: Vec3,
    /// Inverse-square repulsion from neighbours inside the avoidance radius
    pub avoidance_sum: Vec3,
    pub acceleration: Vec3,
}

/// Flat per-agent transform for instanced rendering
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct AgentTransform {
    pub position: [f32; 3],
    /// Quaternion `[x, y, z, w]`
    pub rotation: [f32; 4],
}
