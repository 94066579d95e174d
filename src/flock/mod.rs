//! Boid flocking: alignment, cohesion, separation, target seeking and
//! obstacle avoidance for a pool of agents.

mod agent;
mod engine;
mod obstacles;
mod steering;
mod turn_rays;

pub use agent::{AgentTransform, FlockAgent, NeighborAccumulator};
pub use engine::FlockEngine;
pub use obstacles::{ObstacleProbe, ObstacleSet};
pub use steering::steer_towards;
pub use turn_rays::{golden_spiral, turn_rays};
