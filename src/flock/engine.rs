//! Boid flocking engine.
//!
//! Each step scans all pairs of agents in parallel against a read-only copy of
//! the previous frame, then integrates velocities and positions sequentially.

use glam::{Quat, Vec3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use std::f32::consts::PI;
use tracing::{debug, info};

use super::agent::{AgentTransform, FlockAgent, NeighborAccumulator};
use super::obstacles::{ObstacleProbe, ObstacleSet};
use super::steering::steer_towards;
use super::turn_rays::turn_rays;
use crate::error::FlockError;
use crate::ocean::WaterHeightQuery;
use crate::params::{FlockConfig, FlockSettings};

pub struct FlockEngine {
    settings: FlockSettings,
    agents: Vec<FlockAgent>,
    accumulators: Vec<NeighborAccumulator>,
    transforms: Vec<AgentTransform>,
    obstacles: Box<dyn ObstacleProbe>,
    rng: StdRng,
    frame: u64,
}

impl FlockEngine {
    /// Spawn `config.spawn.count` agents on a spherical shell around the spawn centre
    pub fn new(config: &FlockConfig) -> Result<Self, FlockError> {
        config.validate()?;
        let settings = &config.settings;
        let spawn = &config.spawn;
        let mut rng = StdRng::seed_from_u64(settings.seed);

        let center = Vec3::from(spawn.center);
        let target = spawn.target.map(Vec3::from);
        let agents = (0..spawn.count)
            .map(|id| {
                let distance = rng.gen_range(spawn.radius_min..=spawn.radius_max);
                let position = center + random_unit_vector(&mut rng) * distance;
                let speed = rng.gen_range(settings.min_speed..=settings.max_speed);
                let velocity = random_unit_vector(&mut rng) * speed;
                FlockAgent {
                    target,
                    ..FlockAgent::new(id, position, velocity)
                }
            })
            .collect();

        let mut engine = Self::assemble(settings.clone(), agents, rng);
        engine.obstacles = Box::new(ObstacleSet::from_shapes(&config.obstacles));

        info!(
            agents = engine.agents.len(),
            obstacles = config.obstacles.len(),
            ray_quality = ?settings.ray_quality,
            "flock spawned"
        );
        Ok(engine)
    }

    /// Build an engine around explicitly placed agents
    ///
    /// Agent ids are reassigned to their pool index.
    pub fn with_agents(settings: FlockSettings, agents: Vec<FlockAgent>) -> Result<Self, FlockError> {
        settings.validate()?;
        let rng = StdRng::seed_from_u64(settings.seed);
        let agents = agents
            .into_iter()
            .enumerate()
            .map(|(id, agent)| FlockAgent { id, ..agent })
            .collect();
        Ok(Self::assemble(settings, agents, rng))
    }

    fn assemble(settings: FlockSettings, agents: Vec<FlockAgent>, rng: StdRng) -> Self {
        let count = agents.len();
        let mut engine = Self {
            settings,
            agents,
            accumulators: vec![NeighborAccumulator::default(); count],
            transforms: Vec::with_capacity(count),
            obstacles: Box::new(ObstacleSet::new()),
            rng,
            frame: 0,
        };
        engine.sync_transforms();
        engine
    }

    /// Replace the obstacle probe used by the avoidance step
    pub fn set_obstacles(&mut self, obstacles: impl ObstacleProbe + 'static) {
        self.obstacles = Box::new(obstacles);
    }

    pub fn settings(&self) -> &FlockSettings {
        &self.settings
    }

    pub fn agents(&self) -> &[FlockAgent] {
        &self.agents
    }

    /// Neighbour aggregates from the most recent step
    pub fn accumulators(&self) -> &[NeighborAccumulator] {
        &self.accumulators
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Number of completed steps
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Transforms in agent id order, refreshed at the end of every step
    pub fn transforms(&self) -> &[AgentTransform] {
        &self.transforms
    }

    /// Raw bytes of [`transforms`](Self::transforms) for upload or export
    pub fn transform_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transforms)
    }

    /// Assign (or clear) the seek target of every agent
    pub fn set_target(&mut self, target: Option<Vec3>) {
        for agent in &mut self.agents {
            agent.target = target;
        }
    }

    /// Assign (or clear) the seek target of one agent
    pub fn set_agent_target(&mut self, id: usize, target: Option<Vec3>) -> Result<(), FlockError> {
        let agent = self
            .agents
            .get_mut(id)
            .ok_or(FlockError::UnknownAgent(id))?;
        agent.target = target;
        Ok(())
    }

    /// Advance the flock by `delta_time` seconds
    ///
    /// With a `water` query and a configured surface constraint, agents are
    /// kept below the water height.
    pub fn step(&mut self, delta_time: f32, water: Option<&dyn WaterHeightQuery>) {
        self.accumulators = scan_neighbors(&self.agents, &self.settings);

        let rays = turn_rays(self.settings.ray_quality);
        let interval = u64::from(self.settings.frame_skip_interval.max(1));
        let mut avoiding = 0usize;

        for (i, agent) in self.agents.iter_mut().enumerate() {
            let accumulator = &mut self.accumulators[i];
            agent.velocity = integrate_velocity(
                agent.velocity,
                accumulator.acceleration,
                delta_time,
                &self.settings,
                &mut self.rng,
            );
            accumulator.acceleration = Vec3::ZERO;

            if (self.frame + i as u64) % interval == 0 {
                if let Some(direction) =
                    avoidance_direction(agent, self.obstacles.as_ref(), rays, &self.settings)
                {
                    let force = steer_towards(
                        agent.velocity,
                        direction,
                        self.settings.max_steer_force,
                        self.settings.max_speed,
                    ) * self.settings.avoid_collision_weight;
                    agent.velocity = integrate_velocity(
                        agent.velocity,
                        force,
                        delta_time,
                        &self.settings,
                        &mut self.rng,
                    );
                    avoiding += 1;
                }
            }
        }

        let integrate_positions = delta_time < self.settings.lag_spike_threshold_s;
        if integrate_positions {
            for agent in &mut self.agents {
                agent.position += agent.velocity * delta_time;
            }
            if let (Some(water), Some(surface)) = (water, self.settings.surface) {
                for agent in &mut self.agents {
                    let ceiling = water.water_height(agent.position) - surface.margin_m;
                    if agent.position.y > ceiling {
                        agent.position.y = ceiling;
                    }
                }
            }
        }

        self.sync_transforms();
        self.frame += 1;
        debug!(
            frame = self.frame,
            avoiding,
            moved = integrate_positions,
            "flock step"
        );
    }

    fn sync_transforms(&mut self) {
        self.transforms.clear();
        self.transforms
            .extend(self.agents.iter().map(FlockAgent::transform));
    }
}

/// Steps 1-4: neighbour aggregates and steering acceleration, per agent in parallel
fn scan_neighbors(agents: &[FlockAgent], settings: &FlockSettings) -> Vec<NeighborAccumulator> {
    let snapshot: Vec<(Vec3, Vec3)> = agents.iter().map(|a| (a.position, a.forward())).collect();
    let perception_sq = settings.perception_radius * settings.perception_radius;
    let avoidance_sq = settings.avoidance_radius * settings.avoidance_radius;

    agents
        .par_iter()
        .enumerate()
        .map(|(i, agent)| {
            let mut acc = NeighborAccumulator::default();
            for (j, &(position, forward)) in snapshot.iter().enumerate() {
                if i == j {
                    continue;
                }
                let offset = position - agent.position;
                let distance_sq = offset.length_squared();
                if distance_sq > 0.0 && distance_sq <= perception_sq {
                    acc.neighbor_count += 1;
                    acc.heading_sum += forward;
                    acc.center_sum += position;
                    if distance_sq <= avoidance_sq {
                        acc.avoidance_sum -= offset / distance_sq;
                    }
                }
            }
            acc.acceleration = steering_acceleration(agent, &acc, settings);
            acc
        })
        .collect()
}

fn steering_acceleration(
    agent: &FlockAgent,
    acc: &NeighborAccumulator,
    settings: &FlockSettings,
) -> Vec3 {
    let steer = |direction: Vec3| {
        steer_towards(
            agent.velocity,
            direction,
            settings.max_steer_force,
            settings.max_speed,
        )
    };

    let mut acceleration = Vec3::ZERO;
    if let Some(target) = agent.target {
        acceleration += steer(target - agent.position) * settings.target_weight;
    }
    if acc.neighbor_count > 0 {
        let center = acc.center_sum / acc.neighbor_count as f32;
        acceleration += steer(acc.heading_sum) * settings.align_weight;
        acceleration += steer(center - agent.position) * settings.cohesion_weight;
        acceleration += steer(acc.avoidance_sum) * settings.separate_weight;
    }
    acceleration
}

/// Step 5: apply acceleration, recover from a dead stop, clamp speed
fn integrate_velocity(
    velocity: Vec3,
    acceleration: Vec3,
    delta_time: f32,
    settings: &FlockSettings,
    rng: &mut StdRng,
) -> Vec3 {
    let mut velocity = velocity + acceleration * delta_time;
    let mut speed = velocity.length();
    if speed == 0.0 || !speed.is_finite() {
        velocity = random_unit_vector(rng);
        speed = 1.0;
    }
    velocity / speed * speed.clamp(settings.min_speed, settings.max_speed)
}

/// Step 6: first unobstructed turn ray, or `None` when the way ahead is clear
fn avoidance_direction(
    agent: &FlockAgent,
    obstacles: &dyn ObstacleProbe,
    rays: &[Vec3],
    settings: &FlockSettings,
) -> Option<Vec3> {
    let forward = agent.forward();
    let probe = |direction: Vec3| {
        obstacles.sphere_cast(
            agent.position,
            direction,
            settings.probe_radius,
            settings.collision_check_distance,
        )
    };
    if !probe(forward) {
        return None;
    }

    let heading = Quat::from_rotation_arc(Vec3::Z, forward);
    let clear = rays
        .iter()
        .map(|ray| heading * *ray)
        .find(|direction| !probe(*direction));
    Some(clear.unwrap_or(forward))
}

/// Uniformly distributed unit vector
fn random_unit_vector(rng: &mut StdRng) -> Vec3 {
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let theta: f32 = rng.gen_range(0.0..2.0 * PI);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}
