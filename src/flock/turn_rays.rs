//! Precomputed obstacle-avoidance directions.
//!
//! Golden-ratio spiral over the unit sphere, ordered from straight ahead
//! (`+Z`) to straight behind. Agents rotate the set into their own heading.

use glam::Vec3;
use std::f32::consts::PI;
use std::sync::OnceLock;

use crate::params::RayQuality;

static LOW: OnceLock<Vec<Vec3>> = OnceLock::new();
static MEDIUM: OnceLock<Vec<Vec3>> = OnceLock::new();
static HIGH: OnceLock<Vec<Vec3>> = OnceLock::new();

/// Shared direction set for `quality`, built on first use
pub fn turn_rays(quality: RayQuality) -> &'static [Vec3] {
    let cell = match quality {
        RayQuality::Low => &LOW,
        RayQuality::Medium => &MEDIUM,
        RayQuality::High => &HIGH,
    };
    cell.get_or_init(|| golden_spiral(quality.sample_count()))
}

/// `count` near-uniform unit vectors: `t = i / count`,
/// inclination `acos(1 - 2t)`, azimuth `2π φ i`
pub fn golden_spiral(count: usize) -> Vec<Vec3> {
    let golden_ratio = (1.0 + 5f32.sqrt()) / 2.0;
    let angle_increment = 2.0 * PI * golden_ratio;

    (0..count)
        .map(|i| {
            let t = i as f32 / count as f32;
            let inclination = (1.0 - 2.0 * t).acos();
            let azimuth = angle_increment * i as f32;
            Vec3::new(
                inclination.sin() * azimuth.cos(),
                inclination.sin() * azimuth.sin(),
                inclination.cos(),
            )
        })
        .collect()
}
