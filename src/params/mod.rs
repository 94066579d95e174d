//! Parameter definitions with physical units and documented semantics.
//!
//! All tunables are collected here with:
//! - Physical units (meters, seconds, rad/m, etc.)
//! - Documented ranges and meanings
//! - Serde defaults so partial JSON files are valid

mod export;
mod flock;
mod ocean;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

// Re-export all types
pub use export::ExportConfig;
pub use flock::{
    FlockConfig, FlockSettings, ObstacleShape, RayQuality, SpawnSettings, SurfaceConstraint,
};
pub use ocean::{
    compute_cascade_boundary, compute_cascade_cutoffs, jonswap_alpha, jonswap_peak_frequency,
    CascadeConfig, DisplaySpectrumSettings, FoamSettings, SpectrumSettings, WaveSettings,
    CUTOFF_MAX, CUTOFF_MIN,
};

/// Ocean configuration: cascade layout plus wave settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OceanConfig {
    pub cascades: CascadeConfig,
    pub waves: WaveSettings,
}

/// Top-level scene configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub ocean: OceanConfig,
    pub flock: FlockConfig,
    pub export: ExportConfig,
}

impl SceneConfig {
    /// Load a scene configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse a scene configuration from JSON text; missing fields use defaults
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
