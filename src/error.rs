//! Error types for the ocean and flocking subsystems.
//!
//! Setup errors are precondition violations: they abort construction of the
//! affected subsystem. Readback errors are transient and never escalate past
//! a log line.

use thiserror::Error;

/// Errors raised while configuring the spectral ocean pipeline
#[derive(Debug, Error)]
pub enum OceanError {
    /// FFT and cascade grids must be square powers of two
    #[error("resolution must be a power of two, got {0}")]
    NonPowerOfTwo(usize),
    /// At least one cascade is needed to produce any output
    #[error("at least one cascade length scale is required")]
    NoCascades,
    /// Cascade length scales must be positive and strictly descending
    #[error("cascade length scales must be positive and strictly descending, got {0:?}")]
    InvalidLengthScales(Vec<f32>),
    /// A physical constant is outside its valid range
    #[error("invalid wave setting `{name}`: {value}")]
    InvalidSetting { name: &'static str, value: f32 },
    /// A cascade index outside the configured range was requested
    #[error("cascade index {index} out of range (have {count})")]
    CascadeOutOfRange { index: usize, count: usize },
    /// Evolution was requested before the initial spectrum existed
    #[error("cascade spectrum has not been initialised")]
    SpectrumNotReady,
    /// A grid does not match the resolution it is used with
    #[error("grid is {actual}x{actual}, cascade expects {expected}x{expected}")]
    SizeMismatch { expected: usize, actual: usize },
    /// The background readback thread could not be started
    #[error("failed to start readback worker: {0}")]
    ReadbackWorker(#[from] std::io::Error),
}

/// Errors raised while configuring the flocking engine
#[derive(Debug, Error)]
pub enum FlockError {
    /// Speed limits must satisfy `0 < min <= max`
    #[error("invalid speed range: min {min} max {max}")]
    InvalidSpeedRange { min: f32, max: f32 },
    /// Spawn radius range must satisfy `0 <= min <= max`
    #[error("invalid spawn radius range: min {min} max {max}")]
    InvalidSpawnRadius { min: f32, max: f32 },
    /// A radius, distance or force is negative or not finite
    #[error("invalid flock setting `{name}`: {value}")]
    InvalidSetting { name: &'static str, value: f32 },
    /// Agent id outside the pool
    #[error("agent {0} does not exist")]
    UnknownAgent(usize),
}

/// Transient failures of the asynchronous displacement readback
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReadbackError {
    /// The copied buffer held NaN or infinite texels
    #[error("readback {id} contained non-finite texels")]
    NonFinite { id: u64 },
    /// The copied buffer did not match the expected texel count
    #[error("readback {id} returned {actual} texels, expected {expected}")]
    SizeMismatch {
        id: u64,
        expected: usize,
        actual: usize,
    },
    /// The readback worker is gone
    #[error("readback worker disconnected")]
    Disconnected,
}

/// Errors raised while loading scene configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while exporting fields or transforms to disk
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("ocean error during export: {0}")]
    Ocean(#[from] OceanError),
}
