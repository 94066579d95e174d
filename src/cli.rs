//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

use shoalwave::params::{ExportConfig, SceneConfig};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "shoalwave")]
#[command(about = "Headless spectral ocean and fish flock simulation", long_about = None)]
pub struct Args {
    /// Scene configuration file (JSON); defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of frames to simulate
    #[arg(long, value_name = "N", default_value = "600")]
    pub frames: usize,

    /// Fixed frame time (seconds)
    #[arg(long, value_name = "SECONDS", default_value = "0.016666668")]
    pub dt: f32,

    /// Override the number of spawned agents
    #[arg(long, value_name = "N")]
    pub agents: Option<usize>,

    /// Override both the noise seed and the flock seed
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Write fields and transforms to this directory
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<String>,

    /// Export every N frames (requires --export-dir)
    #[arg(long, value_name = "N")]
    pub export_every: Option<usize>,

    /// Recompute initial spectra every frame
    #[arg(long)]
    pub recalculate_initials: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub dump_config: bool,
}

impl Args {
    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut SceneConfig) {
        if let Some(count) = self.agents {
            config.flock.spawn.count = count;
        }
        if let Some(seed) = self.seed {
            config.ocean.cascades.noise_seed = seed;
            config.flock.settings.seed = seed;
        }
        if let Some(dir) = &self.export_dir {
            config.export = ExportConfig {
                every_frames: config.export.every_frames,
                ..ExportConfig::new(dir.clone())
            };
        }
        if let Some(every) = self.export_every {
            config.export.every_frames = every;
        }
        if self.recalculate_initials {
            config.ocean.cascades.always_recalculate_initials = true;
        }
    }

    /// Whether any export was requested
    pub fn exporting(&self, config: &SceneConfig) -> bool {
        self.export_dir.is_some() || config.export.every_frames > 0 || config.export.final_frame
    }
}
