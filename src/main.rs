//! Shoalwave - headless spectral ocean with a fish shoal swimming beneath it
//!
//! Runs a fixed number of frames, optionally exporting cascade fields and
//! agent transforms along the way.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec3;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Args;
use shoalwave::export::export_frame;
use shoalwave::params::SceneConfig;
use shoalwave::scene::Scene;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn load_config(args: &Args) -> Result<SceneConfig> {
    let mut config = match &args.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("failed to load scene config {}", path.display()))?,
        None => SceneConfig::default(),
    };
    args.apply_overrides(&mut config);
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = load_config(&args)?;
    if args.dump_config {
        println!("{}", config.to_json().context("failed to serialise config")?);
        return Ok(());
    }

    let exporting = args.exporting(&config);
    let mut scene = Scene::new(&config);
    let last_frame = args.frames.saturating_sub(1);

    info!(frames = args.frames, dt = args.dt, exporting, "simulation starting");
    for frame_num in 0..args.frames {
        scene.step(args.dt);

        if exporting && config.export.should_export(frame_num, last_frame) {
            if frame_num == last_frame {
                scene.flush_readbacks();
            }
            export_frame(&config.export, frame_num, scene.ocean(), scene.flock())
                .with_context(|| format!("failed to export frame {frame_num}"))?;
        }
    }
    scene.flush_readbacks();

    if let Some(ocean) = scene.ocean() {
        info!(
            time_s = ocean.time_s(),
            height_at_origin = ocean.water_height(Vec3::ZERO),
            "ocean finished"
        );
    }
    if let Some(flock) = scene.flock() {
        let mean_speed = if flock.is_empty() {
            0.0
        } else {
            flock.agents().iter().map(|a| a.speed()).sum::<f32>() / flock.len() as f32
        };
        info!(agents = flock.len(), mean_speed, "flock finished");
    }
    Ok(())
}
