//! Writing cascade fields and agent transforms to disk.
//!
//! Fields become 8-bit PNGs normalised per image; transforms are dumped as
//! raw `AgentTransform` records in native byte order.

use glam::Vec3;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::ExportError;
use crate::flock::FlockEngine;
use crate::grid::Grid;
use crate::ocean::OceanSurface;
use crate::params::ExportConfig;

/// Write every output of the frame that `config` selects
pub fn export_frame(
    config: &ExportConfig,
    frame_num: usize,
    ocean: Option<&OceanSurface>,
    flock: Option<&FlockEngine>,
) -> Result<(), ExportError> {
    if let Some(ocean) = ocean {
        let dir = config.fields_dir();
        fs::create_dir_all(&dir)?;
        for index in 0..ocean.cascade_count() {
            let outputs = ocean.cascade_outputs(index)?;
            let size = outputs.displacement.size() as u32;

            let displacement = format!("{dir}/cascade{index}_displacement_{frame_num:05}.png");
            image::save_buffer(
                &displacement,
                &displacement_rgb(&outputs.displacement),
                size,
                size,
                image::ColorType::Rgb8,
            )?;

            let turbulence = format!("{dir}/cascade{index}_turbulence_{frame_num:05}.png");
            image::save_buffer(
                &turbulence,
                &turbulence_gray(&outputs.turbulence),
                size,
                size,
                image::ColorType::L8,
            )?;
        }
    }

    if let Some(flock) = flock {
        fs::create_dir_all(&config.output_dir)?;
        write_transforms(config.transforms_path(frame_num), flock.transform_bytes())?;
    }

    debug!(frame = frame_num, dir = %config.output_dir, "frame exported");
    Ok(())
}

/// Displacement as RGB, each channel mapped from `[-max|c|, max|c|]` to `[0, 255]`
pub fn displacement_rgb(field: &Grid<Vec3>) -> Vec<u8> {
    let extent = field
        .as_slice()
        .iter()
        .fold(Vec3::ZERO, |acc, d| acc.max(d.abs()));
    let to_byte = |value: f32, max: f32| {
        if max > 0.0 {
            ((value / max * 0.5 + 0.5) * 255.0).round().clamp(0.0, 255.0) as u8
        } else {
            128
        }
    };

    field
        .as_slice()
        .iter()
        .flat_map(|d| {
            [
                to_byte(d.x, extent.x),
                to_byte(d.y, extent.y),
                to_byte(d.z, extent.z),
            ]
        })
        .collect()
}

/// Foam intensity in `[0, 1]` as grayscale
pub fn turbulence_gray(field: &Grid<f32>) -> Vec<u8> {
    field
        .as_slice()
        .iter()
        .map(|t| (t.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect()
}

pub fn write_transforms(path: impl AsRef<Path>, bytes: &[u8]) -> Result<(), ExportError> {
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_displacement_normalisation() {
        let field = Grid::from_vec(
            2,
            vec![
                Vec3::new(-2.0, 0.0, 1.0),
                Vec3::new(2.0, 0.0, -1.0),
                Vec3::ZERO,
                Vec3::new(1.0, 0.0, 0.0),
            ],
        )
        .unwrap();
        let bytes = displacement_rgb(&field);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..3], &[0, 128, 255]);
        assert_eq!(&bytes[3..6], &[255, 128, 0]);
        assert_eq!(bytes[9], 191);
    }

    #[test]
    fn test_turbulence_gray() {
        let field = Grid::from_vec(2, vec![0.0, 1.0, 0.5, 2.0]).unwrap();
        assert_eq!(turbulence_gray(&field), vec![0, 255, 128, 255]);
    }
}
