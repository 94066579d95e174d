//! Field and transform export configuration.

use serde::{Deserialize, Serialize};

/// Export mode configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output directory for field images and transform dumps
    pub output_dir: String,

    /// Export every N frames (0 disables periodic export)
    pub every_frames: usize,

    /// Export the final frame regardless of `every_frames`
    pub final_frame: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: "export".to_string(),
            every_frames: 0,
            final_frame: false,
        }
    }
}

impl ExportConfig {
    pub fn new(output_dir: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            final_frame: true,
            ..Self::default()
        }
    }

    /// Whether frame `frame_num` should be exported
    pub fn should_export(&self, frame_num: usize, last_frame: usize) -> bool {
        let periodic = self.every_frames > 0 && frame_num % self.every_frames == 0;
        periodic || (self.final_frame && frame_num == last_frame)
    }

    /// Field image directory path
    pub fn fields_dir(&self) -> String {
        format!("{}/fields", self.output_dir)
    }

    /// Agent transform dump path for a frame
    pub fn transforms_path(&self, frame_num: usize) -> String {
        format!("{}/agents_{:05}.bin", self.output_dir, frame_num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_export() {
        let config = ExportConfig {
            every_frames: 10,
            final_frame: true,
            ..Default::default()
        };
        assert!(config.should_export(0, 99));
        assert!(config.should_export(20, 99));
        assert!(!config.should_export(21, 99));
        assert!(config.should_export(99, 99));

        let disabled = ExportConfig::default();
        assert!(!disabled.should_export(0, 5));
        assert!(!disabled.should_export(5, 5));
    }
}
