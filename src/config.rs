use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Largest work-group size every WebGPU-class device is required to support.
pub const MAX_WORKGROUP_SIZE: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PowerPreference {
    #[default]
    HighPerformance,
    LowPower,
}

impl From<PowerPreference> for wgpu::PowerPreference {
    fn from(value: PowerPreference) -> Self {
        match value {
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
        }
    }
}

/// Engine and host settings. Every field has a default so partial JSON files
/// (or none at all) are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding `layer{N}.weight.npy` / `layer{N}.bias.npy`.
    pub weights_dir: PathBuf,
    pub power_preference: PowerPreference,
    /// Accept CPU/software adapters. Off by default: such adapters are not a
    /// compute-capable device for the capability gate.
    pub allow_software_adapter: bool,
    /// Invocations per work-group for the dense-layer program.
    pub workgroup_size: u32,
    /// Side length of the drawing surface fed to the preprocessor.
    pub canvas_size: u32,
    /// Address the studio server binds to.
    pub bind_addr: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            weights_dir: PathBuf::from("assets/mnist-weights"),
            power_preference: PowerPreference::HighPerformance,
            allow_software_adapter: false,
            workgroup_size: 64,
            canvas_size: 280,
            bind_addr: "127.0.0.1:7878".to_owned(),
        }
    }
}

impl EngineConfig {
    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.workgroup_size == 0 || self.workgroup_size > MAX_WORKGROUP_SIZE {
            return Err(EngineError::Config(format!(
                "workgroup_size must be in 1..={}, got {}",
                MAX_WORKGROUP_SIZE, self.workgroup_size
            )));
        }
        if self.canvas_size == 0 {
            return Err(EngineError::Config("canvas_size must be non-zero".to_owned()));
        }
        Ok(())
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Deserializes a config from a JSON file; missing fields take defaults.
    pub fn load_json(path: &str) -> std::io::Result<EngineConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
