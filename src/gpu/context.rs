use serde::Serialize;
use tracing::{info, warn};
use wgpu::{DeviceType, DownlevelFlags, Features};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Features requested when the adapter offers them; absence is not an error.
const OPTIONAL_FEATURES: Features = Features::SUBGROUP.union(Features::TIMESTAMP_QUERY);

/// Adapter description exposed to callers (status pages, logs).
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub backend: String,
    pub device_type: String,
    pub subgroups: bool,
    pub timestamp_query: bool,
}

/// A compute-capable device and its single submission queue.
///
/// All work for one network goes through `queue`, which executes submissions
/// in order; layer sequencing relies on that.
#[derive(Debug)]
pub struct GpuContext {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    info: DeviceInfo,
}

impl GpuContext {
    /// Probes for a compute-capable adapter and opens a device on it.
    ///
    /// Fails with `UnsupportedDevice` when no adapter exists, when the only
    /// adapter is a software rasterizer and `allow_software_adapter` is off,
    /// or when the adapter cannot run compute shaders.
    pub async fn probe(config: &EngineConfig) -> Result<GpuContext> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference.into(),
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| EngineError::UnsupportedDevice("no adapter available".to_owned()))?;

        let adapter_info = adapter.get_info();
        if adapter_info.device_type == DeviceType::Cpu && !config.allow_software_adapter {
            warn!(adapter = %adapter_info.name, "refusing software adapter");
            return Err(EngineError::UnsupportedDevice(format!(
                "only a software adapter is available ({})",
                adapter_info.name
            )));
        }

        let downlevel = adapter.get_downlevel_capabilities();
        if !downlevel.flags.contains(DownlevelFlags::COMPUTE_SHADERS) {
            return Err(EngineError::UnsupportedDevice(format!(
                "adapter {} does not support compute shaders",
                adapter_info.name
            )));
        }

        let features = adapter.features() & OPTIONAL_FEATURES;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("ferrite-digit device"),
                    required_features: features,
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|err| {
                EngineError::UnsupportedDevice(format!(
                    "unable to open device on adapter {}: {}",
                    adapter_info.name, err
                ))
            })?;

        let info = DeviceInfo {
            name: adapter_info.name.clone(),
            backend: format!("{:?}", adapter_info.backend),
            device_type: format!("{:?}", adapter_info.device_type),
            subgroups: features.contains(Features::SUBGROUP),
            timestamp_query: features.contains(Features::TIMESTAMP_QUERY),
        };
        info!(?adapter_info, subgroups = info.subgroups, "using adapter");

        Ok(GpuContext { device, queue, info })
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }
}
