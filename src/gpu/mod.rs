pub mod context;
pub mod shader;

pub use context::{DeviceInfo, GpuContext};
pub use shader::DenseProgram;
