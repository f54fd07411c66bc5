pub mod builder;
pub mod network;

pub use builder::{build_network, validate_layers};
pub use network::{GpuLayer, GpuNetwork, LayerShape};
