pub mod config;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod loader;
pub mod network;
pub mod postprocess;
pub mod preprocess;
pub mod tensor;

// Convenience re-exports
pub use config::EngineConfig;
pub use engine::{EngineState, InferenceEngine, Session};
pub use error::{EngineError, LoadCause, LoadError, ParseError, PreprocessError};
pub use gpu::{DeviceInfo, GpuContext};
pub use loader::{load_layers, DirSource, LayerTensors, MemorySource, WeightSource, LAYER_COUNT};
pub use network::{build_network, validate_layers, GpuNetwork, LayerShape};
pub use postprocess::{argmax, softmax, NetworkStats, Prediction, PredictionResult, DIGIT_CLASSES};
pub use preprocess::{preprocess, Grid, Surface, GRID_SIZE};
pub use tensor::{encode_tensor, parse_tensor, Tensor};
