pub mod source;
pub mod weights;

pub use source::{DirSource, MemorySource, WeightSource};
pub use weights::{load_layers, tensor_file_name, LayerTensors, TensorKind, LAYER_COUNT};
