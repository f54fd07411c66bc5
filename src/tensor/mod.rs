pub mod npy;
pub mod tensor;

pub use npy::{encode_tensor, parse_tensor};
pub use tensor::Tensor;
