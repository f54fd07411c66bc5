pub mod engine;
pub mod session;

pub use engine::InferenceEngine;
pub use session::{EngineState, Session};
