pub mod prediction;

pub use prediction::{argmax, softmax, NetworkStats, Prediction, PredictionResult, DIGIT_CLASSES};
