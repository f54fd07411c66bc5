use thiserror::Error;

/// Failure to decode a serialized tensor file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("tensor file too short: need at least {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("tensor header is not valid ASCII/UTF-8")]
    HeaderEncoding,

    #[error("no `shape` tuple found in tensor header: {header:?}")]
    MissingShape { header: String },

    #[error("unsupported element type {descr:?}, expected '<f4'")]
    UnsupportedDtype { descr: String },

    #[error("shape {shape:?} has more elements than fit in memory")]
    ShapeOverflow { shape: Vec<usize> },

    #[error("fortran-ordered tensors are not supported")]
    FortranOrder,

    #[error("payload of {bytes} bytes is not a whole number of f32 values")]
    RaggedPayload { bytes: usize },

    #[error("data length {actual} does not match shape {shape:?} (expected {expected})")]
    LengthMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
}

/// Why a single weight file could not be loaded.
#[derive(Debug, Error)]
pub enum LoadCause {
    #[error("fetch failed: {0}")]
    Fetch(#[source] std::io::Error),

    #[error("parse failed: {0}")]
    Parse(#[source] ParseError),
}

/// A weight file failed to fetch or parse; the whole load is aborted.
#[derive(Debug, Error)]
#[error("failed to load {file}: {cause}")]
pub struct LoadError {
    pub file: String,
    pub cause: LoadCause,
}

impl LoadError {
    pub fn is_fetch(&self) -> bool {
        matches!(self.cause, LoadCause::Fetch(_))
    }

    pub fn is_parse(&self) -> bool {
        matches!(self.cause, LoadCause::Parse(_))
    }
}

/// Invalid drawing-surface input.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("surface side must be non-zero")]
    EmptySurface,

    #[error("surface of side {side} needs {expected} RGBA bytes, got {actual}")]
    SurfaceLength {
        side: usize,
        expected: usize,
        actual: usize,
    },
}

/// All errors surfaced by the inference engine and its session.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("layer {layer}: weights shape {weights:?} is inconsistent with biases shape {biases:?}")]
    ShapeMismatch {
        layer: usize,
        weights: Vec<usize>,
        biases: Vec<usize>,
    },

    #[error("input has {actual} values, network expects {expected}")]
    InputShape { expected: usize, actual: usize },

    #[error("network produces {actual} outputs, expected {expected}")]
    OutputWidth { expected: usize, actual: usize },

    #[error("no compute-capable device: {0}")]
    UnsupportedDevice(String),

    #[error("an inference is already in flight")]
    Busy,

    #[error("device error: {0}")]
    Device(String),

    #[error("operation not allowed in state {state}")]
    InvalidState { state: String },

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// Construction-time failures never leave a usable network behind.
    pub fn is_construction_error(&self) -> bool {
        matches!(self, EngineError::Load(_) | EngineError::ShapeMismatch { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
