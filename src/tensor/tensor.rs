use crate::error::ParseError;

/// A shaped array of `f32`, row-major. Only 1-D and 2-D shapes occur.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Builds a tensor, checking that `data.len() == product(shape)`.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Tensor, ParseError> {
        let Some(expected) = element_count(&shape) else {
            return Err(ParseError::ShapeOverflow { shape });
        };
        if data.len() != expected {
            return Err(ParseError::LengthMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Tensor { shape, data })
    }

    /// # Panics
    /// If the element count of `shape` overflows `usize`.
    pub fn zeros(shape: Vec<usize>) -> Tensor {
        let len = element_count(&shape).unwrap_or_else(|| panic!("shape {:?} overflows usize", shape));
        Tensor { shape, data: vec![0.0; len] }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Product of the dimensions, or `None` if it does not fit in `usize`.
pub(crate) fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}
