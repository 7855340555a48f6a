//! Named parameter tensors owned by layers

use crate::{Error, Result};
use ndarray::{Array1, ArrayView2};

/// A named, shaped numeric tensor owned by exactly one layer.
///
/// Storage is a flat `f32` buffer plus an explicit shape. The identity of a
/// variable (name and shape) is stable across save/load; only the buffer
/// contents change during weight assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    shape: Vec<usize>,
    data: Array1<f32>,
}

impl Variable {
    /// Create a variable filled with zeros
    pub fn zeros(name: impl Into<String>, shape: Vec<usize>) -> Self {
        let len: usize = shape.iter().product();
        Self {
            name: name.into(),
            shape,
            data: Array1::zeros(len),
        }
    }

    /// Create a variable from a flat buffer; the buffer length must match the shape
    pub fn from_vec(name: impl Into<String>, shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let name = name.into();
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(Error::ShapeMismatch {
                name,
                expected: shape,
                got: vec![data.len()],
            });
        }
        Ok(Self {
            name,
            shape,
            data: Array1::from(data),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get reference to the flat data buffer
    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Replace the buffer contents in place.
    ///
    /// The stored shape must agree with this variable's live shape; the
    /// variable is left untouched on error.
    pub fn assign(&mut self, shape: &[usize], data: Vec<f32>) -> Result<()> {
        if shape != self.shape.as_slice() || data.len() != self.data.len() {
            return Err(Error::ShapeMismatch {
                name: self.name.clone(),
                expected: self.shape.clone(),
                got: shape.to_vec(),
            });
        }
        self.data = Array1::from(data);
        Ok(())
    }

    /// View the buffer as a 2-D matrix; fails unless the shape has rank 2
    pub fn view_2d(&self) -> Result<ArrayView2<'_, f32>> {
        if self.shape.len() != 2 {
            return Err(Error::Graph(format!(
                "variable `{}` has rank {}, expected rank 2",
                self.name,
                self.shape.len()
            )));
        }
        let slice = self
            .data
            .as_slice()
            .ok_or_else(|| Error::Graph(format!("variable `{}` is not contiguous", self.name)))?;
        ArrayView2::from_shape((self.shape[0], self.shape[1]), slice)
            .map_err(|e| Error::Graph(format!("variable `{}` reshape failed: {e}", self.name)))
    }
}
