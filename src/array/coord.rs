//! Interleaved coordinate storage, the innermost level of every GeoArrow native array.

use std::sync::Arc;

use arrow_array::{Array, FixedSizeListArray, Float64Array};
use arrow_buffer::{NullBuffer, ScalarBuffer};
use arrow_schema::{DataType, Field};

use crate::datatypes::Dimension;
use crate::error::{LayerError, Result};

/// An array of coordinates stored interleaved (`xyxyxy` or `xyzxyz`) in a single buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct InterleavedCoordBuffer {
    pub(crate) coords: ScalarBuffer<f64>,
    pub(crate) dim: Dimension,
}

fn check(coords: &ScalarBuffer<f64>, dim: Dimension) -> Result<()> {
    if coords.len() % dim.size() != 0 {
        return Err(LayerError::General(format!(
            "coordinate buffer length {} is not a multiple of {}",
            coords.len(),
            dim.size()
        )));
    }

    Ok(())
}

impl InterleavedCoordBuffer {
    /// Construct a new InterleavedCoordBuffer
    ///
    /// # Errors
    ///
    /// - if the buffer length is not a multiple of the dimension size
    pub fn try_new(coords: ScalarBuffer<f64>, dim: Dimension) -> Result<Self> {
        check(&coords, dim)?;
        Ok(Self { coords, dim })
    }

    pub fn dim(&self) -> Dimension {
        self.dim
    }

    /// Number of coordinates (not values).
    pub fn len(&self) -> usize {
        self.coords.len() / self.dim.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> &[f64] {
        self.coords.as_ref()
    }

    pub fn get_x(&self, i: usize) -> f64 {
        self.coords[i * self.dim.size()]
    }

    pub fn get_y(&self, i: usize) -> f64 {
        self.coords[i * self.dim.size() + 1]
    }

    pub fn values_field(&self) -> Field {
        match self.dim {
            Dimension::XY => Field::new("xy", DataType::Float64, false),
            Dimension::XYZ => Field::new("xyz", DataType::Float64, false),
        }
    }

    /// Zero-copy slice of `length` coordinates starting at coordinate `offset`.
    pub fn slice(&self, offset: usize, length: usize) -> Self {
        assert!(
            offset + length <= self.len(),
            "offset + length may not exceed length of array"
        );
        let size = self.dim.size();
        Self {
            coords: self.coords.slice(offset * size, length * size),
            dim: self.dim,
        }
    }

    /// Like [`Self::slice`] but copies the values into a new, compact buffer.
    pub fn owned_slice(&self, offset: usize, length: usize) -> Self {
        let sliced = self.slice(offset, length);
        Self {
            coords: sliced.coords.to_vec().into(),
            dim: self.dim,
        }
    }

    pub fn nbytes(&self) -> usize {
        self.coords.len() * std::mem::size_of::<f64>()
    }

    pub fn into_arrow(self) -> FixedSizeListArray {
        self.into_arrow_with_nulls(None)
    }

    /// Export as a `FixedSizeList` carrying a validity buffer, the layout of a point column.
    pub fn into_arrow_with_nulls(self, nulls: Option<NullBuffer>) -> FixedSizeListArray {
        FixedSizeListArray::new(
            Arc::new(self.values_field()),
            self.dim.size() as i32,
            Arc::new(Float64Array::new(self.coords, None)),
            nulls,
        )
    }
}

impl TryFrom<&FixedSizeListArray> for InterleavedCoordBuffer {
    type Error = LayerError;

    fn try_from(value: &FixedSizeListArray) -> Result<Self> {
        let dim = Dimension::try_from(value.value_length() as usize)?;
        let values = value
            .values()
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or(LayerError::IncorrectType(
                "coordinate values must be Float64".into(),
            ))?;
        // Slicing a FixedSizeListArray slices its child, so the values start at this array's
        // first coordinate.
        let coords = values.values().slice(0, value.len() * dim.size());
        Self::try_new(coords, dim)
    }
}
