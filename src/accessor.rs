//! Per-row or constant visual values attached to each feature of a layer.
//!
//! Callers hand in loosely typed [`AccessorInput`]s. They are resolved once, against the
//! [`AccessorKind`] declared by the layer schema, into a normalized [`Accessor`]:
//!
//! - colors become `[u8; 4]` constants or `FixedSizeList<UInt8, 4>` arrays
//! - floats become `f32` constants or `Float32` arrays

use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, Int64Type};
use arrow_array::{Array, ArrayRef, FixedSizeListArray, Float32Array, UInt8Array};
use arrow_cast::cast;
use arrow_data::ArrayData;
use arrow_schema::{DataType, Field};
use serde::{Deserialize, Serialize};

use crate::error::{LayerError, Result};

/// The value domain of an accessor field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorKind {
    /// RGBA color, four channels in 0–255.
    Color,
    /// Non-negative, finite 32-bit float.
    Float,
}

impl AccessorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessorKind::Color => "color",
            AccessorKind::Float => "float",
        }
    }

    /// The Arrow data type of a per-row accessor of this kind.
    pub fn data_type(&self) -> DataType {
        match self {
            AccessorKind::Color => DataType::FixedSizeList(color_field(), 4),
            AccessorKind::Float => DataType::Float32,
        }
    }
}

/// A single normalized accessor value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarValue {
    Color([u8; 4]),
    Float(f32),
}

impl ScalarValue {
    pub fn kind(&self) -> AccessorKind {
        match self {
            ScalarValue::Color(_) => AccessorKind::Color,
            ScalarValue::Float(_) => AccessorKind::Float,
        }
    }
}

/// An accessor resolved against its field: either one value for every row, or one value per
/// row.
#[derive(Debug, Clone)]
pub enum Accessor {
    Constant(ScalarValue),
    PerRow(ArrayRef),
}

impl Accessor {
    /// The number of values, or `None` for constants.
    pub fn len(&self) -> Option<usize> {
        match self {
            Accessor::Constant(_) => None,
            Accessor::PerRow(array) => Some(array.len()),
        }
    }

    pub fn kind(&self) -> AccessorKind {
        match self {
            Accessor::Constant(value) => value.kind(),
            Accessor::PerRow(array) => match array.data_type() {
                DataType::FixedSizeList(_, _) => AccessorKind::Color,
                _ => AccessorKind::Float,
            },
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Accessor::Constant(_))
    }

    pub fn as_constant(&self) -> Option<&ScalarValue> {
        match self {
            Accessor::Constant(value) => Some(value),
            Accessor::PerRow(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Accessor::Constant(_) => None,
            Accessor::PerRow(array) => Some(array),
        }
    }

    /// Zero-copy slice of a per-row accessor. Constants are returned unchanged.
    pub fn slice(&self, offset: usize, length: usize) -> Self {
        match self {
            Accessor::Constant(value) => Accessor::Constant(*value),
            Accessor::PerRow(array) => Accessor::PerRow(array.slice(offset, length)),
        }
    }

    /// Bytes occupied by the rows this accessor references. Constants count as zero.
    pub fn nbytes(&self) -> Result<usize> {
        match self {
            Accessor::Constant(_) => Ok(0),
            Accessor::PerRow(array) => array_nbytes(&array.to_data()),
        }
    }
}

impl PartialEq for Accessor {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Accessor::Constant(a), Accessor::Constant(b)) => a == b,
            (Accessor::PerRow(a), Accessor::PerRow(b)) => a.to_data() == b.to_data(),
            _ => false,
        }
    }
}

/// Bytes referenced by a possibly sliced array.
pub(crate) fn array_nbytes(data: &ArrayData) -> Result<usize> {
    Ok(data.get_slice_memory_size()?)
}

/// An accessor value as supplied by the caller, before it is checked against a field.
#[derive(Debug, Clone)]
pub enum AccessorInput {
    /// One color for every row; 3 or 4 channels.
    Color(Vec<i64>),
    /// One number for every row.
    Float(f64),
    /// One color per row.
    Colors(Vec<Vec<i64>>),
    /// One number per row.
    Floats(Vec<f64>),
    /// A ready-made Arrow array with one value per row.
    Array(ArrayRef),
}

impl AccessorInput {
    pub fn color(channels: impl Into<Vec<i64>>) -> Self {
        Self::Color(channels.into())
    }

    pub fn float(value: f64) -> Self {
        Self::Float(value)
    }

    pub fn colors<C: Into<Vec<i64>>>(rows: impl IntoIterator<Item = C>) -> Self {
        Self::Colors(rows.into_iter().map(Into::into).collect())
    }

    pub fn floats(values: impl Into<Vec<f64>>) -> Self {
        Self::Floats(values.into())
    }

    pub fn array(array: ArrayRef) -> Self {
        Self::Array(array)
    }

    /// Resolve this input into a normalized accessor for a field of the given kind.
    ///
    /// # Errors
    ///
    /// - [`LayerError::IncorrectType`] if the input cannot describe a value of `kind`
    /// - [`LayerError::InvalidRange`] if any value falls outside the domain of `kind`
    pub fn resolve(&self, field: &str, kind: AccessorKind) -> Result<Accessor> {
        match (kind, self) {
            (AccessorKind::Color, AccessorInput::Color(channels)) => {
                Ok(Accessor::Constant(ScalarValue::Color(to_rgba(field, channels)?)))
            }
            (AccessorKind::Color, AccessorInput::Colors(rows)) => {
                let mut values = Vec::with_capacity(rows.len() * 4);
                for row in rows {
                    values.extend_from_slice(&to_rgba(field, row)?);
                }
                Ok(Accessor::PerRow(Arc::new(color_array(values))))
            }
            (AccessorKind::Color, AccessorInput::Array(array)) => {
                Ok(Accessor::PerRow(Arc::new(color_array_from_arrow(field, array)?)))
            }
            (AccessorKind::Float, AccessorInput::Float(value)) => {
                Ok(Accessor::Constant(ScalarValue::Float(to_f32(field, *value)?)))
            }
            (AccessorKind::Float, AccessorInput::Floats(values)) => {
                let values = values
                    .iter()
                    .map(|value| to_f32(field, *value))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Accessor::PerRow(Arc::new(Float32Array::from(values))))
            }
            (AccessorKind::Float, AccessorInput::Array(array)) => {
                Ok(Accessor::PerRow(Arc::new(float_array_from_arrow(field, array)?)))
            }
            (AccessorKind::Color, _) => Err(LayerError::IncorrectType(
                format!("{} expects a color or a list of colors", field).into(),
            )),
            (AccessorKind::Float, _) => Err(LayerError::IncorrectType(
                format!("{} expects a number or a list of numbers", field).into(),
            )),
        }
    }
}

impl From<f64> for AccessorInput {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<f64>> for AccessorInput {
    fn from(value: Vec<f64>) -> Self {
        Self::Floats(value)
    }
}

impl From<ArrayRef> for AccessorInput {
    fn from(value: ArrayRef) -> Self {
        Self::Array(value)
    }
}

impl From<ScalarValue> for AccessorInput {
    fn from(value: ScalarValue) -> Self {
        match value {
            ScalarValue::Color(rgba) => Self::Color(rgba.iter().map(|c| *c as i64).collect()),
            ScalarValue::Float(value) => Self::Float(value as f64),
        }
    }
}

fn color_field() -> Arc<Field> {
    Arc::new(Field::new("item", DataType::UInt8, false))
}

fn color_array(values: Vec<u8>) -> FixedSizeListArray {
    FixedSizeListArray::new(color_field(), 4, Arc::new(UInt8Array::from(values)), None)
}

fn invalid(field: &str, reason: impl Into<String>) -> LayerError {
    LayerError::InvalidRange {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn to_rgba(field: &str, channels: &[i64]) -> Result<[u8; 4]> {
    if !matches!(channels.len(), 3 | 4) {
        return Err(invalid(
            field,
            format!("a color needs 3 or 4 channels, got {}", channels.len()),
        ));
    }
    let mut rgba = [u8::MAX; 4];
    for (out, channel) in rgba.iter_mut().zip(channels) {
        *out = u8::try_from(*channel).map_err(|_| {
            invalid(
                field,
                format!("color channel {} is outside 0-255", channel),
            )
        })?;
    }
    Ok(rgba)
}

fn to_f32(field: &str, value: f64) -> Result<f32> {
    let value32 = value as f32;
    if value.is_nan() || !value32.is_finite() {
        return Err(invalid(field, format!("{} is not a finite number", value)));
    }
    if value < 0.0 {
        return Err(invalid(field, format!("{} is negative", value)));
    }
    Ok(value32)
}

fn color_array_from_arrow(field: &str, array: &ArrayRef) -> Result<FixedSizeListArray> {
    let list = array.as_fixed_size_list_opt().ok_or_else(|| {
        LayerError::IncorrectType(
            format!(
                "{} expects a FixedSizeList of color channels, got {}",
                field,
                array.data_type()
            )
            .into(),
        )
    })?;
    let size = list.value_length() as usize;
    if !matches!(size, 3 | 4) {
        return Err(invalid(
            field,
            format!("a color needs 3 or 4 channels, got {}", size),
        ));
    }
    if !list.values().data_type().is_integer() {
        return Err(LayerError::IncorrectType(
            format!("{} color channels must be integers", field).into(),
        ));
    }
    if list.null_count() > 0 || list.values().null_count() > 0 {
        return Err(invalid(field, "colors may not contain nulls"));
    }

    let channels = cast(list.values(), &DataType::Int64)?;
    let channels = channels.as_primitive::<Int64Type>();
    // The input has no nulls, so any null here is a value too wide for Int64.
    if channels.null_count() > 0 {
        return Err(invalid(field, "color channel is outside 0-255"));
    }
    let mut values = Vec::with_capacity(list.len() * 4);
    for row in channels.values().chunks_exact(size).take(list.len()) {
        values.extend_from_slice(&to_rgba(field, row)?);
    }
    Ok(color_array(values))
}

fn float_array_from_arrow(field: &str, array: &ArrayRef) -> Result<Float32Array> {
    if !array.data_type().is_numeric() {
        return Err(LayerError::IncorrectType(
            format!("{} expects numbers, got {}", field, array.data_type()).into(),
        ));
    }
    if array.null_count() > 0 {
        return Err(invalid(field, "values may not be null"));
    }
    let values = cast(array, &DataType::Float32)?;
    let values = values.as_primitive::<Float32Type>();
    for value in values.values().iter() {
        to_f32(field, *value as f64)?;
    }
    Ok(values.clone())
}
