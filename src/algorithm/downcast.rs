use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::{
    Float64Type, Int16Type, Int32Type, Int64Type, UInt16Type, UInt32Type, UInt64Type,
};
use arrow_array::{Array, RecordBatch};
use arrow_cast::cast;
use arrow_schema::{DataType, Field, Schema};

use crate::error::Result;

/// If possible, convert the columns of this batch to smaller data types without losing
/// precision.
///
/// Conversions include:
///
/// - signed integers -> the smallest signed integer type holding the column's min and max
/// - unsigned integers -> the smallest unsigned integer type holding the column's max
/// - `Float64` -> `Float32` when every value round-trips exactly
///
/// Column names, nullability and field metadata are preserved. Non-numeric columns are
/// returned as-is.
pub fn auto_downcast(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut columns = Vec::with_capacity(batch.num_columns());

    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        match downcasted_data_type(column.as_ref()) {
            Some(data_type) if &data_type != column.data_type() => {
                log::debug!(
                    "Downcasting column {} from {} to {}",
                    field.name(),
                    column.data_type(),
                    data_type
                );
                columns.push(cast(column, &data_type)?);
                fields.push(Arc::new(Field::clone(field).with_data_type(data_type)));
            }
            _ => {
                columns.push(column.clone());
                fields.push(field.clone());
            }
        }
    }

    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

/// The smallest lossless data type for this array, or `None` for non-numeric arrays.
pub fn downcasted_data_type(array: &dyn Array) -> Option<DataType> {
    match array.data_type() {
        DataType::Int16 => Some(signed_type(int_range(
            array.as_primitive::<Int16Type>().iter().flatten().map(i64::from),
        ))),
        DataType::Int32 => Some(signed_type(int_range(
            array.as_primitive::<Int32Type>().iter().flatten().map(i64::from),
        ))),
        DataType::Int64 => Some(signed_type(int_range(
            array.as_primitive::<Int64Type>().iter().flatten(),
        ))),
        DataType::UInt16 => Some(unsigned_type(
            array.as_primitive::<UInt16Type>().iter().flatten().map(u64::from).max(),
        )),
        DataType::UInt32 => Some(unsigned_type(
            array.as_primitive::<UInt32Type>().iter().flatten().map(u64::from).max(),
        )),
        DataType::UInt64 => Some(unsigned_type(
            array.as_primitive::<UInt64Type>().iter().flatten().max(),
        )),
        DataType::Float64 => {
            let lossless = array
                .as_primitive::<Float64Type>()
                .iter()
                .flatten()
                .all(|value| value.is_nan() || (value as f32) as f64 == value);
            if lossless {
                Some(DataType::Float32)
            } else {
                Some(DataType::Float64)
            }
        }
        _ => None,
    }
}

fn int_range(values: impl Iterator<Item = i64>) -> Option<(i64, i64)> {
    values.fold(None, |range, value| match range {
        None => Some((value, value)),
        Some((min, max)) => Some((min.min(value), max.max(value))),
    })
}

fn signed_type(range: Option<(i64, i64)>) -> DataType {
    let (min, max) = range.unwrap_or((0, 0));
    if min >= i8::MIN as i64 && max <= i8::MAX as i64 {
        DataType::Int8
    } else if min >= i16::MIN as i64 && max <= i16::MAX as i64 {
        DataType::Int16
    } else if min >= i32::MIN as i64 && max <= i32::MAX as i64 {
        DataType::Int32
    } else {
        DataType::Int64
    }
}

fn unsigned_type(max: Option<u64>) -> DataType {
    let max = max.unwrap_or(0);
    if max <= u8::MAX as u64 {
        DataType::UInt8
    } else if max <= u16::MAX as u64 {
        DataType::UInt16
    } else if max <= u32::MAX as u64 {
        DataType::UInt32
    } else {
        DataType::UInt64
    }
}

/// Returns the batch columns that would change type under [`auto_downcast`].
pub fn downcastable_columns(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .zip(batch.columns())
        .filter(|(_, column)| {
            downcasted_data_type(column.as_ref())
                .is_some_and(|data_type| &data_type != column.data_type())
        })
        .map(|(field, _)| field.name().clone())
        .collect()
}
