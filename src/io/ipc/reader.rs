use std::io::Read;

use arrow_array::{RecordBatch, RecordBatchReader};
use arrow_ipc::reader::StreamReader;
use indexmap::IndexMap;

use crate::accessor::{Accessor, ScalarValue};
use crate::array::GeometryColumn;
use crate::error::{LayerError, Result};
use crate::table::{ACCESSOR_KIND_KEY, CONSTANT_ACCESSORS_KEY, GEOMETRY_COLUMN_NAME};

/// Create a [RecordBatchReader] from an Arrow IPC record batch stream.
pub fn read_ipc_stream<R: Read>(reader: R) -> Result<impl RecordBatchReader> {
    Ok(StreamReader::try_new(reader, None)?)
}

/// Parse the geometry column of a record batch written by this crate.
pub fn read_geometry(batch: &RecordBatch) -> Result<GeometryColumn> {
    let schema = batch.schema();
    let (index, field) = schema.column_with_name(GEOMETRY_COLUMN_NAME).ok_or_else(|| {
        LayerError::General(format!("no {:?} column in record batch", GEOMETRY_COLUMN_NAME))
    })?;
    GeometryColumn::from_arrow(batch.column(index).as_ref(), field)
}

/// Recover the accessors of a record batch written by this crate: per-row accessor columns in
/// schema order, followed by the constants recorded in the schema metadata.
pub fn read_accessors(batch: &RecordBatch) -> Result<IndexMap<String, Accessor>> {
    let schema = batch.schema();
    let mut accessors: IndexMap<String, Accessor> = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .filter(|(field, _)| field.metadata().contains_key(ACCESSOR_KIND_KEY))
        .map(|(field, column)| (field.name().clone(), Accessor::PerRow(column.clone())))
        .collect();

    if let Some(constants) = schema.metadata().get(CONSTANT_ACCESSORS_KEY) {
        let constants: IndexMap<String, ScalarValue> = serde_json::from_str(constants)?;
        accessors.extend(
            constants
                .into_iter()
                .map(|(name, value)| (name, Accessor::Constant(value))),
        );
    }
    Ok(accessors)
}
