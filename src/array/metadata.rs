//! Metadata contained within a GeoArrow geometry column.
//!
//! This metadata is [defined by the GeoArrow specification](https://geoarrow.org/extension-types).

use std::collections::HashMap;

use arrow_schema::Field;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LayerError, Result};

pub(crate) const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";
pub(crate) const EXTENSION_METADATA_KEY: &str = "ARROW:extension:metadata";

/// A GeoArrow metadata object following the extension metadata [defined by the GeoArrow
/// specification](https://geoarrow.org/extension-types).
///
/// This is serialized to JSON on the geometry field of every chunk so that each chunk can be
/// decoded on its own.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArrayMetadata {
    /// The coordinate reference system, as an identifier string (`"OGC:CRS84"`) or PROJJSON.
    /// Omitted if the producer had no CRS information. Axis order is always (longitude, latitude).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crs: Option<Value>,
}

impl ArrayMetadata {
    pub fn with_crs(crs: impl Into<String>) -> Self {
        Self {
            crs: Some(Value::String(crs.into())),
        }
    }

    /// Decide whether this [ArrayMetadata] should be written to Arrow metadata (aka if it is
    /// non-empty)
    pub fn should_serialize(&self) -> bool {
        self.crs.is_some()
    }

    /// Field metadata tagging a field with the given extension name and this metadata.
    pub(crate) fn to_field_metadata(&self, extension_name: &str) -> Result<HashMap<String, String>> {
        let mut metadata = HashMap::with_capacity(2);
        metadata.insert(EXTENSION_NAME_KEY.to_string(), extension_name.to_string());
        if self.should_serialize() {
            metadata.insert(
                EXTENSION_METADATA_KEY.to_string(),
                serde_json::to_string(self)?,
            );
        }
        Ok(metadata)
    }
}

impl TryFrom<&Field> for ArrayMetadata {
    type Error = LayerError;

    fn try_from(value: &Field) -> Result<Self> {
        if let Some(ext_meta) = value.metadata().get(EXTENSION_METADATA_KEY) {
            Ok(serde_json::from_str(ext_meta)?)
        } else {
            Ok(Default::default())
        }
    }
}
