//! Geometry type and dimension tags shared by encoding, assembly and chunking.

use std::fmt::Display;

use arrow_schema::{DataType, Field};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{LayerError, Result};

/// The six GeoArrow native geometry types a layer can be fed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

/// Single and multi variants of the same family can be mixed in one column (the column is then
/// promoted to the multi type). Different families cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryFamily {
    Point,
    Line,
    Polygon,
}

impl GeometryType {
    /// The `ARROW:extension:name` for this type.
    pub fn extension_name(&self) -> &'static str {
        match self {
            GeometryType::Point => "geoarrow.point",
            GeometryType::LineString => "geoarrow.linestring",
            GeometryType::Polygon => "geoarrow.polygon",
            GeometryType::MultiPoint => "geoarrow.multipoint",
            GeometryType::MultiLineString => "geoarrow.multilinestring",
            GeometryType::MultiPolygon => "geoarrow.multipolygon",
        }
    }

    pub fn from_extension_name(name: &str) -> Result<Self> {
        match name {
            "geoarrow.point" => Ok(GeometryType::Point),
            "geoarrow.linestring" => Ok(GeometryType::LineString),
            "geoarrow.polygon" => Ok(GeometryType::Polygon),
            "geoarrow.multipoint" => Ok(GeometryType::MultiPoint),
            "geoarrow.multilinestring" => Ok(GeometryType::MultiLineString),
            "geoarrow.multipolygon" => Ok(GeometryType::MultiPolygon),
            _ => Err(LayerError::UnsupportedGeometry(format!(
                "Unknown geoarrow type {}",
                name
            ))),
        }
    }

    /// Number of offset buffers between the geometry level and the coordinates.
    pub fn num_offset_levels(&self) -> usize {
        match self {
            GeometryType::Point => 0,
            GeometryType::LineString | GeometryType::MultiPoint => 1,
            GeometryType::Polygon | GeometryType::MultiLineString => 2,
            GeometryType::MultiPolygon => 3,
        }
    }

    pub fn family(&self) -> GeometryFamily {
        match self {
            GeometryType::Point | GeometryType::MultiPoint => GeometryFamily::Point,
            GeometryType::LineString | GeometryType::MultiLineString => GeometryFamily::Line,
            GeometryType::Polygon | GeometryType::MultiPolygon => GeometryFamily::Polygon,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(
            self,
            GeometryType::MultiPoint | GeometryType::MultiLineString | GeometryType::MultiPolygon
        )
    }

    /// The multi variant of this type's family.
    pub fn to_multi(self) -> Self {
        match self.family() {
            GeometryFamily::Point => GeometryType::MultiPoint,
            GeometryFamily::Line => GeometryType::MultiLineString,
            GeometryFamily::Polygon => GeometryType::MultiPolygon,
        }
    }

    /// Names of the nested list fields, outermost first, as named by GeoArrow.
    pub(crate) fn list_field_names(&self) -> &'static [&'static str] {
        match self {
            GeometryType::Point => &[],
            GeometryType::LineString => &["vertices"],
            GeometryType::MultiPoint => &["points"],
            GeometryType::Polygon => &["rings", "vertices"],
            GeometryType::MultiLineString => &["linestrings", "vertices"],
            GeometryType::MultiPolygon => &["polygons", "rings", "vertices"],
        }
    }
}

impl Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPoint => "MultiPoint",
            GeometryType::MultiLineString => "MultiLineString",
            GeometryType::MultiPolygon => "MultiPolygon",
        };
        write!(f, "{}", name)
    }
}

/// Coordinate dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    #[default]
    XY,
    XYZ,
}

impl Dimension {
    pub fn size(&self) -> usize {
        match self {
            Dimension::XY => 2,
            Dimension::XYZ => 3,
        }
    }
}

impl TryFrom<usize> for Dimension {
    type Error = LayerError;

    fn try_from(value: usize) -> Result<Self> {
        match value {
            2 => Ok(Dimension::XY),
            3 => Ok(Dimension::XYZ),
            _ => Err(LayerError::General(format!(
                "Unsupported coordinate dimension {}",
                value
            ))),
        }
    }
}

/// The storage type of an interleaved coordinate array.
pub(crate) fn coord_data_type(dim: Dimension) -> DataType {
    let values_field = match dim {
        Dimension::XY => Field::new("xy", DataType::Float64, false),
        Dimension::XYZ => Field::new("xyz", DataType::Float64, false),
    };
    DataType::FixedSizeList(Arc::new(values_field), dim.size() as i32)
}
