//! Static per-layer-kind schemas: accessor fields, their defaults, and accepted geometry types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::accessor::{AccessorKind, ScalarValue};
use crate::chunk::ChunkPolicy;
use crate::datatypes::GeometryType;

/// A declared accessor field of a layer kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: AccessorKind,
    pub default: ScalarValue,
}

impl FieldSpec {
    const fn color(name: &'static str, default: [u8; 4]) -> Self {
        Self {
            name,
            kind: AccessorKind::Color,
            default: ScalarValue::Color(default),
        }
    }

    const fn float(name: &'static str, default: f32) -> Self {
        Self {
            name,
            kind: AccessorKind::Float,
            default: ScalarValue::Float(default),
        }
    }
}

const BLACK: [u8; 4] = [0, 0, 0, 255];

const SCATTERPLOT_FIELDS: &[FieldSpec] = &[
    FieldSpec::float("get_radius", 1.0),
    FieldSpec::color("get_fill_color", BLACK),
    FieldSpec::color("get_line_color", BLACK),
    FieldSpec::float("get_line_width", 1.0),
];

const PATH_FIELDS: &[FieldSpec] = &[
    FieldSpec::color("get_color", BLACK),
    FieldSpec::float("get_width", 1.0),
];

const SOLID_POLYGON_FIELDS: &[FieldSpec] = &[
    FieldSpec::float("get_elevation", 1000.0),
    FieldSpec::color("get_fill_color", BLACK),
    FieldSpec::color("get_line_color", BLACK),
];

const HEATMAP_FIELDS: &[FieldSpec] = &[FieldSpec::float("get_weight", 1.0)];

/// The kinds of map layer whose data this crate prepares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Circles at point locations.
    Scatterplot,
    /// Lines along paths.
    Path,
    /// Filled, optionally extruded polygons.
    SolidPolygon,
    /// Density surface aggregated over every point.
    Heatmap,
}

impl LayerKind {
    /// The accessor fields this kind declares, in declaration order.
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            LayerKind::Scatterplot => SCATTERPLOT_FIELDS,
            LayerKind::Path => PATH_FIELDS,
            LayerKind::SolidPolygon => SOLID_POLYGON_FIELDS,
            LayerKind::Heatmap => HEATMAP_FIELDS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|field| field.name == name)
    }

    pub fn allowed_geometry_types(&self) -> &'static [GeometryType] {
        match self {
            LayerKind::Scatterplot => &[GeometryType::Point, GeometryType::MultiPoint],
            LayerKind::Path => &[GeometryType::LineString, GeometryType::MultiLineString],
            LayerKind::SolidPolygon => &[GeometryType::Polygon, GeometryType::MultiPolygon],
            LayerKind::Heatmap => &[GeometryType::Point],
        }
    }

    pub fn allows(&self, geom_type: GeometryType) -> bool {
        self.allowed_geometry_types().contains(&geom_type)
    }

    pub fn chunk_policy(&self) -> ChunkPolicy {
        match self {
            LayerKind::Heatmap => ChunkPolicy::WholeTable,
            _ => ChunkPolicy::ByteBudget,
        }
    }
}

impl Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Scatterplot => write!(f, "ScatterplotLayer"),
            LayerKind::Path => write!(f, "PathLayer"),
            LayerKind::SolidPolygon => write!(f, "SolidPolygonLayer"),
            LayerKind::Heatmap => write!(f, "HeatmapLayer"),
        }
    }
}
