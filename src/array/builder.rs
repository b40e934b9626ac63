use std::sync::Arc;

use arrow_buffer::NullBufferBuilder;
use geo::{
    Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};

use crate::array::metadata::ArrayMetadata;
use crate::array::offset_builder::OffsetsBuilder;
use crate::array::{GeometryColumn, InterleavedCoordBuffer};
use crate::datatypes::{Dimension, GeometryType};
use crate::error::{LayerError, Result};

/// The GeoArrow equivalent to `Vec<Option<Geometry>>` for a single geometry type: a mutable
/// collection that is converted into a [`GeometryColumn`] by [`GeometryBuilder::finish`].
///
/// Single geometries pushed into a builder of the matching multi type are stored as a multi
/// geometry with one part.
#[derive(Debug)]
pub struct GeometryBuilder {
    geom_type: GeometryType,
    metadata: Arc<ArrayMetadata>,

    pub(crate) coords: Vec<f64>,

    /// Offset builders, outermost (geometry level) first
    pub(crate) offsets: Vec<OffsetsBuilder<i32>>,

    /// Validity is only defined at the geometry level
    pub(crate) validity: NullBufferBuilder,
}

impl GeometryBuilder {
    /// Creates a new empty [`GeometryBuilder`].
    pub fn new(geom_type: GeometryType) -> Self {
        Self::with_capacity_and_options(geom_type, 0, 0, Default::default())
    }

    pub fn with_capacity_and_options(
        geom_type: GeometryType,
        geom_capacity: usize,
        coord_capacity: usize,
        metadata: Arc<ArrayMetadata>,
    ) -> Self {
        let mut offsets = Vec::with_capacity(geom_type.num_offset_levels());
        if geom_type.num_offset_levels() > 0 {
            offsets.push(OffsetsBuilder::with_capacity(geom_capacity));
        }
        for _ in 1..geom_type.num_offset_levels() {
            offsets.push(OffsetsBuilder::new());
        }
        Self {
            geom_type,
            metadata,
            coords: Vec::with_capacity(coord_capacity * Dimension::XY.size()),
            offsets,
            validity: NullBufferBuilder::new(geom_capacity),
        }
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.geom_type
    }

    pub fn len(&self) -> usize {
        self.validity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn push_coord(&mut self, coord: &Coord) {
        self.coords.push(coord.x);
        self.coords.push(coord.y);
    }

    #[inline]
    fn num_coords(&self) -> usize {
        self.coords.len() / Dimension::XY.size()
    }

    /// Push the coordinates of one line, recording its length at `level`.
    fn push_line(&mut self, level: usize, line: &LineString) -> Result<()> {
        self.offsets[level].try_push_usize(line.0.len())?;
        for coord in line.coords() {
            self.push_coord(coord);
        }
        Ok(())
    }

    /// Push one polygon's rings, recording its ring count at `level`.
    fn push_rings(&mut self, level: usize, polygon: &Polygon) -> Result<()> {
        // A polygon with an empty exterior is an empty polygon, not one empty ring.
        if polygon.exterior().0.is_empty() {
            return self.offsets[level].try_push_usize(0);
        }
        self.offsets[level].try_push_usize(polygon.interiors().len() + 1)?;
        self.push_line(level + 1, polygon.exterior())?;
        for ring in polygon.interiors() {
            self.push_line(level + 1, ring)?;
        }
        Ok(())
    }

    fn incorrect_type(&self, found: &str) -> LayerError {
        LayerError::UnsupportedGeometry(format!(
            "cannot add {} to a {} column",
            found, self.geom_type
        ))
    }

    /// Add a new Point to the end of this array.
    #[inline]
    pub fn push_point(&mut self, value: &Point) -> Result<()> {
        match self.geom_type {
            GeometryType::Point => {
                self.push_coord(&value.0);
            }
            GeometryType::MultiPoint => {
                self.offsets[0].try_push_usize(1)?;
                self.push_coord(&value.0);
            }
            _ => return Err(self.incorrect_type("Point")),
        }
        self.validity.append(true);
        Ok(())
    }

    /// Add a new MultiPoint to the end of this array.
    #[inline]
    pub fn push_multi_point(&mut self, value: &MultiPoint) -> Result<()> {
        if self.geom_type != GeometryType::MultiPoint {
            return Err(self.incorrect_type("MultiPoint"));
        }
        self.offsets[0].try_push_usize(value.0.len())?;
        for point in value.iter() {
            self.push_coord(&point.0);
        }
        self.validity.append(true);
        Ok(())
    }

    /// Add a new LineString to the end of this array.
    #[inline]
    pub fn push_line_string(&mut self, value: &LineString) -> Result<()> {
        match self.geom_type {
            GeometryType::LineString => self.push_line(0, value)?,
            GeometryType::MultiLineString => {
                self.offsets[0].try_push_usize(1)?;
                self.push_line(1, value)?;
            }
            _ => return Err(self.incorrect_type("LineString")),
        }
        self.validity.append(true);
        Ok(())
    }

    /// Add a new MultiLineString to the end of this array.
    #[inline]
    pub fn push_multi_line_string(&mut self, value: &MultiLineString) -> Result<()> {
        if self.geom_type != GeometryType::MultiLineString {
            return Err(self.incorrect_type("MultiLineString"));
        }
        self.offsets[0].try_push_usize(value.0.len())?;
        for line in value.iter() {
            self.push_line(1, line)?;
        }
        self.validity.append(true);
        Ok(())
    }

    /// Add a new Polygon to the end of this array.
    #[inline]
    pub fn push_polygon(&mut self, value: &Polygon) -> Result<()> {
        match self.geom_type {
            GeometryType::Polygon => self.push_rings(0, value)?,
            GeometryType::MultiPolygon => {
                self.offsets[0].try_push_usize(1)?;
                self.push_rings(1, value)?;
            }
            _ => return Err(self.incorrect_type("Polygon")),
        }
        self.validity.append(true);
        Ok(())
    }

    /// Add a new MultiPolygon to the end of this array.
    #[inline]
    pub fn push_multi_polygon(&mut self, value: &MultiPolygon) -> Result<()> {
        if self.geom_type != GeometryType::MultiPolygon {
            return Err(self.incorrect_type("MultiPolygon"));
        }
        self.offsets[0].try_push_usize(value.0.len())?;
        for polygon in value.iter() {
            self.push_rings(1, polygon)?;
        }
        self.validity.append(true);
        Ok(())
    }

    /// Add any supported geometry (or a null) to the end of this array.
    ///
    /// `Line` is stored as a two-vertex LineString; `Rect` and `Triangle` as single-ring
    /// Polygons. Geometry collections are rejected.
    pub fn push_geometry(&mut self, value: Option<&Geometry>) -> Result<()> {
        let Some(geom) = value else {
            self.push_null();
            return Ok(());
        };
        match geom {
            Geometry::Point(g) => self.push_point(g),
            Geometry::MultiPoint(g) => self.push_multi_point(g),
            Geometry::Line(g) => self.push_line_string(&LineString::from(*g)),
            Geometry::LineString(g) => self.push_line_string(g),
            Geometry::MultiLineString(g) => self.push_multi_line_string(g),
            Geometry::Polygon(g) => self.push_polygon(g),
            Geometry::Rect(g) => self.push_polygon(&g.to_polygon()),
            Geometry::Triangle(g) => self.push_polygon(&g.to_polygon()),
            Geometry::MultiPolygon(g) => self.push_multi_polygon(g),
            Geometry::GeometryCollection(_) => Err(self.incorrect_type("GeometryCollection")),
        }
    }

    #[inline]
    pub fn push_null(&mut self) {
        match self.offsets.first_mut() {
            // Only the geometry offsets need to be extended: the next geometry points to the
            // same child location.
            Some(geom_offsets) => geom_offsets.extend_constant(1),
            // Point arrays are fixed size, so a null slot still takes a coordinate.
            None => self.coords.extend_from_slice(&[0.0, 0.0]),
        }
        self.validity.append(false);
    }

    pub fn extend_from_iter<'a>(
        &mut self,
        geoms: impl Iterator<Item = Option<&'a Geometry>>,
    ) -> Result<()> {
        geoms.into_iter().try_for_each(|g| self.push_geometry(g))
    }

    pub fn finish(mut self) -> Result<GeometryColumn> {
        let num_coords = self.num_coords();
        let coords = InterleavedCoordBuffer::try_new(self.coords.into(), Dimension::XY)?;
        debug_assert_eq!(coords.len(), num_coords);
        let offsets = self.offsets.into_iter().map(|o| o.finish()).collect();
        GeometryColumn::try_new(
            self.geom_type,
            coords,
            offsets,
            self.validity.finish(),
            self.metadata,
        )
    }
}
