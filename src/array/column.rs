use std::sync::Arc;

use arrow_array::{make_array, Array, ArrayRef, FixedSizeListArray, ListArray};
use arrow_buffer::{NullBuffer, OffsetBuffer};
use arrow_schema::{DataType, Field};
use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};

use crate::array::metadata::{ArrayMetadata, EXTENSION_NAME_KEY};
use crate::array::offset_builder::check_offsets;
use crate::array::InterleavedCoordBuffer;
use crate::datatypes::{coord_data_type, Dimension, GeometryType};
use crate::error::{LayerError, Result};

/// A single-typed GeoArrow geometry column: an interleaved coordinate buffer plus one offset
/// buffer per nesting level, outermost first.
///
/// ## Invariants
///
/// - the number of offset buffers equals [`GeometryType::num_offset_levels`]
/// - every offset buffer starts at 0, never decreases, and ends at the length of the level it
///   indexes into
/// - the validity buffer, when present, has one entry per row
///
/// Columns are immutable. Slicing with [`GeometryColumn::owned_slice`] produces a new, compact
/// column whose offsets again start at 0.
#[derive(Debug, Clone)]
pub struct GeometryColumn {
    geom_type: GeometryType,
    coords: InterleavedCoordBuffer,
    offsets: Vec<OffsetBuffer<i32>>,
    nulls: Option<NullBuffer>,
    metadata: Arc<ArrayMetadata>,
}

impl PartialEq for GeometryColumn {
    fn eq(&self, other: &Self) -> bool {
        self.geom_type == other.geom_type
            && self.coords == other.coords
            && self.offsets.len() == other.offsets.len()
            && self
                .offsets
                .iter()
                .zip(other.offsets.iter())
                .all(|(a, b)| a.as_ref() == b.as_ref())
            && self.nulls == other.nulls
            && self.metadata == other.metadata
    }
}

impl GeometryColumn {
    /// The canonical method to create a [`GeometryColumn`] out of its internal components.
    ///
    /// # Errors
    ///
    /// - if the number of offset buffers does not match the geometry type
    /// - if any offset buffer does not start at 0 or does not end at its child's length
    /// - if the validity buffer length differs from the number of geometries
    pub fn try_new(
        geom_type: GeometryType,
        coords: InterleavedCoordBuffer,
        offsets: Vec<OffsetBuffer<i32>>,
        nulls: Option<NullBuffer>,
        metadata: Arc<ArrayMetadata>,
    ) -> Result<Self> {
        if offsets.len() != geom_type.num_offset_levels() {
            return Err(LayerError::General(format!(
                "{} expects {} offset buffers, got {}",
                geom_type,
                geom_type.num_offset_levels(),
                offsets.len()
            )));
        }

        for (level, buffer) in offsets.iter().enumerate() {
            let child_len = match offsets.get(level + 1) {
                Some(child) => child.len() - 1,
                None => coords.len(),
            };
            let label = format!("{} level {}", geom_type, level);
            check_offsets(buffer.as_ref(), child_len, &label)?;
        }

        let len = match offsets.first() {
            Some(geom_offsets) => geom_offsets.len() - 1,
            None => coords.len(),
        };
        if nulls.as_ref().is_some_and(|nulls| nulls.len() != len) {
            return Err(LayerError::General(
                "validity mask length must match the number of values".to_string(),
            ));
        }

        Ok(Self {
            geom_type,
            coords,
            offsets,
            nulls,
            metadata,
        })
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.geom_type
    }

    pub fn dim(&self) -> Dimension {
        self.coords.dim()
    }

    pub fn coords(&self) -> &InterleavedCoordBuffer {
        &self.coords
    }

    /// Offset buffers, outermost first.
    pub fn offsets(&self) -> &[OffsetBuffer<i32>] {
        &self.offsets
    }

    pub fn nulls(&self) -> Option<&NullBuffer> {
        self.nulls.as_ref()
    }

    pub fn metadata(&self) -> &Arc<ArrayMetadata> {
        &self.metadata
    }

    /// Replace the coordinates, keeping the geometry structure.
    ///
    /// # Errors
    ///
    /// - if the new buffer does not hold the same number of coordinates
    pub fn with_coords(&self, coords: InterleavedCoordBuffer) -> Result<Self> {
        if coords.len() != self.coords.len() {
            return Err(LayerError::General(format!(
                "expected {} coordinates, got {}",
                self.coords.len(),
                coords.len()
            )));
        }
        Ok(Self {
            coords,
            ..self.clone()
        })
    }

    pub fn with_metadata(&self, metadata: Arc<ArrayMetadata>) -> Self {
        Self {
            metadata,
            ..self.clone()
        }
    }

    /// Returns the number of geometries (rows) in this column.
    pub fn len(&self) -> usize {
        match self.offsets.first() {
            Some(geom_offsets) => geom_offsets.len() - 1,
            None => self.coords.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self, i: usize) -> bool {
        self.nulls.as_ref().is_some_and(|nulls| nulls.is_null(i))
    }

    pub fn null_count(&self) -> usize {
        self.nulls.as_ref().map_or(0, |nulls| nulls.null_count())
    }

    /// Size in bytes of the coordinate, offset and validity buffers.
    pub fn nbytes(&self) -> usize {
        let offsets: usize = self
            .offsets
            .iter()
            .map(|buffer| buffer.len() * std::mem::size_of::<i32>())
            .sum();
        let validity = self.nulls.as_ref().map_or(0, |nulls| nulls.len().div_ceil(8));
        self.coords.nbytes() + offsets + validity
    }

    /// Copy `length` rows starting at `offset` into a new column.
    ///
    /// Offsets are rebased to start at 0 and only the coordinates referenced by the selected rows
    /// are copied, so the result is self-contained.
    ///
    /// # Panic
    /// This function panics iff `offset + length > self.len()`.
    pub fn owned_slice(&self, offset: usize, length: usize) -> Self {
        assert!(
            offset + length <= self.len(),
            "offset + length may not exceed length of array"
        );

        let mut start = offset;
        let mut end = offset + length;
        let mut offsets = Vec::with_capacity(self.offsets.len());
        for buffer in self.offsets.iter() {
            let window = &buffer[start..=end];
            let base = window[0];
            let rebased: Vec<i32> = window.iter().map(|o| o - base).collect();
            offsets.push(OffsetBuffer::new(rebased.into()));
            start = window[0] as usize;
            end = window[window.len() - 1] as usize;
        }

        let nulls = self
            .nulls
            .as_ref()
            .map(|nulls| nulls.slice(offset, length))
            .filter(|nulls| nulls.null_count() > 0);

        Self {
            geom_type: self.geom_type,
            coords: self.coords.owned_slice(start, end - start),
            offsets,
            nulls,
            metadata: self.metadata.clone(),
        }
    }

    /// The Arrow storage type of this column.
    pub fn storage_type(&self) -> DataType {
        let names = self.geom_type.list_field_names();
        let mut data_type = coord_data_type(self.dim());
        for name in names.iter().rev() {
            data_type = DataType::List(Arc::new(Field::new(*name, data_type, false)));
        }
        data_type
    }

    /// A field carrying the GeoArrow extension name and metadata for this column.
    pub fn extension_field(&self, name: &str) -> Result<Field> {
        let metadata = self
            .metadata
            .to_field_metadata(self.geom_type.extension_name())?;
        Ok(Field::new(name, self.storage_type(), true).with_metadata(metadata))
    }

    pub fn into_arrow(self) -> ArrayRef {
        let names = self.geom_type.list_field_names();
        let levels = self.offsets.len();
        if levels == 0 {
            return Arc::new(self.coords.into_arrow_with_nulls(self.nulls));
        }

        let mut array: ArrayRef = Arc::new(self.coords.into_arrow());
        for (level, offsets) in self.offsets.into_iter().enumerate().rev() {
            let field = Arc::new(Field::new(names[level], array.data_type().clone(), false));
            let nulls = if level == 0 { self.nulls.clone() } else { None };
            array = Arc::new(ListArray::new(field, offsets, array, nulls));
        }
        array
    }

    pub fn to_array_ref(&self) -> ArrayRef {
        self.clone().into_arrow()
    }

    /// Parse a geometry column from an Arrow array and its field.
    ///
    /// The field must carry a native GeoArrow `ARROW:extension:name`. Sliced arrays are
    /// accepted; the resulting column is compacted so its offsets start at 0.
    pub fn from_arrow(array: &dyn Array, field: &Field) -> Result<Self> {
        let extension_name = field.metadata().get(EXTENSION_NAME_KEY).ok_or_else(|| {
            LayerError::IncorrectType("geometry field is missing GeoArrow extension name".into())
        })?;
        let geom_type = GeometryType::from_extension_name(extension_name)?;
        let metadata = Arc::new(ArrayMetadata::try_from(field)?);
        let nulls = array.nulls().cloned().filter(|n| n.null_count() > 0);

        let mut current: ArrayRef = make_array(array.to_data());
        let mut start = 0;
        let mut end = array.len();
        let mut offsets = Vec::with_capacity(geom_type.num_offset_levels());
        for _ in 0..geom_type.num_offset_levels() {
            let list = current
                .as_any()
                .downcast_ref::<ListArray>()
                .ok_or_else(|| {
                    LayerError::IncorrectType(
                        format!("expected a List array for {}", geom_type).into(),
                    )
                })?;
            let window = &list.value_offsets()[start..=end];
            let base = window[0];
            let rebased: Vec<i32> = window.iter().map(|o| o - base).collect();
            offsets.push(OffsetBuffer::new(rebased.into()));
            start = window[0] as usize;
            end = window[window.len() - 1] as usize;
            let values = list.values().clone();
            current = values;
        }

        let coord_array = current
            .as_any()
            .downcast_ref::<FixedSizeListArray>()
            .ok_or(LayerError::IncorrectType(
                "expected a FixedSizeList coordinate array".into(),
            ))?;
        let coords: InterleavedCoordBuffer = (&coord_array.slice(start, end - start)).try_into()?;

        Self::try_new(
            geom_type,
            coords.owned_slice(0, coords.len()),
            offsets,
            nulls,
            metadata,
        )
    }

    fn coord(&self, i: usize) -> Coord {
        Coord {
            x: self.coords.get_x(i),
            y: self.coords.get_y(i),
        }
    }

    fn line_string(&self, offsets: &OffsetBuffer<i32>, i: usize) -> LineString {
        let start = offsets[i] as usize;
        let end = offsets[i + 1] as usize;
        LineString::new((start..end).map(|c| self.coord(c)).collect())
    }

    fn polygon(
        &self,
        ring_offsets: &OffsetBuffer<i32>,
        coord_offsets: &OffsetBuffer<i32>,
        i: usize,
    ) -> Polygon {
        let start = ring_offsets[i] as usize;
        let end = ring_offsets[i + 1] as usize;
        let mut rings = (start..end).map(|r| self.line_string(coord_offsets, r));
        let exterior = rings.next().unwrap_or_else(|| LineString::new(vec![]));
        Polygon::new(exterior, rings.collect())
    }

    /// Returns the value at slot `i` as a [`geo`] geometry, or `None` if the slot is null.
    ///
    /// Only the x and y values are read.
    pub fn value_as_geo(&self, i: usize) -> Option<Geometry> {
        if self.is_null(i) {
            return None;
        }

        let geom = match self.geom_type {
            GeometryType::Point => Geometry::Point(Point(self.coord(i))),
            GeometryType::LineString => Geometry::LineString(self.line_string(&self.offsets[0], i)),
            GeometryType::MultiPoint => {
                let line = self.line_string(&self.offsets[0], i);
                Geometry::MultiPoint(MultiPoint::new(line.points().collect()))
            }
            GeometryType::Polygon => {
                Geometry::Polygon(self.polygon(&self.offsets[0], &self.offsets[1], i))
            }
            GeometryType::MultiLineString => {
                let start = self.offsets[0][i] as usize;
                let end = self.offsets[0][i + 1] as usize;
                Geometry::MultiLineString(MultiLineString::new(
                    (start..end)
                        .map(|l| self.line_string(&self.offsets[1], l))
                        .collect(),
                ))
            }
            GeometryType::MultiPolygon => {
                let start = self.offsets[0][i] as usize;
                let end = self.offsets[0][i + 1] as usize;
                Geometry::MultiPolygon(MultiPolygon::new(
                    (start..end)
                        .map(|p| self.polygon(&self.offsets[1], &self.offsets[2], p))
                        .collect(),
                ))
            }
        };
        Some(geom)
    }

    /// Iterator over geo Geometry objects, taking into account validity
    pub fn iter_geo(&self) -> impl Iterator<Item = Option<Geometry>> + '_ {
        (0..self.len()).map(|i| self.value_as_geo(i))
    }
}
