use std::sync::Arc;

use crate::array::{ArrayMetadata, GeometryColumn, InterleavedCoordBuffer};
use crate::crs::{Crs, CrsTransform, OGC_CRS84};
use crate::error::{LayerError, Result};

/// Reproject a geometry column to WGS84 longitude/latitude.
pub trait Reproject {
    /// Returns a new column with coordinates transformed from `source` to `OGC:CRS84`.
    ///
    /// Columns already in longitude/latitude are returned unchanged apart from their CRS
    /// metadata. Logs a warning whenever coordinates are actually transformed.
    fn reproject_to_lon_lat(&self, source: &Crs, transform: &dyn CrsTransform) -> Result<Self>
    where
        Self: Sized;
}

impl Reproject for GeometryColumn {
    fn reproject_to_lon_lat(&self, source: &Crs, transform: &dyn CrsTransform) -> Result<Self> {
        let metadata = Arc::new(ArrayMetadata::with_crs(OGC_CRS84));
        if source.is_lon_lat() {
            return Ok(self.with_metadata(metadata));
        }

        if !transform.supports(source) {
            return Err(LayerError::Reprojection(format!(
                "no coordinate transform available from {} to {}",
                source, OGC_CRS84
            )));
        }

        log::warn!(
            "Geometry column being reprojected from {} to {}",
            source,
            OGC_CRS84
        );

        let dim = self.coords().dim();
        let mut values = self.coords().values().to_vec();
        transform.transform_to_lon_lat(source, &mut values, dim)?;
        let coords = InterleavedCoordBuffer::try_new(values.into(), dim)?;
        Ok(self.with_coords(coords)?.with_metadata(metadata))
    }
}
