//! Coordinate reference system identifiers and transforms to longitude/latitude.
//!
//! Every geometry column is delivered in WGS84 longitude/latitude (`OGC:CRS84`). Data in any
//! other CRS is transformed through a [`CrsTransform`]. The built-in [`WebMercator`] handles
//! the common spherical mercator codes; enable the `proj` feature for [`ProjTransform`], which
//! handles anything PROJ knows about.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::datatypes::Dimension;
use crate::error::{LayerError, Result};

/// The identifier written into the metadata of every encoded geometry column.
pub const OGC_CRS84: &str = "OGC:CRS84";

/// An authority-style CRS identifier such as `"EPSG:3857"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs(String);

impl Crs {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn epsg(code: u32) -> Self {
        Self(format!("EPSG:{}", code))
    }

    pub fn lon_lat() -> Self {
        Self(OGC_CRS84.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn normalized(&self) -> String {
        self.0
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase()
    }

    /// Whether coordinates in this CRS are already WGS84 longitude/latitude.
    pub fn is_lon_lat(&self) -> bool {
        matches!(
            self.normalized().as_str(),
            "EPSG:4326"
                | "OGC:CRS84"
                | "CRS84"
                | "WGS84"
                | "URN:OGC:DEF:CRS:OGC:1.3:CRS84"
                | "URN:OGC:DEF:CRS:EPSG::4326"
        )
    }

    /// The EPSG code, if this is an `EPSG:<code>` identifier.
    pub fn epsg_code(&self) -> Option<u32> {
        self.normalized()
            .strip_prefix("EPSG:")
            .and_then(|code| code.parse().ok())
    }
}

impl Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Crs {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Converts interleaved coordinates from a source CRS to WGS84 longitude/latitude in place.
pub trait CrsTransform: Send + Sync {
    /// Whether this transform knows how to convert from `source`.
    fn supports(&self, source: &Crs) -> bool;

    /// Transform `coords` (interleaved, `dim.size()` values per coordinate) to degrees of
    /// longitude and latitude. Z values are left untouched.
    fn transform_to_lon_lat(&self, source: &Crs, coords: &mut [f64], dim: Dimension)
        -> Result<()>;
}

/// Inverse spherical ("web") mercator.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

const EARTH_RADIUS: f64 = 6_378_137.0;

impl CrsTransform for WebMercator {
    fn supports(&self, source: &Crs) -> bool {
        matches!(source.epsg_code(), Some(3857 | 900913 | 3785 | 102100))
    }

    fn transform_to_lon_lat(
        &self,
        source: &Crs,
        coords: &mut [f64],
        dim: Dimension,
    ) -> Result<()> {
        if !self.supports(source) {
            return Err(LayerError::Reprojection(format!(
                "{} is not a web mercator CRS",
                source
            )));
        }
        for coord in coords.chunks_exact_mut(dim.size()) {
            let lon = (coord[0] / EARTH_RADIUS).to_degrees();
            let lat = (2.0 * (coord[1] / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2)
                .to_degrees();
            coord[0] = lon;
            coord[1] = lat;
        }
        Ok(())
    }
}

/// A transform backed by PROJ, supporting any CRS PROJ can resolve.
#[cfg(feature = "proj")]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjTransform;

#[cfg(feature = "proj")]
impl CrsTransform for ProjTransform {
    fn supports(&self, _source: &Crs) -> bool {
        true
    }

    fn transform_to_lon_lat(
        &self,
        source: &Crs,
        coords: &mut [f64],
        dim: Dimension,
    ) -> Result<()> {
        let proj = proj::Proj::new_known_crs(source.as_str(), OGC_CRS84, None)
            .map_err(|err| LayerError::Reprojection(err.to_string()))?;
        for coord in coords.chunks_exact_mut(dim.size()) {
            let (x, y) = proj.convert((coord[0], coord[1]))?;
            coord[0] = x;
            coord[1] = y;
        }
        Ok(())
    }
}

/// The transform used when the caller does not supply one.
pub fn default_transform() -> Box<dyn CrsTransform> {
    #[cfg(feature = "proj")]
    {
        Box::new(ProjTransform)
    }

    #[cfg(not(feature = "proj"))]
    {
        Box::new(WebMercator)
    }
}
