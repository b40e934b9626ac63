//! Encode [`geo`] geometries into a single-typed GeoArrow [`GeometryColumn`].

use std::sync::Arc;

use geo::{CoordsIter, Geometry, Rect};
use itertools::Itertools;

use crate::algorithm::Reproject;
use crate::array::{ArrayMetadata, GeometryBuilder, GeometryColumn};
use crate::crs::{Crs, CrsTransform, OGC_CRS84};
use crate::datatypes::GeometryType;
use crate::error::{LayerError, Result};

/// The GeoArrow type a geometry is stored as.
///
/// `Line` is stored as a LineString, `Rect` and `Triangle` as Polygons.
pub fn geometry_type_of(geom: &Geometry) -> Result<GeometryType> {
    let geom_type = match geom {
        Geometry::Point(_) => GeometryType::Point,
        Geometry::Line(_) | Geometry::LineString(_) => GeometryType::LineString,
        Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => GeometryType::Polygon,
        Geometry::MultiPoint(_) => GeometryType::MultiPoint,
        Geometry::MultiLineString(_) => GeometryType::MultiLineString,
        Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
        Geometry::GeometryCollection(_) => {
            return Err(LayerError::UnsupportedGeometry(
                "geometry collections are not supported".to_string(),
            ))
        }
    };
    Ok(geom_type)
}

/// Infer the single geometry type that can hold every non-null geometry.
///
/// A column mixing single and multi geometries of the same family (e.g. Polygon and
/// MultiPolygon) is stored as the multi type.
///
/// # Errors
///
/// - if there is no non-null geometry
/// - if the geometries belong to different families, e.g. Points and LineStrings
/// - if any geometry is a geometry collection
pub fn infer_geometry_type(geoms: &[Option<Geometry>]) -> Result<GeometryType> {
    let types = geoms
        .iter()
        .flatten()
        .map(geometry_type_of)
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .unique()
        .collect::<Vec<_>>();

    let first = *types.first().ok_or_else(|| {
        LayerError::UnsupportedGeometry("no non-null geometries to encode".to_string())
    })?;
    if !types.iter().map(|t| t.family()).all_equal() {
        return Err(LayerError::UnsupportedGeometry(format!(
            "mixed geometry types: {}",
            types.iter().join(", ")
        )));
    }
    if types.len() > 1 {
        Ok(first.to_multi())
    } else {
        Ok(first)
    }
}

/// Encode geometries into a GeoArrow column.
///
/// Null entries are kept as null rows. The inferred geometry type must be in `allowed_types`.
pub fn encode(
    geoms: &[Option<Geometry>],
    allowed_types: &[GeometryType],
) -> Result<GeometryColumn> {
    encode_with_metadata(geoms, allowed_types, Default::default())
}

/// Encode geometries declared in `source_crs`, transforming them to longitude/latitude.
///
/// With no source CRS the coordinates are encoded as given and no CRS is recorded.
pub fn encode_with_crs(
    geoms: &[Option<Geometry>],
    allowed_types: &[GeometryType],
    source_crs: Option<&Crs>,
    transform: &dyn CrsTransform,
) -> Result<GeometryColumn> {
    let column = encode(geoms, allowed_types)?;
    match source_crs {
        Some(crs) => column.reproject_to_lon_lat(crs, transform),
        None => Ok(column),
    }
}

fn encode_with_metadata(
    geoms: &[Option<Geometry>],
    allowed_types: &[GeometryType],
    metadata: Arc<ArrayMetadata>,
) -> Result<GeometryColumn> {
    let geom_type = infer_geometry_type(geoms)?;
    if !allowed_types.contains(&geom_type) {
        return Err(LayerError::UnsupportedGeometry(format!(
            "{} is not one of the accepted types: {}",
            geom_type,
            allowed_types.iter().join(", ")
        )));
    }

    let coord_capacity = geoms
        .iter()
        .flatten()
        .map(|geom| geom.coords_count())
        .sum();
    let mut builder =
        GeometryBuilder::with_capacity_and_options(geom_type, geoms.len(), coord_capacity, metadata);
    builder.extend_from_iter(geoms.iter().map(|geom| geom.as_ref()))?;
    builder.finish()
}

/// Encode a `[min_x, min_y, max_x, max_y]` bounding box, in longitude/latitude, as a one-row
/// Polygon column.
pub fn encode_bounds(bounds: [f64; 4]) -> Result<GeometryColumn> {
    let [min_x, min_y, max_x, max_y] = bounds;
    if bounds.iter().any(|v| !v.is_finite()) || min_x > max_x || min_y > max_y {
        return Err(LayerError::InvalidRange {
            field: "bounds".to_string(),
            reason: format!(
                "expected finite [min_x, min_y, max_x, max_y], got {:?}",
                bounds
            ),
        });
    }
    let rect = Rect::new((min_x, min_y), (max_x, max_y));
    encode_with_metadata(
        &[Some(Geometry::Polygon(rect.to_polygon()))],
        &[GeometryType::Polygon],
        Arc::new(ArrayMetadata::with_crs(OGC_CRS84)),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crs::WebMercator;
    use crate::test::{linestring, multipoint, point, polygon};
    use approx::assert_relative_eq;
    use geo::{Line, MultiPolygon, Point};

    fn points() -> Vec<Option<Geometry>> {
        vec![
            Some(Geometry::Point(point::p0())),
            Some(Geometry::Point(point::p1())),
            Some(Geometry::Point(point::p2())),
        ]
    }

    #[test]
    fn point_gate() {
        let err = encode(&points(), &[GeometryType::Polygon]).unwrap_err();
        assert!(matches!(err, LayerError::UnsupportedGeometry(_)));

        let column = encode(&points(), &[GeometryType::Point]).unwrap();
        assert_eq!(column.geometry_type(), GeometryType::Point);
        assert_eq!(column.len(), 3);
        assert_eq!(column.value_as_geo(1), Some(Geometry::Point(point::p1())));
    }

    #[test]
    fn empty_and_all_null_inputs() {
        let err = encode(&[], &[GeometryType::Point]).unwrap_err();
        assert!(matches!(err, LayerError::UnsupportedGeometry(_)));

        let err = encode(&[None, None], &[GeometryType::Point]).unwrap_err();
        assert!(matches!(err, LayerError::UnsupportedGeometry(_)));
    }

    #[test]
    fn mixed_families_fail() {
        let geoms = vec![
            Some(Geometry::Point(point::p0())),
            Some(Geometry::LineString(linestring::ls0())),
        ];
        let err = encode(&geoms, &[GeometryType::Point, GeometryType::LineString]).unwrap_err();
        assert!(matches!(err, LayerError::UnsupportedGeometry(_)));
    }

    #[test]
    fn single_and_multi_promote_to_multi() {
        let geoms = vec![
            Some(Geometry::Point(point::p0())),
            None,
            Some(Geometry::MultiPoint(multipoint::mp0())),
        ];
        assert_eq!(
            infer_geometry_type(&geoms).unwrap(),
            GeometryType::MultiPoint
        );

        let err = encode(&geoms, &[GeometryType::Point]).unwrap_err();
        assert!(matches!(err, LayerError::UnsupportedGeometry(_)));

        let column = encode(&geoms, &[GeometryType::Point, GeometryType::MultiPoint]).unwrap();
        assert_eq!(column.len(), 3);
        assert!(column.is_null(1));
        assert_eq!(
            column.value_as_geo(2),
            Some(Geometry::MultiPoint(multipoint::mp0()))
        );

        let geoms = vec![
            Some(Geometry::MultiPolygon(MultiPolygon::new(vec![polygon::p0()]))),
            Some(Geometry::Polygon(polygon::p1())),
        ];
        let column = encode(&geoms, &[GeometryType::MultiPolygon]).unwrap();
        assert_eq!(
            column.value_as_geo(1),
            Some(Geometry::MultiPolygon(MultiPolygon::new(vec![polygon::p1()])))
        );
    }

    #[test]
    fn geometry_collections_fail() {
        let geoms = vec![Some(Geometry::GeometryCollection(Default::default()))];
        let err = encode(&geoms, &[GeometryType::Point]).unwrap_err();
        assert!(matches!(err, LayerError::UnsupportedGeometry(_)));
    }

    #[test]
    fn lines_are_linestrings() {
        let geoms = vec![Some(Geometry::Line(Line::new((0., 0.), (1., 1.))))];
        let column = encode(&geoms, &[GeometryType::LineString]).unwrap();
        assert_eq!(column.coords().len(), 2);
    }

    #[test]
    fn reprojects_web_mercator() {
        let geoms = vec![Some(Geometry::Point(Point::new(20037508.342789244, 0.0)))];
        let column = encode_with_crs(
            &geoms,
            &[GeometryType::Point],
            Some(&Crs::epsg(3857)),
            &WebMercator,
        )
        .unwrap();
        assert_relative_eq!(column.coords().get_x(0), 180.0, epsilon = 1e-9);
        assert_eq!(column.metadata().as_ref(), &ArrayMetadata::with_crs(OGC_CRS84));

        let column = encode_with_crs(&geoms, &[GeometryType::Point], None, &WebMercator).unwrap();
        assert!(column.metadata().crs.is_none());
    }

    #[test]
    fn bounds_polygon() {
        let column = encode_bounds([-10., -5., 10., 5.]).unwrap();
        assert_eq!(column.len(), 1);
        assert_eq!(column.geometry_type(), GeometryType::Polygon);
        assert_eq!(column.coords().len(), 5);

        let err = encode_bounds([10., 0., -10., 5.]).unwrap_err();
        assert!(matches!(err, LayerError::InvalidRange { .. }));
    }
}
