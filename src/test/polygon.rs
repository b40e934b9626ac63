use geo::{polygon, Polygon};

use crate::array::{GeometryBuilder, GeometryColumn};
use crate::datatypes::GeometryType;

pub(crate) fn p0() -> Polygon {
    polygon![
        (x: -111., y: 45.),
        (x: -111., y: 41.),
        (x: -104., y: 41.),
        (x: -104., y: 45.),
    ]
}

pub(crate) fn p1() -> Polygon {
    polygon!(
        exterior: [
            (x: -111., y: 45.),
            (x: -111., y: 41.),
            (x: -104., y: 41.),
            (x: -104., y: 45.),
        ],
        interiors: [
            [
                (x: -110., y: 44.),
                (x: -110., y: 42.),
                (x: -105., y: 42.),
                (x: -105., y: 44.),
            ],
        ],
    )
}

pub(crate) fn polygon_column() -> GeometryColumn {
    let mut builder = GeometryBuilder::new(GeometryType::Polygon);
    builder.push_polygon(&p0()).unwrap();
    builder.push_polygon(&p1()).unwrap();
    builder.finish().unwrap()
}
