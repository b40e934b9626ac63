use geo::{polygon, Geometry};

use criterion::{criterion_group, criterion_main, Criterion};
use geoarrow_layer::chunk::split;
use geoarrow_layer::datatypes::GeometryType;
use geoarrow_layer::encode::encode;
use geoarrow_layer::schema::LayerKind;
use geoarrow_layer::table::LayerTable;
use indexmap::IndexMap;

fn create_data() -> Vec<Option<Geometry>> {
    // An L shape
    let poly = polygon![
        (x: 0.0, y: 0.0),
        (x: 4.0, y: 0.0),
        (x: 4.0, y: 1.0),
        (x: 1.0, y: 1.0),
        (x: 1.0, y: 4.0),
        (x: 0.0, y: 4.0),
        (x: 0.0, y: 0.0),
    ];
    vec![Some(Geometry::Polygon(poly)); 100_000]
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let data = create_data();

    c.bench_function("encode 100k polygons", |b| {
        b.iter(|| encode(&data, &[GeometryType::Polygon]).unwrap())
    });

    let geometry = encode(&data, &[GeometryType::Polygon]).unwrap();
    let table = LayerTable::try_new(LayerKind::SolidPolygon, geometry, IndexMap::new(), None).unwrap();

    c.bench_function("split 100k polygons into 64 KiB chunks", |b| {
        b.iter(|| {
            let rows = geoarrow_layer::chunk::plan(&table, 64 * 1024).unwrap();
            split(&table, rows).unwrap().collect_chunks().unwrap()
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
