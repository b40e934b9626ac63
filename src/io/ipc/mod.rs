//! Read and write chunks as Arrow IPC streams, the format each chunk is transmitted in.

mod reader;
mod writer;

pub use reader::{read_accessors, read_geometry, read_ipc_stream};
pub use writer::{write_chunk_stream, write_chunk_stream_with_options, write_chunks_stream};

#[cfg(test)]
mod test {
    use super::*;
    use crate::accessor::{AccessorInput, ScalarValue};
    use crate::chunk::split;
    use crate::schema::LayerKind;
    use crate::table::LayerTable;
    use crate::test::{polygon, properties};
    use arrow_array::cast::AsArray;
    use arrow_array::types::{Float32Type, UInt32Type};
    use arrow_array::Array;
    use geo::Geometry;
    use indexmap::indexmap;
    use std::io::Cursor;

    fn polygon_table() -> LayerTable {
        LayerTable::try_new(
            LayerKind::SolidPolygon,
            polygon::polygon_column(),
            indexmap! {
                "get_elevation".to_string() => AccessorInput::floats(vec![10.0, 20.0]),
                "get_fill_color".to_string() => AccessorInput::color([0, 128, 255]),
            },
            Some(properties::row_id_batch(2)),
        )
        .unwrap()
    }

    #[test]
    fn each_chunk_decodes_on_its_own() {
        let table = polygon_table();
        let chunks = split(&table, 1).unwrap();
        let chunk = chunks.get(1).unwrap();

        let bytes = chunk.to_ipc_bytes().unwrap();
        let reader = read_ipc_stream(Cursor::new(bytes)).unwrap();
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>().unwrap();
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch, chunk.record_batch());

        let ids = batch.column(0).as_primitive::<UInt32Type>();
        assert_eq!(ids.value(0), 1);
        let geometry = read_geometry(batch).unwrap();
        assert_eq!(geometry.value_as_geo(0), Some(Geometry::Polygon(polygon::p1())));

        let accessors = read_accessors(batch).unwrap();
        assert_eq!(
            accessors.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["get_elevation", "get_fill_color"]
        );
        let elevation = accessors["get_elevation"].as_array().unwrap();
        assert_eq!(elevation.len(), geometry.len());
        assert_eq!(elevation.as_primitive::<Float32Type>().value(0), 20.0);
        assert_eq!(
            accessors["get_fill_color"].as_constant(),
            Some(&ScalarValue::Color([0, 128, 255, 255]))
        );
    }

    #[test]
    fn accessor_columns_align_across_chunks() {
        let table = polygon_table();
        let chunks = split(&table, 1).unwrap();
        let mut elevations = Vec::new();
        for chunk in chunks.iter() {
            let bytes = chunk.unwrap().to_ipc_bytes().unwrap();
            let batches = read_ipc_stream(Cursor::new(bytes))
                .unwrap()
                .collect::<std::result::Result<Vec<_>, _>>()
                .unwrap();
            let accessors = read_accessors(&batches[0]).unwrap();
            let elevation = accessors["get_elevation"].as_array().unwrap().clone();
            let ids = batches[0].column(0).as_primitive::<UInt32Type>().clone();
            for k in 0..elevation.len() {
                elevations.push((ids.value(k), elevation.as_primitive::<Float32Type>().value(k)));
            }
        }
        assert_eq!(elevations, vec![(0, 10.0), (1, 20.0)]);
    }

    #[test]
    fn all_chunks_in_one_stream() {
        let table = polygon_table();
        let chunks = split(&table, 1).unwrap();
        let mut buffer = Vec::new();
        write_chunks_stream(&chunks, &mut buffer).unwrap();

        let reader = read_ipc_stream(Cursor::new(buffer)).unwrap();
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>().unwrap();
        assert_eq!(batches.len(), 2);
        let geoms: Vec<_> = batches
            .iter()
            .flat_map(|batch| read_geometry(batch).unwrap().iter_geo().collect::<Vec<_>>())
            .collect();
        assert_eq!(geoms, table.geometry().iter_geo().collect::<Vec<_>>());
    }

    #[cfg(feature = "ipc_compression")]
    #[test]
    fn compressed_chunk() {
        use arrow_ipc::writer::IpcWriteOptions;
        use arrow_ipc::CompressionType;

        let table = polygon_table();
        let chunks = split(&table, 2).unwrap();
        let chunk = chunks.get(0).unwrap();
        let options = IpcWriteOptions::default()
            .try_with_compression(Some(CompressionType::ZSTD))
            .unwrap();
        let mut buffer = Vec::new();
        write_chunk_stream_with_options(&chunk, &mut buffer, options).unwrap();

        let reader = read_ipc_stream(Cursor::new(buffer)).unwrap();
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>().unwrap();
        assert_eq!(&batches[0], chunk.record_batch());
    }
}
