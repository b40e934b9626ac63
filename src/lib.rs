//! GeoArrow encoding and chunked serialization of map layer data.
//!
//! Feature geometries are encoded into a single-typed [GeoArrow](https://github.com/geoarrow/geoarrow)
//! column, assembled with per-layer accessors (colors, radii, widths...) and attribute columns
//! into a [`LayerTable`](table::LayerTable), and split into row-aligned, independently decodable
//! [`Chunk`](chunk::Chunk)s sized to a byte budget.
//!
//! ```
//! use geo::{point, Geometry};
//! use geoarrow_layer::accessor::AccessorInput;
//! use geoarrow_layer::chunk::split;
//! use geoarrow_layer::options::SerializationOptions;
//! use geoarrow_layer::schema::LayerKind;
//! use geoarrow_layer::table::{GeoFrame, LayerTable};
//! use indexmap::indexmap;
//!
//! let frame = GeoFrame::new(vec![
//!     Some(Geometry::Point(point!(x: 0., y: 1.))),
//!     Some(Geometry::Point(point!(x: 2., y: 3.))),
//! ]);
//! let accessors = indexmap! {
//!     "get_radius".to_string() => AccessorInput::floats(vec![1.0, 2.0]),
//!     "get_fill_color".to_string() => AccessorInput::color([255, 0, 0]),
//! };
//! let options = SerializationOptions::default();
//! let table = LayerTable::from_geo_frame(LayerKind::Scatterplot, &frame, accessors, &options)?;
//!
//! let rows_per_chunk = table.rows_per_chunk(&options)?;
//! for chunk in split(&table, rows_per_chunk)?.iter() {
//!     let bytes = chunk?.to_ipc_bytes()?;
//!     assert!(!bytes.is_empty());
//! }
//! # Ok::<(), geoarrow_layer::error::LayerError>(())
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(not(test), deny(unused_crate_dependencies))]

pub mod accessor;
pub mod algorithm;
pub mod array;
pub mod chunk;
pub mod crs;
pub mod datatypes;
pub mod encode;
pub mod error;
pub mod io;
pub mod options;
pub mod schema;
pub mod table;
#[cfg(test)]
pub(crate) mod test;
