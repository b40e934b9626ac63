//! Contains the GeoArrow geometry column and the buffers it is made of.

pub use builder::GeometryBuilder;
pub use column::GeometryColumn;
pub use coord::InterleavedCoordBuffer;
pub use metadata::ArrayMetadata;
pub use offset_builder::OffsetsBuilder;

mod builder;
mod column;
pub mod coord;
pub mod metadata;
pub mod offset_builder;
