//! Planning and splitting a [`LayerTable`](crate::table::LayerTable) into transmissible chunks.

mod plan;
mod split;

pub use plan::{plan, plan_rows, ChunkPolicy, TileCachePolicy};
pub use split::{split, Chunk, Chunks, ChunksIter};
