use arrow_array::RecordBatch;
use indexmap::IndexMap;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::accessor::Accessor;
use crate::array::GeometryColumn;
use crate::datatypes::GeometryType;
use crate::error::{LayerError, Result};
use crate::table::{assemble_batch, LayerTable};

/// One contiguous, self-contained row range of a [`LayerTable`].
#[derive(Debug, Clone)]
pub struct Chunk {
    index: usize,
    offset: usize,
    geometry: GeometryColumn,
    batch: RecordBatch,
    accessors: IndexMap<String, Accessor>,
}

impl Chunk {
    /// Position of this chunk in its sequence.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Row of the source table this chunk starts at.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.geometry.geometry_type()
    }

    /// The geometry rows of this chunk, offsets starting at 0.
    pub fn geometry(&self) -> &GeometryColumn {
        &self.geometry
    }

    /// Attribute columns, per-row accessor columns and the geometry column with its GeoArrow
    /// extension metadata. Constant accessors are in the schema metadata.
    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Accessors sliced to this chunk's rows. Constants are shared by every chunk.
    pub fn accessors(&self) -> &IndexMap<String, Accessor> {
        &self.accessors
    }
}

/// The chunks of a table: a lazy sequence that can be iterated any number of times.
///
/// Row `k` of chunk `j` is row `j * rows_per_chunk + k` of the source table, for the geometry,
/// every accessor and every attribute column.
#[derive(Debug, Clone, Copy)]
pub struct Chunks<'a> {
    table: &'a LayerTable,
    rows_per_chunk: usize,
}

/// Split `table` into chunks of `rows_per_chunk` rows; the last chunk holds the remainder.
///
/// # Errors
///
/// - if `rows_per_chunk` is zero
pub fn split(table: &LayerTable, rows_per_chunk: usize) -> Result<Chunks<'_>> {
    if rows_per_chunk == 0 {
        return Err(LayerError::InvalidRange {
            field: "rows_per_chunk".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Chunks {
        table,
        rows_per_chunk,
    })
}

impl<'a> Chunks<'a> {
    pub fn rows_per_chunk(&self) -> usize {
        self.rows_per_chunk
    }

    pub fn table(&self) -> &'a LayerTable {
        self.table
    }

    /// Number of chunks
    pub fn len(&self) -> usize {
        self.table.len().div_ceil(self.rows_per_chunk)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build chunk `index`.
    pub fn get(&self, index: usize) -> Result<Chunk> {
        if index >= self.len() {
            return Err(LayerError::InvalidRange {
                field: "index".to_string(),
                reason: format!("chunk {} of {}", index, self.len()),
            });
        }
        let offset = index * self.rows_per_chunk;
        let length = self.rows_per_chunk.min(self.table.len() - offset);

        let geometry = self.table.geometry().owned_slice(offset, length);
        let properties = self
            .table
            .properties()
            .map(|batch| batch.slice(offset, length));
        let accessors = self
            .table
            .accessors()
            .iter()
            .map(|(name, accessor)| (name.clone(), accessor.slice(offset, length)))
            .collect();
        let batch = assemble_batch(&geometry, &accessors, properties.as_ref())?;

        Ok(Chunk {
            index,
            offset,
            geometry,
            batch,
            accessors,
        })
    }

    pub fn iter(&self) -> ChunksIter<'a> {
        ChunksIter {
            chunks: *self,
            next: 0,
            end: self.len(),
        }
    }

    /// Build every chunk, in order.
    ///
    /// If the `rayon` feature is enabled, chunks are built in parallel.
    pub fn collect_chunks(&self) -> Result<Vec<Chunk>> {
        #[cfg(feature = "rayon")]
        {
            (0..self.len())
                .into_par_iter()
                .map(|index| self.get(index))
                .collect()
        }

        #[cfg(not(feature = "rayon"))]
        {
            self.iter().collect()
        }
    }
}

impl<'a> IntoIterator for &Chunks<'a> {
    type Item = Result<Chunk>;
    type IntoIter = ChunksIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over [`Chunks`], created by [`Chunks::iter`].
#[derive(Debug, Clone)]
pub struct ChunksIter<'a> {
    chunks: Chunks<'a>,
    next: usize,
    end: usize,
}

impl<'a> Iterator for ChunksIter<'a> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == self.end {
            return None;
        }
        let chunk = self.chunks.get(self.next);
        self.next += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for ChunksIter<'a> {}
