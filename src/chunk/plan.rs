use serde::{Deserialize, Serialize};

use crate::error::{LayerError, Result};
use crate::table::LayerTable;

/// How the rows of a layer are distributed over chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkPolicy {
    /// Fit as many rows into a chunk as a byte budget allows.
    #[default]
    ByteBudget,
    /// Send every row in one chunk, for layers that aggregate over the whole dataset.
    WholeTable,
}

/// Number of tiles kept in memory by tile-based raster layers.
///
/// Tile layers load data per viewport tile rather than per row, so they are sized by this policy
/// and not by [`plan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileCachePolicy {
    /// A multiple of the number of tiles visible in the current viewport.
    ViewportMultiple(usize),
    /// A fixed number of tiles.
    Fixed(usize),
}

impl Default for TileCachePolicy {
    fn default() -> Self {
        Self::ViewportMultiple(5)
    }
}

impl TileCachePolicy {
    pub fn cache_size(&self, viewport_tiles: usize) -> usize {
        match self {
            TileCachePolicy::ViewportMultiple(factor) => factor.saturating_mul(viewport_tiles),
            TileCachePolicy::Fixed(size) => *size,
        }
    }
}

/// The number of rows of `table` that fit into a chunk of at most `max_chunk_bytes`.
///
/// The estimate assumes every row takes the table's average row size. The result is at least 1
/// and at most the table's row count.
///
/// # Errors
///
/// - if `max_chunk_bytes` is zero
pub fn plan(table: &LayerTable, max_chunk_bytes: usize) -> Result<usize> {
    plan_rows(table.len(), table.nbytes()?, max_chunk_bytes)
}

/// [`plan`] for a table of `row_count` rows occupying `nbytes` bytes.
pub fn plan_rows(row_count: usize, nbytes: usize, max_chunk_bytes: usize) -> Result<usize> {
    if max_chunk_bytes == 0 {
        return Err(LayerError::InvalidRange {
            field: "max_chunk_bytes".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    if row_count == 0 {
        return Ok(1);
    }
    if nbytes == 0 {
        return Ok(row_count);
    }

    // floor(max_chunk_bytes / (nbytes / row_count)) without rounding the row size
    let rows = (max_chunk_bytes as u128 * row_count as u128) / nbytes as u128;
    let rows = rows.clamp(1, row_count as u128) as usize;
    log::debug!(
        "Planned {} rows per chunk for {} rows ({} bytes) with a {} byte budget",
        rows,
        row_count,
        nbytes,
        max_chunk_bytes
    );
    Ok(rows)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn small_rows_clamp_to_row_count() {
        // 10,000 rows averaging 40 bytes: 25,000 rows would fit
        assert_eq!(plan_rows(10_000, 400_000, 1_000_000).unwrap(), 10_000);
    }

    #[test]
    fn large_rows_split() {
        assert_eq!(plan_rows(1000, 1_000_000, 100_000).unwrap(), 100);
        // a single row larger than the budget still gets a chunk
        assert_eq!(plan_rows(3, 30_000_000, 1).unwrap(), 1);
        // uneven row sizes floor rather than round
        assert_eq!(plan_rows(3, 10, 7).unwrap(), 2);
    }

    #[test]
    fn planner_bounds() {
        for row_count in [1, 2, 7, 1000, 123_457] {
            for nbytes in [0, 1, 17, 4096, usize::MAX / 2] {
                for budget in [1, 3, 1 << 20, usize::MAX] {
                    let rows = plan_rows(row_count, nbytes, budget).unwrap();
                    assert!(rows >= 1);
                    assert!(rows <= row_count);
                }
            }
        }
    }

    #[test]
    fn zero_budget_is_invalid() {
        let err = plan_rows(10, 100, 0).unwrap_err();
        assert!(matches!(err, LayerError::InvalidRange { .. }));
    }

    #[test]
    fn tile_cache() {
        assert_eq!(TileCachePolicy::default().cache_size(12), 60);
        assert_eq!(TileCachePolicy::Fixed(256).cache_size(12), 256);
    }
}
