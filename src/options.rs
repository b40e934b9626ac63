use serde::{Deserialize, Serialize};

/// Five mebibytes.
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 5 * 1024 * 1024;

/// Options controlling how a layer table is encoded and chunked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationOptions {
    /// Narrow numeric property columns when no precision is lost.
    pub auto_downcast: bool,

    /// Upper bound on the encoded size of one chunk under the byte-budget policy.
    pub max_chunk_bytes: usize,
}

impl Default for SerializationOptions {
    fn default() -> Self {
        Self {
            auto_downcast: true,
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
        }
    }
}
