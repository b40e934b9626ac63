use std::io::Write;

use arrow_ipc::writer::{IpcWriteOptions, StreamWriter};

use crate::chunk::{Chunk, Chunks};
use crate::error::Result;

/// Write one chunk as a complete Arrow IPC stream.
pub fn write_chunk_stream<W: Write>(chunk: &Chunk, writer: W) -> Result<()> {
    write_chunk_stream_with_options(chunk, writer, IpcWriteOptions::default())
}

/// Write one chunk as a complete Arrow IPC stream, e.g. with buffer compression enabled.
pub fn write_chunk_stream_with_options<W: Write>(
    chunk: &Chunk,
    writer: W,
    options: IpcWriteOptions,
) -> Result<()> {
    let batch = chunk.record_batch();
    let mut writer = StreamWriter::try_new_with_options(writer, &batch.schema(), options)?;
    writer.write(batch)?;
    writer.finish()?;
    Ok(())
}

/// Write every chunk as one record batch of a single Arrow IPC stream.
pub fn write_chunks_stream<W: Write>(chunks: &Chunks, writer: W) -> Result<()> {
    let mut iter = chunks.iter();
    let Some(first) = iter.next() else {
        return Ok(());
    };
    let first = first?;
    let schema = first.record_batch().schema();
    let mut writer = StreamWriter::try_new(writer, &schema)?;
    writer.write(first.record_batch())?;
    for chunk in iter {
        writer.write(chunk?.record_batch())?;
    }
    writer.finish()?;
    Ok(())
}

impl Chunk {
    /// This chunk encoded as a standalone Arrow IPC stream.
    pub fn to_ipc_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        write_chunk_stream(self, &mut buffer)?;
        Ok(buffer)
    }
}
