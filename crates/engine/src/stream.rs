//! Sequential whole-file streaming.

use crate::error::{EngineError, EngineResult};
use crate::reader::ChunkReader;
use bytes::Bytes;
use chunkvault_core::FileId;
use chunkvault_core::chunk::next_index;
use futures::Stream;
use std::pin::Pin;
use tracing::warn;

/// Chunks of one file in index order. Not restartable.
pub type FileStream = Pin<Box<dyn Stream<Item = EngineResult<Bytes>> + Send + 'static>>;

/// Stream `file` from chunk 0 until a chunk reports it is the last.
///
/// One chunk is in memory at a time. The first error ends the stream:
/// - chunk 0 missing: `NotFound`
/// - a later chunk missing: `BrokenSequence`
/// - timeouts and oversized chunks are passed through as-is
pub fn stream_file(reader: ChunkReader, file: FileId, size_cap: u64) -> FileStream {
    let stream = async_stream::try_stream! {
        let mut index = 0u64;
        loop {
            let chunk = match reader.read_chunk(&file, index, size_cap).await {
                Ok(chunk) => chunk,
                Err(EngineError::NotFound { .. }) if index > 0 => {
                    warn!(file_id = %file, index, "Chunk sequence ends without a last chunk");
                    Err(EngineError::BrokenSequence {
                        file_id: file.to_string(),
                        index,
                    })?
                }
                Err(e) => Err(e)?,
            };

            let is_last = chunk.is_last;
            yield chunk.data;
            if is_last {
                break;
            }
            index = next_index(index).map_err(EngineError::from)?;
        }
    };

    Box::pin(stream)
}
