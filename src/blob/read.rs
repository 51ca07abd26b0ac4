//! Range reads across chunk boundaries

use super::{CasBlob, Contents};
use crate::model::ContentId;
use crate::schema::wire::WireMessage;
use crate::schema::{CompressionMethod, FileInfo};
use crate::{Error, Result};
use bytes::{Bytes, BytesMut};
use futures::future::try_join_all;
use std::ops::Range;

impl CasBlob {
    /// Read the whole blob
    pub async fn read_all(&self) -> Result<Bytes> {
        self.read(0..self.size).await
    }

    /// Read `range` of the blob into one contiguous buffer.
    ///
    /// Chunked blobs fetch every overlapping chunk concurrently; the first
    /// failing chunk fails the whole read.
    pub async fn read(&self, range: Range<u64>) -> Result<Bytes> {
        if range.start > range.end || range.end > self.size {
            return Err(Error::BadRange {
                start: range.start,
                end: range.end,
                size: self.size,
            });
        }
        if range.is_empty() {
            return Ok(Bytes::new());
        }

        match &self.contents {
            Contents::Flat { data, .. } => Ok(data.slice(range.start as usize..range.end as usize)),
            Contents::Chunked { chunks, chunk_size } => {
                self.read_chunked(chunks, *chunk_size, range).await
            }
        }
    }

    async fn read_chunked(
        &self,
        chunks: &[ContentId],
        chunk_size: u64,
        range: Range<u64>,
    ) -> Result<Bytes> {
        let chunk_at = |index: u64| {
            chunks.get(index as usize).copied().ok_or_else(|| {
                Error::UnexpectedEncoding(format!(
                    "chunk {} out of {} for offset range {:?}",
                    index,
                    chunks.len(),
                    range
                ))
            })
        };

        // range is non-empty, so end >= 1
        let start_chunk = range.start / chunk_size;
        let end_chunk = range.start.max(range.end.min(self.size) - 1) / chunk_size + 1;

        if end_chunk - start_chunk == 1 {
            let base = start_chunk * chunk_size;
            return self
                .read_from_chunk(chunk_at(start_chunk)?, range.start - base..range.end - base)
                .await;
        }

        let reads = (start_chunk..end_chunk)
            .map(|index| -> Result<(ContentId, Range<u64>)> {
                let base = index * chunk_size;
                let local = range.start.max(base) - base..(range.end - base).min(chunk_size);
                Ok((chunk_at(index)?, local))
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .map(|(id, local)| self.read_from_chunk(id, local));

        let parts = try_join_all(reads).await?;

        let mut combined = BytesMut::with_capacity((range.end - range.start) as usize);
        for part in parts {
            combined.extend_from_slice(&part);
        }
        Ok(combined.freeze())
    }

    /// Read a chunk-local range from one chunk object
    async fn read_from_chunk(&self, id: ContentId, range: Range<u64>) -> Result<Bytes> {
        let object = self.store.get(&id).await?.ok_or(Error::MissingObject(id))?;

        // No refs: the object is the chunk itself.
        if object.refs.is_empty() {
            if range.end > object.data.len() as u64 {
                return Err(Error::UnexpectedEncoding(format!(
                    "chunk {} holds {} bytes, read wants {:?}",
                    id,
                    object.data.len(),
                    range
                )));
            }
            return Ok(object.data.slice(range.start as usize..range.end as usize));
        }

        // Otherwise a wrapper, which only compression produces.
        let info = FileInfo::decode(&object.data)?;
        let wrapped = match object.refs.as_slice() {
            [inner]
                if info.kind.is_blob()
                    && info.fixed_chunk_size().is_some()
                    && info.compression != CompressionMethod::None =>
            {
                *inner
            }
            _ => {
                return Err(Error::UnexpectedEncoding(format!(
                    "chunk {} is a wrapper but not a compressed chunk",
                    id
                )))
            }
        };

        if self.store.get(&wrapped).await?.is_none() {
            return Err(Error::MissingObject(wrapped));
        }
        // No decompression codec is implemented.
        Err(Error::UncompressFailed(wrapped))
    }
}
