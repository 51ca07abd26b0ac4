//! Logical blobs over stored objects
//!
//! A blob is a read-only view over one or more stored objects. Three
//! encodings coexist in a store:
//!
//! - **flat**: an object with no refs whose data is the content verbatim
//! - **single-chunk wrapped**: a [`FileInfo`] object whose fixed chunk size
//!   equals its size, with exactly one ref holding the content
//! - **chunked**: a [`FileInfo`] object whose refs are the content chunks,
//!   all `chunk_size` long except possibly the last
//!
//! [`CasBlob::parse`] accepts all three; [`CasBlob::import`] writes the first
//! two; [`CasBlob::export`] returns the id that re-imports to the same bytes.

mod import;
mod read;

pub use import::ImportOptions;

use crate::model::ContentId;
use crate::schema::wire::WireMessage;
use crate::schema::{FileInfo, FileType, PosixFileDetails};
use crate::store::{ContentStore, StoredObject};
use crate::{Error, Result};
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Payloads above this size, and all executables, are stored behind a wrapper
pub const MAX_CHUNK_SIZE: u64 = 8 * 1024 * 1024;

/// The id a blob was reached through
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "form", content = "id", rename_all = "snake_case")]
pub enum ReceivedId {
    /// A raw, unwrapped payload object
    Inner(ContentId),
    /// A [`FileInfo`] wrapper object
    Outer(ContentId),
}

impl ReceivedId {
    pub fn id(&self) -> ContentId {
        match self {
            ReceivedId::Inner(id) | ReceivedId::Outer(id) => *id,
        }
    }
}

#[derive(Clone, Debug)]
enum Contents {
    /// Content held in memory, stored as the single object `chunk`
    Flat { chunk: ContentId, data: Bytes },
    /// Content spread over `chunks`, fetched on read
    Chunked {
        chunks: Vec<ContentId>,
        chunk_size: u64,
    },
}

/// A byte-addressable view over stored content
#[derive(Clone)]
pub struct CasBlob {
    store: Arc<dyn ContentStore>,
    received_id: ReceivedId,
    size: u64,
    kind: FileType,
    posix_details: Option<PosixFileDetails>,
    contents: Contents,
}

impl CasBlob {
    /// Interpret the object `id` as a blob
    pub async fn parse(id: ContentId, store: Arc<dyn ContentStore>) -> Result<Self> {
        Self::parse_as(id, store, FileType::PlainFile).await
    }

    /// Like [`CasBlob::parse`], but a flat object takes `advertised` as its
    /// kind. Callers use this when the kind is known from a directory entry.
    pub async fn parse_as(
        id: ContentId,
        store: Arc<dyn ContentStore>,
        advertised: FileType,
    ) -> Result<Self> {
        let object = store.get(&id).await?.ok_or(Error::MissingObject(id))?;
        Self::from_object(id, object, store, advertised).await
    }

    async fn from_object(
        id: ContentId,
        object: StoredObject,
        store: Arc<dyn ContentStore>,
        advertised: FileType,
    ) -> Result<Self> {
        // No refs: an old-style or small blob stored as-is.
        if object.refs.is_empty() {
            return Ok(CasBlob {
                store,
                received_id: ReceivedId::Inner(id),
                size: object.data.len() as u64,
                kind: advertised,
                posix_details: None,
                contents: Contents::Flat {
                    chunk: id,
                    data: object.data,
                },
            });
        }

        let info = FileInfo::decode(&object.data)?;
        if !info.kind.is_blob() {
            return Err(Error::NotABlob(format!("{} has kind {:?}", id, info.kind)));
        }
        let chunk_size = info
            .fixed_chunk_size()
            .ok_or_else(|| Error::NotABlob(format!("{} is not split in fixed-size chunks", id)))?;

        let contents = if chunk_size == info.size {
            let [chunk] = object.refs.as_slice() else {
                return Err(Error::UnexpectedEncoding(format!(
                    "single-chunk blob {} has {} refs",
                    id,
                    object.refs.len()
                )));
            };
            let chunk = *chunk;
            let inner = store.get(&chunk).await?.ok_or(Error::MissingObject(chunk))?;
            if inner.data.len() as u64 != info.size {
                return Err(Error::UnexpectedEncoding(format!(
                    "chunk {} holds {} bytes, wrapper {} declares {}",
                    chunk,
                    inner.data.len(),
                    id,
                    info.size
                )));
            }
            Contents::Flat {
                chunk,
                data: inner.data,
            }
        } else {
            let expected = if chunk_size == 0 {
                None
            } else {
                Some(info.size.div_ceil(chunk_size))
            };
            if expected != Some(object.refs.len() as u64) {
                return Err(Error::UnexpectedEncoding(format!(
                    "blob {} of size {} with chunk size {} has {} refs",
                    id,
                    info.size,
                    chunk_size,
                    object.refs.len()
                )));
            }
            Contents::Chunked {
                chunks: object.refs,
                chunk_size,
            }
        };

        Ok(CasBlob {
            store,
            received_id: ReceivedId::Outer(id),
            size: info.size,
            kind: info.kind,
            posix_details: info.posix_details,
            contents,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn kind(&self) -> FileType {
        self.kind
    }

    pub fn posix_details(&self) -> Option<PosixFileDetails> {
        self.posix_details
    }

    pub fn received_id(&self) -> ReceivedId {
        self.received_id
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Ids of the objects holding the content, in order
    pub fn chunk_ids(&self) -> &[ContentId] {
        match &self.contents {
            Contents::Flat { chunk, .. } => std::slice::from_ref(chunk),
            Contents::Chunked { chunks, .. } => chunks,
        }
    }

    /// Chunk length for chunked blobs, `None` when the content is in memory
    pub fn chunk_size(&self) -> Option<u64> {
        match &self.contents {
            Contents::Flat { .. } => None,
            Contents::Chunked { chunk_size, .. } => Some(*chunk_size),
        }
    }
}

impl fmt::Debug for CasBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CasBlob")
            .field("received_id", &self.received_id)
            .field("size", &self.size)
            .field("kind", &self.kind)
            .field("chunks", &self.chunk_ids().len())
            .finish()
    }
}
