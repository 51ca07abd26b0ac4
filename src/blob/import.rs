//! Import and export of blobs

use super::{CasBlob, Contents, ReceivedId, MAX_CHUNK_SIZE};
use crate::model::ContentId;
use crate::schema::wire::WireMessage;
use crate::schema::{DirectoryEntry, DirectoryEntryId, FileInfo, FileType, PosixFileDetails};
use crate::store::ContentStore;
use crate::Result;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// How [`CasBlob::import`] should record the payload
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub executable: bool,
    pub posix_details: Option<PosixFileDetails>,
}

impl ImportOptions {
    pub fn executable() -> Self {
        ImportOptions {
            executable: true,
            posix_details: None,
        }
    }

    pub fn with_posix_details(mut self, details: PosixFileDetails) -> Self {
        self.posix_details = Some(details);
        self
    }
}

/// Put `data` as a refless object unless it is already present
async fn put_if_absent(store: &dyn ContentStore, data: Bytes) -> Result<ContentId> {
    let id = store.identify(&[], &data);
    if store.contains(&id).await? {
        debug!(id = %id.short(), "payload already stored");
        return Ok(id);
    }
    store.put(vec![], data).await
}

impl CasBlob {
    /// Store `data` and return the blob it became.
    ///
    /// Plain files up to [`MAX_CHUNK_SIZE`] are stored flat. Executables and
    /// larger files get a [`FileInfo`] wrapper around a single chunk holding
    /// the whole payload.
    pub async fn import(
        data: Bytes,
        options: ImportOptions,
        store: Arc<dyn ContentStore>,
    ) -> Result<Self> {
        let size = data.len() as u64;
        let blob_id = put_if_absent(store.as_ref(), data.clone()).await?;

        if !options.executable && size <= MAX_CHUNK_SIZE {
            debug!(id = %blob_id.short(), size, "imported flat blob");
            return Ok(CasBlob {
                store,
                received_id: ReceivedId::Inner(blob_id),
                size,
                kind: FileType::PlainFile,
                posix_details: options.posix_details,
                contents: Contents::Flat {
                    chunk: blob_id,
                    data,
                },
            });
        }

        let kind = if options.executable {
            FileType::Executable
        } else {
            FileType::PlainFile
        };
        let info = FileInfo::single_chunk(kind, size, options.posix_details);
        let outer = store
            .put(vec![blob_id], Bytes::from(info.encode_to_vec()))
            .await?;

        debug!(id = %outer.short(), chunk = %blob_id.short(), size, "imported wrapped blob");
        Ok(CasBlob {
            store,
            received_id: ReceivedId::Outer(outer),
            size,
            kind,
            posix_details: options.posix_details,
            contents: Contents::Chunked {
                chunks: vec![blob_id],
                chunk_size: size,
            },
        })
    }

    /// The id that imports back to this blob's bytes and kind.
    ///
    /// Wrapped blobs return their wrapper. A flat plain file is its own
    /// chunk. Anything else reached through an inner id gets a new wrapper.
    pub async fn export(&self) -> Result<ContentId> {
        let inner = match self.received_id {
            ReceivedId::Outer(id) => return Ok(id),
            ReceivedId::Inner(id) => id,
        };

        if let [chunk] = self.chunk_ids() {
            if self.kind == FileType::PlainFile {
                return Ok(*chunk);
            }
        }

        let info = FileInfo::single_chunk(self.kind, self.size, self.posix_details);
        self.store
            .put(vec![inner], Bytes::from(info.encode_to_vec()))
            .await
    }

    /// Pair this blob with `name` for a directory listing.
    ///
    /// Single-chunk blobs point straight at their chunk.
    ///
    /// # Panics
    ///
    /// If the blob was reached through an inner id yet spans several chunks.
    /// Such a blob has no wrapper to point at and cannot be built through
    /// the public constructors.
    pub fn as_directory_entry(&self, name: impl Into<String>) -> DirectoryEntryId {
        let info = DirectoryEntry {
            name: name.into(),
            kind: self.kind,
            size: self.size,
            posix_details: self.posix_details,
        };

        if let [chunk] = self.chunk_ids() {
            return DirectoryEntryId { info, id: *chunk };
        }
        match self.received_id {
            ReceivedId::Outer(id) => DirectoryEntryId { info, id },
            ReceivedId::Inner(_) => {
                panic!("multi-chunk blob cannot be represented with an inner id")
            }
        }
    }
}
