//! Content-addressed object store
//!
//! Objects are immutable `(data, refs)` pairs keyed by the [`ContentId`]
//! computed from both. Re-putting identical content is a no-op in effect.
//! Concurrent puts of the same id are not serialized: they are idempotent
//! because equal ids carry equal bytes, but not linearizable.

mod file_store;
mod memory;
mod pool;
mod scheme;

pub use file_store::{FileBackedStore, FilePrefix};
pub use memory::InMemoryStore;
pub use pool::WorkerPool;
pub use scheme::{open_url, FileStoreScheme, StoreScheme};

use crate::model::ContentId;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// An immutable stored object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub refs: Vec<ContentId>,
    pub data: Bytes,
}

impl StoredObject {
    pub fn new(refs: Vec<ContentId>, data: impl Into<Bytes>) -> Self {
        StoredObject {
            refs,
            data: data.into(),
        }
    }
}

/// Capabilities advertised by a store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Features {
    /// Ids passed to [`ContentStore::put_known`] are kept verbatim
    pub preserves_ids: bool,
}

/// A durable id → object mapping
#[async_trait]
pub trait ContentStore: Send + Sync {
    fn supported_features(&self) -> Features;

    /// True iff both the refs and the data of `id` are present
    async fn contains(&self, id: &ContentId) -> Result<bool>;

    /// Fetch an object. A missing object is `Ok(None)`, not an error.
    async fn get(&self, id: &ContentId) -> Result<Option<StoredObject>>;

    /// Compute the id `put` would assign, without any I/O
    fn identify(&self, refs: &[ContentId], data: &[u8]) -> ContentId {
        ContentId::compute(refs, data)
    }

    /// Store an object under its computed id
    async fn put(&self, refs: Vec<ContentId>, data: Bytes) -> Result<ContentId> {
        let id = self.identify(&refs, &data);
        self.put_known(id, refs, data).await
    }

    /// Store an object under an id the caller vouches for.
    ///
    /// The id is not re-verified against the content.
    async fn put_known(&self, id: ContentId, refs: Vec<ContentId>, data: Bytes)
        -> Result<ContentId>;
}
