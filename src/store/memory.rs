//! In-memory object store

use crate::model::ContentId;
use crate::store::{ContentStore, Features, StoredObject};
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

/// `HashMap`-backed store for tests and embedding.
///
/// Objects share their payload buffers with callers, so reads are cheap.
#[derive(Default)]
pub struct InMemoryStore {
    objects: RwLock<HashMap<ContentId, StoredObject>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently stored
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ContentStore for InMemoryStore {
    fn supported_features(&self) -> Features {
        Features {
            preserves_ids: true,
        }
    }

    async fn contains(&self, id: &ContentId) -> Result<bool> {
        Ok(self.objects.read().contains_key(id))
    }

    async fn get(&self, id: &ContentId) -> Result<Option<StoredObject>> {
        Ok(self.objects.read().get(id).cloned())
    }

    async fn put_known(
        &self,
        id: ContentId,
        refs: Vec<ContentId>,
        data: Bytes,
    ) -> Result<ContentId> {
        self.objects
            .write()
            .entry(id)
            .or_insert_with(|| StoredObject::new(refs, data));
        Ok(id)
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("object_count", &self.len())
            .finish()
    }
}
