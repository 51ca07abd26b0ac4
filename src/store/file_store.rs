//! Directory-backed object store
//!
//! Layout of a store root:
//! ```text
//! <root>/
//!   data.<id>   raw payload bytes
//!   refs.<id>   JSON array of referenced ids (hex strings)
//! ```
//!
//! Before a file is rewritten its current size is compared with the new
//! content; equal sizes skip the write. This is a size check only. Equal ids
//! are expected to carry equal bytes, so it does not guard against hash
//! collisions or a damaged file of the right length.
//!
//! The two files of one put are written concurrently. If one write fails the
//! other is not rolled back and may still complete, so a failed put can leave
//! a refs file beside a short data file that `contains` reports as present.
//! Puts are idempotent but not linearizable; re-putting the object repairs it.

use crate::config::StoreConfig;
use crate::model::ContentId;
use crate::store::pool::WorkerPool;
use crate::store::{ContentStore, Features, StoredObject};
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of the two files an object occupies
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilePrefix {
    Data,
    Refs,
}

impl FilePrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilePrefix::Data => "data.",
            FilePrefix::Refs => "refs.",
        }
    }
}

/// A content-addressed store keeping two files per object in one directory.
///
/// Call [`FileBackedStore::shutdown`] to wait for in-flight I/O. Dropping the
/// store only closes its worker pool: jobs already running finish on their
/// own and no new ones start.
pub struct FileBackedStore {
    root: PathBuf,
    pool: WorkerPool,
}

impl FileBackedStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn open(root: impl AsRef<Path>, worker_threads: usize) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let pool = WorkerPool::new(worker_threads)?;
        fs::create_dir_all(&root)?;

        tracing::info!(root = %root.display(), threads = worker_threads, "opened file-backed store");
        Ok(FileBackedStore { root, pool })
    }

    /// Open the store described by a config
    pub fn with_config(config: &StoreConfig) -> Result<Self> {
        Self::open(config.store_root()?, config.worker_threads)
    }

    /// Get the content root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of one of the two files backing `id`
    pub fn object_path(&self, id: &ContentId, prefix: FilePrefix) -> PathBuf {
        self.root.join(format!("{}{}", prefix.as_str(), id))
    }

    /// Drain the worker pool. Later operations fail.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

impl Drop for FileBackedStore {
    fn drop(&mut self) {
        self.pool.close();
    }
}

fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write `data` unless the file already has the same length.
/// Returns whether a write happened.
fn write_if_needed(path: &Path, data: &[u8]) -> Result<bool> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    if file.metadata()?.len() == data.len() as u64 {
        return Ok(false);
    }

    file.set_len(0)?;
    file.write_all(data)?;
    Ok(true)
}

#[async_trait]
impl ContentStore for FileBackedStore {
    fn supported_features(&self) -> Features {
        Features {
            preserves_ids: true,
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(id = %id))]
    async fn contains(&self, id: &ContentId) -> Result<bool> {
        let refs = self.object_path(id, FilePrefix::Refs);
        let data = self.object_path(id, FilePrefix::Data);
        self.pool
            .run(move || Ok(refs.try_exists()? && data.try_exists()?))
            .await
    }

    #[tracing::instrument(level = "trace", skip_all, fields(id = %id))]
    async fn get(&self, id: &ContentId) -> Result<Option<StoredObject>> {
        let refs_path = self.object_path(id, FilePrefix::Refs);
        let data_path = self.object_path(id, FilePrefix::Data);

        let object = self
            .pool
            .run(move || {
                let Some(refs) = read_if_exists(&refs_path)? else {
                    return Ok(None);
                };
                let refs: Vec<ContentId> = serde_json::from_slice(&refs)?;

                let Some(data) = read_if_exists(&data_path)? else {
                    return Ok(None);
                };
                Ok(Some(StoredObject::new(refs, data)))
            })
            .await?;

        if object.is_none() {
            debug!(id = %id.short(), "object not present");
        }
        Ok(object)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(id = %id, len = data.len()))]
    async fn put_known(
        &self,
        id: ContentId,
        refs: Vec<ContentId>,
        data: Bytes,
    ) -> Result<ContentId> {
        let refs_json = serde_json::to_vec(&refs)?;
        let data_path = self.object_path(&id, FilePrefix::Data);
        let refs_path = self.object_path(&id, FilePrefix::Refs);

        let write_data = self.pool.run(move || write_if_needed(&data_path, &data));
        let write_refs = self.pool.run(move || write_if_needed(&refs_path, &refs_json));
        let (wrote_data, wrote_refs) = tokio::try_join!(write_data, write_refs)?;

        if wrote_data || wrote_refs {
            debug!(id = %id.short(), refs = refs.len(), "stored object");
        } else {
            debug!(id = %id.short(), "object already present, skipped write");
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_creates_root_recursively() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("a").join("b").join("objects");

        let store = FileBackedStore::open(&root, 2).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let dir = tempdir().unwrap();
        let store = FileBackedStore::open(dir.path(), 2).unwrap();

        let child = store.put(vec![], Bytes::from_static(b"child")).await.unwrap();
        let id = store
            .put(vec![child], Bytes::from_static(b"parent"))
            .await
            .unwrap();

        let object = store.get(&id).await.unwrap().unwrap();
        assert_eq!(object.refs, vec![child]);
        assert_eq!(object.data.as_ref(), b"parent");
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let dir = tempdir().unwrap();
        let store = FileBackedStore::open(dir.path(), 2).unwrap();

        let id = ContentId::compute(&[], b"never stored");
        assert!(store.get(&id).await.unwrap().is_none());
        assert!(!store.contains(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_file_layout() {
        let dir = tempdir().unwrap();
        let store = FileBackedStore::open(dir.path(), 2).unwrap();

        let id = store.put(vec![], Bytes::from_static(b"layout")).await.unwrap();

        let data = dir.path().join(format!("data.{}", id.to_hex()));
        let refs = dir.path().join(format!("refs.{}", id.to_hex()));
        assert_eq!(fs::read(&data).unwrap(), b"layout");
        assert_eq!(fs::read_to_string(&refs).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_contains_needs_both_files() {
        let dir = tempdir().unwrap();
        let store = FileBackedStore::open(dir.path(), 2).unwrap();

        let id = store.put(vec![], Bytes::from_static(b"both")).await.unwrap();
        assert!(store.contains(&id).await.unwrap());

        fs::remove_file(store.object_path(&id, FilePrefix::Refs)).unwrap();
        assert!(!store.contains(&id).await.unwrap());
        assert!(store.get(&id).await.unwrap().is_none());

        let other = store.put(vec![], Bytes::from_static(b"data")).await.unwrap();
        fs::remove_file(store.object_path(&other, FilePrefix::Data)).unwrap();
        assert!(!store.contains(&other).await.unwrap());
        assert!(store.get(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_root_is_an_error() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("objects");
        let store = FileBackedStore::open(&root, 2).unwrap();
        let id = store.put(vec![], Bytes::from_static(b"gone")).await.unwrap();

        // Lookups under a regular file fail with "Not a directory".
        fs::remove_dir_all(&root).unwrap();
        fs::write(&root, b"not a directory").unwrap();

        assert!(matches!(store.contains(&id).await, Err(crate::Error::Io(_))));
        assert!(matches!(store.get(&id).await, Err(crate::Error::Io(_))));
    }

    #[tokio::test]
    async fn test_put_known_keeps_the_given_id() {
        let dir = tempdir().unwrap();
        let store = FileBackedStore::open(dir.path(), 2).unwrap();
        assert!(store.supported_features().preserves_ids);

        let chosen = ContentId::from_bytes([7u8; 32]);
        let id = store
            .put_known(chosen, vec![], Bytes::from_static(b"anything"))
            .await
            .unwrap();

        assert_eq!(id, chosen);
        let object = store.get(&chosen).await.unwrap().unwrap();
        assert_eq!(object.data.as_ref(), b"anything");
    }

    #[tokio::test]
    async fn test_deduplication() {
        let dir = tempdir().unwrap();
        let store = FileBackedStore::open(dir.path(), 2).unwrap();

        let a = store.put(vec![], Bytes::from_static(b"dup")).await.unwrap();
        let b = store.put(vec![], Bytes::from_static(b"dup")).await.unwrap();

        assert_eq!(a, b);
        let object = store.get(&a).await.unwrap().unwrap();
        assert_eq!(object.data.as_ref(), b"dup");
    }

    #[tokio::test]
    async fn test_same_size_content_is_not_rewritten() {
        let dir = tempdir().unwrap();
        let store = FileBackedStore::open(dir.path(), 2).unwrap();

        let id = ContentId::from_bytes([1u8; 32]);
        store
            .put_known(id, vec![], Bytes::from_static(b"aaaa"))
            .await
            .unwrap();
        store
            .put_known(id, vec![], Bytes::from_static(b"bbbb"))
            .await
            .unwrap();

        let object = store.get(&id).await.unwrap().unwrap();
        assert_eq!(object.data.as_ref(), b"aaaa");
    }

    #[tokio::test]
    async fn test_different_size_content_is_rewritten() {
        let dir = tempdir().unwrap();
        let store = FileBackedStore::open(dir.path(), 2).unwrap();

        let id = ContentId::from_bytes([2u8; 32]);
        store
            .put_known(id, vec![], Bytes::from_static(b"longer text"))
            .await
            .unwrap();
        store
            .put_known(id, vec![], Bytes::from_static(b"short"))
            .await
            .unwrap();

        let object = store.get(&id).await.unwrap().unwrap();
        assert_eq!(object.data.as_ref(), b"short");
    }

    #[tokio::test]
    async fn test_empty_payload() {
        let dir = tempdir().unwrap();
        let store = FileBackedStore::open(dir.path(), 2).unwrap();

        let id = store.put(vec![], Bytes::new()).await.unwrap();
        assert!(store.contains(&id).await.unwrap());
        assert!(store.get(&id).await.unwrap().unwrap().data.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_refs_file_is_an_error() {
        let dir = tempdir().unwrap();
        let store = FileBackedStore::open(dir.path(), 2).unwrap();

        let id = store.put(vec![], Bytes::from_static(b"x")).await.unwrap();
        fs::write(store.object_path(&id, FilePrefix::Refs), b"not json").unwrap();

        assert!(matches!(store.get(&id).await, Err(crate::Error::Json(_))));
    }

    #[tokio::test]
    async fn test_persistence() {
        let dir = tempdir().unwrap();

        let id = {
            let store = FileBackedStore::open(dir.path(), 2).unwrap();
            let id = store
                .put(vec![], Bytes::from_static(b"persistent"))
                .await
                .unwrap();
            store.shutdown().await;
            id
        };

        let store = FileBackedStore::open(dir.path(), 2).unwrap();
        let object = store.get(&id).await.unwrap().unwrap();
        assert_eq!(object.data.as_ref(), b"persistent");
    }

    #[tokio::test]
    async fn test_operations_fail_after_shutdown() {
        let dir = tempdir().unwrap();
        let store = FileBackedStore::open(dir.path(), 1).unwrap();
        store.shutdown().await;

        let result = store.put(vec![], Bytes::from_static(b"late")).await;
        assert!(matches!(result, Err(crate::Error::Worker(_))));
    }

    #[tokio::test]
    async fn test_drop_closes_pool() {
        let dir = tempdir().unwrap();
        let store = FileBackedStore::open(dir.path(), 2).unwrap();
        store.put(vec![], Bytes::from_static(b"x")).await.unwrap();

        let pool = store.pool.clone();
        drop(store);
        assert!(pool.is_shut_down());
    }
}
