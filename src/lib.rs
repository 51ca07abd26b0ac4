//! # chunkcas
//!
//! A content-addressed object store with a logical blob layer, used as a
//! build system's artifact cache.
//!
//! ## Core Concepts
//!
//! - **ContentId**: BLAKE3 digest of an object's payload and its ordered refs
//! - **ContentStore**: durable `ContentId → (data, refs)` mapping
//! - **FileInfo**: metadata record wrapping chunked or executable content
//! - **CasBlob**: byte-addressable view over flat or chunked content, with
//!   range reads that span chunk boundaries
//!
//! ## Example
//!
//! ```ignore
//! use chunkcas::{CasBlob, FileBackedStore, ImportOptions};
//! use std::sync::Arc;
//!
//! let store = Arc::new(FileBackedStore::open("/tmp/cas", 6)?);
//! let blob = CasBlob::import(bytes::Bytes::from("hello"), ImportOptions::default(), store).await?;
//! let id = blob.export().await?;
//! ```

pub mod blob;
pub mod config;
pub mod model;
pub mod schema;
pub mod store;

mod error;

pub use blob::{CasBlob, ImportOptions, ReceivedId, MAX_CHUNK_SIZE};
pub use config::StoreConfig;
pub use error::{Error, Result};
pub use model::ContentId;
pub use schema::{
    CompressionMethod, DirectoryEntries, DirectoryEntry, DirectoryEntryId, FileInfo, FilePayload,
    FileType, PosixFileDetails,
};
pub use store::{
    open_url, ContentStore, FileBackedStore, FileStoreScheme, InMemoryStore, StoreScheme,
    StoredObject,
};
