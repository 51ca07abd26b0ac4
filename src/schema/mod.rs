//! Metadata schema for stored entities
//!
//! These records describe what a stored object is: its file kind, logical
//! size, compression, POSIX attributes and how its content is laid out
//! (fixed-size chunks or directory children). Field numbers are fixed:
//!
//! ```text
//! PosixFileDetails   1=mode 2=owner 3=group
//! DirectoryEntry     1=name 2=kind 3=size 4=posix_details
//! DirectoryEntries   1=entries (repeated)
//! FileInfo           1=kind 2=size 3=posix_permissions (legacy) 4=compression
//!                    5=posix_details 11|12|13=payload (oneof)
//! ```
//!
//! Default values are never written, and an absent field decodes to its
//! default. The payload branches are always written when set, even when the
//! value is zero.

pub mod wire;

use crate::model::ContentId;
use serde::Serialize;
use wire::{DecodeError, WireMessage, WireType};

/// Kind of a stored entity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    #[default]
    PlainFile,
    Executable,
    Directory,
    Symlink,
    /// A value this version does not know, preserved as-is
    Unrecognized(i32),
}

impl FileType {
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => FileType::PlainFile,
            1 => FileType::Executable,
            2 => FileType::Directory,
            3 => FileType::Symlink,
            other => FileType::Unrecognized(other),
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            FileType::PlainFile => 0,
            FileType::Executable => 1,
            FileType::Directory => 2,
            FileType::Symlink => 3,
            FileType::Unrecognized(v) => *v,
        }
    }

    /// Whether a blob may have this kind
    pub fn is_blob(&self) -> bool {
        matches!(self, FileType::PlainFile | FileType::Executable)
    }
}

/// Compression applied to stored data. No codec is implemented yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMethod {
    #[default]
    None,
    Unrecognized(i32),
}

impl CompressionMethod {
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => CompressionMethod::None,
            other => CompressionMethod::Unrecognized(other),
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            CompressionMethod::None => 0,
            CompressionMethod::Unrecognized(v) => *v,
        }
    }
}

/// POSIX permissions and ownership
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PosixFileDetails {
    pub mode: u32,
    pub owner: u32,
    pub group: u32,
}

impl WireMessage for PosixFileDetails {
    fn encode_raw(&self, buf: &mut Vec<u8>) {
        if self.mode != 0 {
            wire::write_uint32(1, self.mode, buf);
        }
        if self.owner != 0 {
            wire::write_uint32(2, self.owner, buf);
        }
        if self.group != 0 {
            wire::write_uint32(3, self.group, buf);
        }
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        buf: &mut &[u8],
    ) -> Result<(), DecodeError> {
        match field {
            1 => self.mode = wire::read_uint32(field, wire_type, buf)?,
            2 => self.owner = wire::read_uint32(field, wire_type, buf)?,
            3 => self.group = wire::read_uint32(field, wire_type, buf)?,
            _ => wire::skip_field(wire_type, buf)?,
        }
        Ok(())
    }
}

/// A named entry in a directory listing
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: FileType,
    pub size: u64,
    pub posix_details: Option<PosixFileDetails>,
}

impl WireMessage for DirectoryEntry {
    fn encode_raw(&self, buf: &mut Vec<u8>) {
        if !self.name.is_empty() {
            wire::write_string(1, &self.name, buf);
        }
        if self.kind != FileType::PlainFile {
            wire::write_enum(2, self.kind.as_i32(), buf);
        }
        if self.size != 0 {
            wire::write_uint64(3, self.size, buf);
        }
        if let Some(details) = &self.posix_details {
            wire::write_message(4, details, buf);
        }
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        buf: &mut &[u8],
    ) -> Result<(), DecodeError> {
        match field {
            1 => self.name = wire::read_string(field, wire_type, buf)?,
            2 => self.kind = FileType::from_i32(wire::read_enum(field, wire_type, buf)?),
            3 => self.size = wire::read_uint64(field, wire_type, buf)?,
            4 => {
                let details = self.posix_details.get_or_insert_with(Default::default);
                wire::read_message(field, wire_type, buf, details)?;
            }
            _ => wire::skip_field(wire_type, buf)?,
        }
        Ok(())
    }
}

/// An ordered directory listing
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryEntries {
    pub entries: Vec<DirectoryEntry>,
}

impl WireMessage for DirectoryEntries {
    fn encode_raw(&self, buf: &mut Vec<u8>) {
        for entry in &self.entries {
            wire::write_message(1, entry, buf);
        }
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        buf: &mut &[u8],
    ) -> Result<(), DecodeError> {
        match field {
            1 => {
                let mut entry = DirectoryEntry::default();
                wire::read_message(field, wire_type, buf, &mut entry)?;
                self.entries.push(entry);
            }
            _ => wire::skip_field(wire_type, buf)?,
        }
        Ok(())
    }
}

/// How the content of a [`FileInfo`] is laid out
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilePayload {
    /// Content is split into refs of this many bytes, the last possibly short
    FixedChunkSize(u64),
    /// Directory children listed inline
    InlineChildren(DirectoryEntries),
    /// Directory children stored in a separate tree
    ReferencedChildrenTree(u32),
}

/// Metadata record wrapping a non-flat stored object
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub kind: FileType,
    pub size: u64,
    /// Superseded by `posix_details`, kept for old encoders
    pub posix_permissions: u32,
    pub compression: CompressionMethod,
    pub posix_details: Option<PosixFileDetails>,
    pub payload: Option<FilePayload>,
}

impl FileInfo {
    /// The wrapper used for a blob stored as a single logical chunk
    pub fn single_chunk(kind: FileType, size: u64, posix_details: Option<PosixFileDetails>) -> Self {
        FileInfo {
            kind,
            size,
            posix_permissions: 0,
            compression: CompressionMethod::None,
            posix_details,
            // TODO: split payloads larger than MAX_CHUNK_SIZE into several chunks
            payload: Some(FilePayload::FixedChunkSize(size)),
        }
    }

    pub fn fixed_chunk_size(&self) -> Option<u64> {
        match self.payload {
            Some(FilePayload::FixedChunkSize(size)) => Some(size),
            _ => None,
        }
    }

    fn set_payload(&mut self, field: u32, payload: FilePayload) -> Result<(), DecodeError> {
        if self.payload.is_some() {
            return Err(DecodeError::ConflictingOneOf(field));
        }
        self.payload = Some(payload);
        Ok(())
    }
}

impl WireMessage for FileInfo {
    fn encode_raw(&self, buf: &mut Vec<u8>) {
        if self.kind != FileType::PlainFile {
            wire::write_enum(1, self.kind.as_i32(), buf);
        }
        if self.size != 0 {
            wire::write_uint64(2, self.size, buf);
        }
        if self.posix_permissions != 0 {
            wire::write_uint32(3, self.posix_permissions, buf);
        }
        if self.compression != CompressionMethod::None {
            wire::write_enum(4, self.compression.as_i32(), buf);
        }
        if let Some(details) = &self.posix_details {
            wire::write_message(5, details, buf);
        }
        match &self.payload {
            Some(FilePayload::FixedChunkSize(size)) => wire::write_uint64(11, *size, buf),
            Some(FilePayload::InlineChildren(children)) => wire::write_message(12, children, buf),
            Some(FilePayload::ReferencedChildrenTree(n)) => wire::write_uint32(13, *n, buf),
            None => {}
        }
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        buf: &mut &[u8],
    ) -> Result<(), DecodeError> {
        match field {
            1 => self.kind = FileType::from_i32(wire::read_enum(field, wire_type, buf)?),
            2 => self.size = wire::read_uint64(field, wire_type, buf)?,
            3 => self.posix_permissions = wire::read_uint32(field, wire_type, buf)?,
            4 => {
                self.compression =
                    CompressionMethod::from_i32(wire::read_enum(field, wire_type, buf)?)
            }
            5 => {
                let details = self.posix_details.get_or_insert_with(Default::default);
                wire::read_message(field, wire_type, buf, details)?;
            }
            11 => {
                let size = wire::read_uint64(field, wire_type, buf)?;
                self.set_payload(field, FilePayload::FixedChunkSize(size))?;
            }
            12 => {
                let mut children = DirectoryEntries::default();
                wire::read_message(field, wire_type, buf, &mut children)?;
                self.set_payload(field, FilePayload::InlineChildren(children))?;
            }
            13 => {
                let n = wire::read_uint32(field, wire_type, buf)?;
                self.set_payload(field, FilePayload::ReferencedChildrenTree(n))?;
            }
            _ => wire::skip_field(wire_type, buf)?,
        }
        Ok(())
    }
}

/// A directory entry paired with the id of its content
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirectoryEntryId {
    pub info: DirectoryEntry,
    pub id: ContentId,
}
