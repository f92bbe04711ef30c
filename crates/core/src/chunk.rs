//! File identifiers and chunk object keys.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between a file identifier and its chunk index in an object key.
pub const CHUNK_KEY_SEPARATOR: &str = "_chunk_";

/// Decimal digits in `u64::MAX`.
const MAX_INDEX_DIGITS: usize = 20;

/// Maximum length of a file identifier in bytes.
///
/// The longest chunk key (`<id>_chunk_18446744073709551615`) must fit in a
/// single 255-byte filename.
pub const MAX_FILE_ID_LEN: usize = 255 - CHUNK_KEY_SEPARATOR.len() - MAX_INDEX_DIGITS;

/// An opaque file name, validated to be safe as an object-key prefix.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
    /// Validate and wrap a file identifier.
    ///
    /// Rejects empty names, names longer than [`MAX_FILE_ID_LEN`], path
    /// separators, `..` and control characters. Anything else is opaque.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidFileId("file id must not be empty".to_string()));
        }
        if id.len() > MAX_FILE_ID_LEN {
            return Err(Error::InvalidFileId(format!(
                "file id is {} bytes (max {MAX_FILE_ID_LEN})",
                id.len()
            )));
        }
        if id.contains('/') || id.contains('\\') || id.contains("..") {
            return Err(Error::InvalidFileId(format!(
                "file id contains a path component: {id:?}"
            )));
        }
        if id.chars().any(char::is_control) {
            return Err(Error::InvalidFileId(format!(
                "file id contains control characters: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Object key for the chunk at `index`.
    pub fn chunk_key(&self, index: u64) -> String {
        ChunkKey::new(self.clone(), index).to_object_key()
    }

    /// Listing prefix that covers every chunk of this file (and nothing shorter).
    pub fn chunk_prefix(&self) -> String {
        format!("{}{CHUNK_KEY_SEPARATOR}", self.0)
    }
}

impl TryFrom<String> for FileId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<FileId> for String {
    fn from(value: FileId) -> Self {
        value.0
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({:?})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The address of one chunk: `<file_id>_chunk_<index>`.
///
/// Indices are decimal without zero padding, so listing order is not index
/// order. Always compare parsed indices.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub file_id: FileId,
    pub index: u64,
}

impl ChunkKey {
    pub fn new(file_id: FileId, index: u64) -> Self {
        Self { file_id, index }
    }

    pub fn to_object_key(&self) -> String {
        format!("{}{CHUNK_KEY_SEPARATOR}{}", self.file_id, self.index)
    }

    /// Parse `key` as a chunk of exactly `file_id`.
    ///
    /// Returns `None` for keys of other files that merely share the prefix,
    /// e.g. `doc2_chunk_0` or `doc_chunk_x_chunk_3` when asking for `doc`.
    pub fn parse_for(file_id: &FileId, key: &str) -> Option<u64> {
        let rest = key
            .strip_prefix(file_id.as_str())?
            .strip_prefix(CHUNK_KEY_SEPARATOR)?;
        parse_index(rest)
    }

    /// Parse any chunk key, splitting at the last separator.
    pub fn parse(key: &str) -> Result<Self> {
        let (file_part, index_part) = key
            .rsplit_once(CHUNK_KEY_SEPARATOR)
            .ok_or_else(|| Error::InvalidChunkKey(key.to_string()))?;
        let index = parse_index(index_part).ok_or_else(|| Error::InvalidChunkKey(key.to_string()))?;
        let file_id = FileId::new(file_part).map_err(|_| Error::InvalidChunkKey(key.to_string()))?;
        Ok(Self { file_id, index })
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_object_key())
    }
}

/// Strict decimal parse: ASCII digits only, no sign, must fit in u64.
fn parse_index(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Convert a signed wire index into a chunk index.
pub fn index_from_wire(index: i64) -> Result<u64> {
    u64::try_from(index).map_err(|_| Error::RangeInvalid(format!("negative chunk index {index}")))
}

/// The index after `index`, or `RangeInvalid` at the end of the index space.
pub fn next_index(index: u64) -> Result<u64> {
    index
        .checked_add(1)
        .ok_or_else(|| Error::RangeInvalid(format!("chunk index {index} has no successor")))
}
