//! Metadata records
//!
//! One record per full path in the metadata store. A record's kind is fixed
//! for its lifetime; changing it means removing and recreating the path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaKind {
    File,
    Directory,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    /// Payload length in bytes.
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Full path of the containing directory, `""` for the root.
    pub parent: String,
}

impl FileMeta {
    pub fn new(name: impl Into<String>, parent: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            size: 0,
            created_at: now,
            modified_at: now,
            parent: parent.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirMeta {
    pub name: String,
    /// Full paths of the children, in creation order.
    pub children: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// `None` only for the root directory.
    pub parent: Option<String>,
}

impl DirMeta {
    pub fn new(name: impl Into<String>, parent: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            children: Vec::new(),
            created_at: now,
            modified_at: now,
            parent,
        }
    }

    pub fn root() -> Self {
        Self::new("", None)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum VfsMeta {
    File(FileMeta),
    Directory(DirMeta),
}

impl VfsMeta {
    pub fn kind(&self) -> MetaKind {
        match self {
            VfsMeta::File(_) => MetaKind::File,
            VfsMeta::Directory(_) => MetaKind::Directory,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            VfsMeta::File(m) => &m.name,
            VfsMeta::Directory(m) => &m.name,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }
}

impl From<FileMeta> for VfsMeta {
    fn from(meta: FileMeta) -> Self {
        VfsMeta::File(meta)
    }
}

impl From<DirMeta> for VfsMeta {
    fn from(meta: DirMeta) -> Self {
        VfsMeta::Directory(meta)
    }
}
