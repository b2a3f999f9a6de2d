//! File and directory handles.
//!
//! A handle is a transient binding to one resolved path plus the record it
//! was opened with. Handles hold no lock; several may point at the same path.

use super::fs::VirtualFileSystem;
use crate::error::{Result, VfsError};
use crate::meta::{DirMeta, FileMeta, VfsMeta};
use chrono::Utc;
use tracing::{debug, warn};

pub struct FileEntry<'fs> {
    fs: &'fs VirtualFileSystem,
    full_path: String,
    meta: FileMeta,
}

impl<'fs> FileEntry<'fs> {
    pub(super) fn new(fs: &'fs VirtualFileSystem, full_path: String, meta: FileMeta) -> Self {
        Self { fs, full_path, meta }
    }

    pub fn path(&self) -> &str {
        &self.full_path
    }

    /// Current payload. A file whose content entry went missing reads as empty.
    pub async fn read(&self) -> Result<Vec<u8>> {
        match self.fs.content.get(&self.full_path).await? {
            Some(data) => Ok(data),
            None => {
                warn!(fid = self.fs.id(), path = %self.full_path, "file has no content entry");
                Ok(Vec::new())
            }
        }
    }

    /// Replace the whole payload. Metadata is persisted before content, and
    /// the two writes are not atomic.
    /// The cached metadata only changes once both writes succeed.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        let updated = FileMeta {
            size: data.len() as u64,
            modified_at: Utc::now(),
            ..self.meta.clone()
        };

        debug!(fid = self.fs.id(), path = %self.full_path, size = updated.size, "writing file");
        self.fs
            .persist(&self.full_path, &VfsMeta::File(updated.clone()))
            .await?;
        self.fs.content.set(&self.full_path, data).await?;
        self.meta = updated;
        Ok(())
    }

    pub fn meta(&self) -> FileMeta {
        self.meta.clone()
    }
}

pub struct DirEntry<'fs> {
    fs: &'fs VirtualFileSystem,
    full_path: String,
    meta: DirMeta,
}

impl<'fs> DirEntry<'fs> {
    pub(super) fn new(fs: &'fs VirtualFileSystem, full_path: String, meta: DirMeta) -> Self {
        Self { fs, full_path, meta }
    }

    pub fn path(&self) -> &str {
        &self.full_path
    }

    /// Children as of when the handle was opened or last refreshed.
    pub fn list(&self) -> &[String] {
        &self.meta.children
    }

    pub fn meta(&self) -> DirMeta {
        self.meta.clone()
    }

    /// Re-read the directory record.
    pub async fn refresh(&mut self) -> Result<()> {
        match self.fs.load(&self.full_path).await? {
            Some(VfsMeta::Directory(dir)) => {
                self.meta = dir;
                Ok(())
            }
            Some(VfsMeta::File(_)) => Err(VfsError::PathNotDir(self.full_path.clone())),
            None => Err(VfsError::PathNotExist(self.full_path.clone())),
        }
    }
}

/// A handle of either kind, see [`VirtualFileSystem::open_entry`].
pub enum Entry<'fs> {
    File(FileEntry<'fs>),
    Dir(DirEntry<'fs>),
}

impl Entry<'_> {
    pub fn path(&self) -> &str {
        match self {
            Entry::File(file) => file.path(),
            Entry::Dir(dir) => dir.path(),
        }
    }
}
