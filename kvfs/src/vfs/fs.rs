//! Path based filesystem over three key-value namespaces.

use crate::error::{Result, VfsError};
use crate::kv::{KvBackend, KvStore};
use crate::meta::{DirMeta, FileMeta, MetaKind, VfsMeta};
use crate::path::{ResolvedPath, resolve};
use crate::vfs::entry::{DirEntry, Entry, FileEntry};
use std::sync::Arc;
use tracing::{debug, warn};

/// A filesystem bound to one identifier. Owns its content, metadata and
/// version stores; two instances built from the same backend and identifier
/// observe the same data, but only one should be writing at a time.
pub struct VirtualFileSystem {
    fid: String,
    pub(super) content: Arc<dyn KvStore>,
    pub(super) meta: Arc<dyn KvStore>,
    pub(super) version: Arc<dyn KvStore>,
}

impl VirtualFileSystem {
    /// Open the store trio for `fid`. Call [`initialize`](Self::initialize)
    /// before anything else.
    pub fn new(fid: impl Into<String>, backend: &dyn KvBackend) -> Self {
        let fid = fid.into();
        Self {
            content: backend.open(&format!("fs:{fid}")),
            meta: backend.open(&format!("meta_map:{fid}")),
            version: backend.open(&format!("meta:{fid}")),
            fid,
        }
    }

    /// `new` followed by `initialize`.
    pub async fn open(fid: impl Into<String>, backend: &dyn KvBackend) -> Result<Self> {
        let fs = Self::new(fid, backend);
        fs.initialize().await?;
        Ok(fs)
    }

    pub fn id(&self) -> &str {
        &self.fid
    }

    pub(super) async fn load(&self, key: &str) -> Result<Option<VfsMeta>> {
        match self.meta.get(key).await? {
            Some(raw) => Ok(Some(VfsMeta::decode(&raw)?)),
            None => Ok(None),
        }
    }

    pub(super) async fn persist(&self, key: &str, meta: &VfsMeta) -> Result<()> {
        self.meta.set(key, &meta.encode()?).await?;
        Ok(())
    }

    /// Append `resolved` to its parent's children, persist the parent, then
    /// persist `record`.
    async fn attach(&self, resolved: &ResolvedPath, record: &VfsMeta) -> Result<()> {
        let parent_key = resolved.parent_key();
        let mut parent = match self.load(parent_key).await? {
            Some(VfsMeta::Directory(dir)) => dir,
            Some(VfsMeta::File(_)) => return Err(VfsError::ParentNotDir(parent_key.to_string())),
            None => return Err(VfsError::DirNotExist(parent_key.to_string())),
        };
        parent.children.push(resolved.full_path.clone());

        debug!(
            fid = %self.fid,
            path = %resolved.full_path,
            parent = parent_key,
            kind = ?record.kind(),
            "creating record"
        );
        self.persist(parent_key, &VfsMeta::Directory(parent)).await?;
        self.persist(&resolved.full_path, record).await
    }

    async fn create_dir_record(&self, resolved: &ResolvedPath) -> Result<DirMeta> {
        let dir = DirMeta::new(
            resolved.name.clone(),
            Some(resolved.parent_key().to_string()),
        );
        self.attach(resolved, &VfsMeta::Directory(dir.clone())).await?;
        Ok(dir)
    }

    /// Open the file at `path`, creating an empty one when `create` is set and
    /// nothing exists there yet.
    pub async fn open_file(&self, path: &str, create: bool) -> Result<FileEntry<'_>> {
        let resolved = resolve(path)?;
        if resolved.directory_required {
            return Err(VfsError::FilePathRequired(path.to_string()));
        }

        let meta = match self.load(&resolved.full_path).await? {
            Some(meta) => meta,
            None if create => {
                let file = FileMeta::new(resolved.name.clone(), resolved.parent_key());
                let meta = VfsMeta::File(file);
                self.attach(&resolved, &meta).await?;
                self.content.set(&resolved.full_path, &[]).await?;
                meta
            }
            None => return Err(VfsError::PathNotExist(path.to_string())),
        };

        match meta {
            VfsMeta::File(file) => Ok(FileEntry::new(self, resolved.full_path, file)),
            VfsMeta::Directory(_) => Err(VfsError::PathNotFile(path.to_string())),
        }
    }

    /// Open the directory at `path`, creating an empty one when `create` is
    /// set and nothing exists there yet.
    pub async fn open_dir(&self, path: &str, create: bool) -> Result<DirEntry<'_>> {
        let resolved = resolve(path)?;

        let meta = match self.load(&resolved.full_path).await? {
            Some(meta) => meta,
            None if create => VfsMeta::Directory(self.create_dir_record(&resolved).await?),
            None => return Err(VfsError::PathNotExist(path.to_string())),
        };

        match meta {
            VfsMeta::Directory(dir) => Ok(DirEntry::new(self, resolved.full_path, dir)),
            VfsMeta::File(_) => Err(VfsError::PathNotDir(path.to_string())),
        }
    }

    /// Open whatever is stored at `path` as the matching handle.
    pub async fn open_entry(&self, path: &str) -> Result<Entry<'_>> {
        let resolved = resolve(path)?;
        match self.load(&resolved.full_path).await? {
            Some(VfsMeta::File(file)) => {
                Ok(Entry::File(FileEntry::new(self, resolved.full_path, file)))
            }
            Some(VfsMeta::Directory(dir)) => {
                Ok(Entry::Dir(DirEntry::new(self, resolved.full_path, dir)))
            }
            None => Err(VfsError::PathNotExist(path.to_string())),
        }
    }

    /// Raw record at `path`, or `None`.
    pub async fn entry(&self, path: &str) -> Result<Option<VfsMeta>> {
        let resolved = resolve(path)?;
        self.load(&resolved.full_path).await
    }

    /// Whether a record exists at exactly the resolved full path.
    ///
    /// Scans every metadata key, O(n) in the number of records.
    pub async fn exist(&self, path: &str) -> Result<bool> {
        let resolved = resolve(path)?;
        let keys = self.meta.keys().await?;
        Ok(keys.iter().any(|key| *key == resolved.full_path))
    }

    pub async fn get_path_type(&self, path: &str) -> Result<MetaKind> {
        self.entry(path)
            .await?
            .map(|meta| meta.kind())
            .ok_or_else(|| VfsError::PathNotExist(path.to_string()))
    }

    pub async fn create_dir(&self, path: &str) -> Result<DirEntry<'_>> {
        if self.exist(path).await? {
            return Err(VfsError::PathExist(path.to_string()));
        }
        let resolved = resolve(path)?;
        let dir = self.create_dir_record(&resolved).await?;
        Ok(DirEntry::new(self, resolved.full_path, dir))
    }

    /// Remove `path` and, for a directory, everything below it, then drop it
    /// from its parent's children.
    ///
    /// Records are deleted children first, so a store failure part way leaves
    /// every surviving record listed by its surviving parent.
    pub async fn remove(&self, path: &str) -> Result<()> {
        let resolved = resolve(path)?;
        if resolved.is_root() {
            return Err(VfsError::CannotRemoveRoot);
        }
        let meta = self
            .load(&resolved.full_path)
            .await?
            .ok_or_else(|| VfsError::PathNotExist(path.to_string()))?;
        if resolved.directory_required && meta.kind() == MetaKind::File {
            return Err(VfsError::PathNotDir(path.to_string()));
        }

        // Pre-order walk; deleting in reverse visits every child before its parent.
        let mut subtree = Vec::new();
        let mut pending = vec![(resolved.full_path.clone(), meta)];
        while let Some((full_path, meta)) = pending.pop() {
            if let VfsMeta::Directory(dir) = &meta {
                for child in &dir.children {
                    match self.load(child).await? {
                        Some(child_meta) => pending.push((child.clone(), child_meta)),
                        None => warn!(
                            fid = %self.fid,
                            parent = %full_path,
                            child = %child,
                            "skipping dangling child reference"
                        ),
                    }
                }
            }
            subtree.push((full_path, meta.kind()));
        }

        for (full_path, kind) in subtree.into_iter().rev() {
            if kind == MetaKind::File {
                self.content.remove(&full_path).await?;
            }
            self.meta.remove(&full_path).await?;
            debug!(fid = %self.fid, path = %full_path, "removed record");
        }

        self.detach(&resolved).await
    }

    async fn detach(&self, resolved: &ResolvedPath) -> Result<()> {
        let parent_key = resolved.parent_key();
        match self.load(parent_key).await? {
            Some(VfsMeta::Directory(mut parent)) => {
                parent.children.retain(|child| *child != resolved.full_path);
                self.persist(parent_key, &VfsMeta::Directory(parent)).await
            }
            _ => {
                warn!(
                    fid = %self.fid,
                    path = %resolved.full_path,
                    parent = parent_key,
                    "parent directory missing while detaching"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::kv::MemoryBackend;
    use async_trait::async_trait;

    /// Metadata store that refuses to delete one key.
    struct StuckKeyStore {
        inner: Arc<dyn KvStore>,
        stuck: String,
    }

    #[async_trait]
    impl KvStore for StuckKeyStore {
        async fn ready(&self) -> std::result::Result<(), StoreError> {
            self.inner.ready().await
        }

        async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, StoreError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &[u8]) -> std::result::Result<(), StoreError> {
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> std::result::Result<(), StoreError> {
            if key == self.stuck {
                return Err(StoreError::Io(std::io::Error::other("injected failure")));
            }
            self.inner.remove(key).await
        }

        async fn keys(&self) -> std::result::Result<Vec<String>, StoreError> {
            self.inner.keys().await
        }
    }

    struct StuckKeyBackend {
        inner: MemoryBackend,
        stuck: String,
    }

    impl KvBackend for StuckKeyBackend {
        fn open(&self, namespace: &str) -> Arc<dyn KvStore> {
            let inner = self.inner.open(namespace);
            if namespace.starts_with("meta_map:") {
                Arc::new(StuckKeyStore {
                    inner,
                    stuck: self.stuck.clone(),
                })
            } else {
                inner
            }
        }
    }

    async fn new_fs() -> VirtualFileSystem {
        VirtualFileSystem::open("test", &MemoryBackend::new())
            .await
            .expect("init fs")
    }

    #[tokio::test]
    async fn test_create_open_write_read_list() {
        let fs = new_fs().await;
        fs.create_dir("docs").await.unwrap();

        let mut file = fs.open_file("docs/readme", true).await.unwrap();
        file.write(&[0x41, 0x42]).await.unwrap();
        assert_eq!(file.read().await.unwrap(), vec![0x41, 0x42]);

        assert_eq!(fs.get_path_type("docs").await.unwrap(), MetaKind::Directory);
        let dir = fs.open_dir("docs", false).await.unwrap();
        assert_eq!(dir.list(), ["docs/readme"]);
    }

    #[tokio::test]
    async fn test_open_missing_without_create() {
        let fs = new_fs().await;
        assert!(matches!(
            fs.open_file("missing", false).await,
            Err(VfsError::PathNotExist(p)) if p == "missing"
        ));
        assert!(matches!(
            fs.open_dir("missing", false).await,
            Err(VfsError::PathNotExist(_))
        ));
    }

    #[tokio::test]
    async fn test_open_file_rejects_directory_path() {
        let fs = new_fs().await;
        assert!(matches!(
            fs.open_file("notes/", true).await,
            Err(VfsError::FilePathRequired(_))
        ));
        assert!(!fs.exist("notes").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_under_missing_or_file_parent() {
        let fs = new_fs().await;
        assert!(matches!(
            fs.open_file("nope/child", true).await,
            Err(VfsError::DirNotExist(p)) if p == "nope"
        ));

        fs.open_file("plain", true).await.unwrap();
        assert!(matches!(
            fs.open_dir("plain/sub", true).await,
            Err(VfsError::ParentNotDir(p)) if p == "plain"
        ));
        assert!(matches!(
            fs.create_dir("plain/sub").await,
            Err(VfsError::ParentNotDir(_))
        ));
    }

    #[tokio::test]
    async fn test_kind_is_fixed() {
        let fs = new_fs().await;
        fs.create_dir("d").await.unwrap();
        fs.open_file("f", true).await.unwrap();

        assert!(matches!(fs.open_file("d", true).await, Err(VfsError::PathNotFile(_))));
        assert!(matches!(fs.open_dir("f", true).await, Err(VfsError::PathNotDir(_))));
        assert!(matches!(fs.create_dir("f").await, Err(VfsError::PathExist(_))));
    }

    #[tokio::test]
    async fn test_open_with_create_is_idempotent() {
        let fs = new_fs().await;
        fs.open_dir("d", true).await.unwrap();
        fs.open_dir("d", true).await.unwrap();
        fs.open_file("d/f", true).await.unwrap();
        fs.open_file("d/f", true).await.unwrap();

        let root = fs.open_dir("", false).await.unwrap();
        assert_eq!(root.list(), ["d"]);
        assert_eq!(fs.open_dir("d", false).await.unwrap().list(), ["d/f"]);
    }

    #[tokio::test]
    async fn test_create_dir_twice() {
        let fs = new_fs().await;
        fs.create_dir("x").await.unwrap();
        assert!(matches!(
            fs.create_dir("x").await,
            Err(VfsError::PathExist(p)) if p == "x"
        ));
    }

    #[tokio::test]
    async fn test_remove_patches_parent() {
        let fs = new_fs().await;
        fs.create_dir("a").await.unwrap();
        fs.open_file("a/one", true).await.unwrap();
        fs.open_file("a/two", true).await.unwrap();

        fs.remove("a/one").await.unwrap();
        assert_eq!(fs.open_dir("a", false).await.unwrap().list(), ["a/two"]);
        assert_eq!(fs.content.get("a/one").await.unwrap(), None);
        assert!(!fs.exist("a/one").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_missing_and_root() {
        let fs = new_fs().await;
        assert!(matches!(fs.remove("ghost").await, Err(VfsError::PathNotExist(_))));
        assert!(matches!(fs.remove("").await, Err(VfsError::CannotRemoveRoot)));
        assert!(fs.exist("").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_with_trailing_slash_requires_directory() {
        let fs = new_fs().await;
        fs.open_file("f", true).await.unwrap();
        assert!(matches!(
            fs.remove("f/").await,
            Err(VfsError::PathNotDir(p)) if p == "f/"
        ));
        assert!(fs.exist("f").await.unwrap());
        assert_eq!(fs.open_dir("", false).await.unwrap().list(), ["f"]);

        fs.create_dir("d").await.unwrap();
        fs.remove("d/").await.unwrap();
        assert!(!fs.exist("d").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_remove_keeps_survivors_listed() {
        let backend = StuckKeyBackend {
            inner: MemoryBackend::new(),
            stuck: "a/b".into(),
        };
        let fs = VirtualFileSystem::open("stuck", &backend).await.unwrap();
        fs.create_dir("a").await.unwrap();
        fs.create_dir("a/b").await.unwrap();
        fs.open_file("a/b/c", true).await.unwrap();
        fs.open_file("a/d", true).await.unwrap();

        assert!(matches!(fs.remove("a").await, Err(VfsError::Store(_))));

        // Everything still stored is reachable from its parent's children.
        for key in fs.meta.keys().await.unwrap() {
            if key.is_empty() {
                continue;
            }
            let parent = match fs.load(&key).await.unwrap().unwrap() {
                VfsMeta::File(file) => file.parent,
                VfsMeta::Directory(dir) => dir.parent.unwrap(),
            };
            match fs.load(&parent).await.unwrap() {
                Some(VfsMeta::Directory(dir)) => assert!(dir.children.contains(&key)),
                other => panic!("{key} has no parent directory: {other:?}"),
            }
        }
        assert!(fs.exist("a/b").await.unwrap());
        assert!(!fs.exist("a/b/c").await.unwrap());
        assert_eq!(fs.content.get("a/b/c").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_skips_dangling_children() {
        let fs = new_fs().await;
        fs.create_dir("a").await.unwrap();
        fs.open_file("a/f", true).await.unwrap();
        // Simulate a crash between the parent append and the record persist.
        fs.meta.remove("a/f").await.unwrap();

        fs.remove("a").await.unwrap();
        assert!(fs.entry("a").await.unwrap().is_none());
        assert!(fs.open_dir("", false).await.unwrap().list().is_empty());
    }

    #[tokio::test]
    async fn test_open_entry_dispatches_on_kind() {
        let fs = new_fs().await;
        fs.create_dir("d").await.unwrap();
        fs.open_file("d/f", true).await.unwrap();

        assert!(matches!(fs.open_entry("d").await.unwrap(), Entry::Dir(_)));
        assert!(matches!(fs.open_entry("/d/f").await.unwrap(), Entry::File(_)));
        assert!(matches!(fs.open_entry("d/g").await, Err(VfsError::PathNotExist(_))));
    }

    #[tokio::test]
    async fn test_leading_slash_names_same_record() {
        let fs = new_fs().await;
        fs.create_dir("/docs").await.unwrap();
        assert!(fs.exist("docs").await.unwrap());
        assert!(matches!(fs.create_dir("docs").await, Err(VfsError::PathExist(_))));

        fs.open_file("/docs/a", true).await.unwrap();
        let meta = fs.entry("docs/a").await.unwrap().unwrap();
        assert_eq!(meta.name(), "a");
        match meta {
            VfsMeta::File(file) => assert_eq!(file.parent, "docs"),
            other => panic!("expected file, got {other:?}"),
        }
    }
}
