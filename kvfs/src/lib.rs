//! kvfs: a hierarchical virtual filesystem whose namespace (metadata records)
//! and file payloads live in two independent async key-value stores, with a
//! third store holding the schema version.
//!
//! Modules:
//! - `kv`: the key-value substrate (`KvStore`/`KvBackend`) plus memory and
//!   local-directory backends
//! - `meta`: `FileMeta`/`DirMeta` records
//! - `path`: slash-delimited path resolution
//! - `vfs`: `VirtualFileSystem` and the `FileEntry`/`DirEntry` handles
//! - `config`: environment driven construction

pub mod config;
pub mod error;
pub mod kv;
pub mod meta;
pub mod path;
pub mod vfs;

pub use error::{Result, StoreError, VfsError};
pub use meta::{DirMeta, FileMeta, MetaKind, VfsMeta};
pub use path::{ResolvedPath, resolve};
pub use vfs::{DirEntry, Entry, FileEntry, SCHEMA_VERSION, VirtualFileSystem};
