//! VFS layer (virtual filesystem)
//!
//! Responsibilities:
//! - Path based create/open/remove over the metadata store, keeping every
//!   parent directory's `children` in step with the records below it.
//! - Hand out `FileEntry`/`DirEntry` handles bound to one resolved path.
//! - Gate first use of a store trio on the recorded schema version.
//!
//! Consistency model: one logical writer at a time. Multi-step sequences
//! (parent append then record persist, metadata then content) are separate
//! store round-trips with no rollback; a failure part way leaves the earlier
//! writes in place.
//!
//! Submodules:
//! - `fs`: `VirtualFileSystem`
//! - `entry`: file and directory handles
//! - `version`: initialization and schema migrations
pub mod entry;
pub mod fs;
pub mod version;

pub use entry::{DirEntry, Entry, FileEntry};
pub use fs::VirtualFileSystem;
pub use version::SCHEMA_VERSION;
