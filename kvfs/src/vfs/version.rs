//! Schema versioning: one-time installation of the root directory and the
//! hook where record migrations run when the schema changes.

use super::fs::VirtualFileSystem;
use crate::error::{Result, VfsError};
use crate::meta::{DirMeta, VfsMeta};
use tracing::info;

pub const SCHEMA_VERSION: u32 = 1;

const VERSION_KEY: &str = "version";

/// Record rewrites; `MIGRATIONS[i]` lifts every metadata record from schema
/// `i + 1` to `i + 2`.
const MIGRATIONS: &[fn(serde_json::Value) -> serde_json::Value] = &[];

impl VirtualFileSystem {
    /// Bring the stores up and make sure they hold a current schema.
    ///
    /// Must complete before any other operation on this instance. Running it
    /// again against an initialized store is a no-op.
    pub async fn initialize(&self) -> Result<()> {
        self.meta.ready().await?;
        self.content.ready().await?;
        self.version.ready().await?;

        match self.stored_version().await? {
            Some(SCHEMA_VERSION) => Ok(()),
            None => self.install().await,
            Some(found) => self.migrate(found).await,
        }
    }

    async fn stored_version(&self) -> Result<Option<u32>> {
        match self.version.get(VERSION_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    async fn write_version(&self, version: u32) -> Result<()> {
        self.version
            .set(VERSION_KEY, &serde_json::to_vec(&version)?)
            .await?;
        Ok(())
    }

    async fn install(&self) -> Result<()> {
        // Stores written without a version record may already carry a root.
        if self.load("").await?.is_none() {
            self.persist("", &VfsMeta::Directory(DirMeta::root())).await?;
        }
        self.write_version(SCHEMA_VERSION).await?;
        info!(fid = self.id(), version = SCHEMA_VERSION, "installed filesystem");
        Ok(())
    }

    async fn migrate(&self, found: u32) -> Result<()> {
        let unsupported = VfsError::UnsupportedVersion {
            found,
            supported: SCHEMA_VERSION,
        };
        if found == 0 || found > SCHEMA_VERSION {
            return Err(unsupported);
        }

        for from in found..SCHEMA_VERSION {
            let Some(rewrite) = MIGRATIONS.get((from - 1) as usize) else {
                return Err(unsupported);
            };
            for key in self.meta.keys().await? {
                if let Some(raw) = self.meta.get(&key).await? {
                    let record: serde_json::Value = serde_json::from_slice(&raw)?;
                    self.meta.set(&key, &serde_json::to_vec(&rewrite(record))?).await?;
                }
            }
            self.write_version(from + 1).await?;
            info!(fid = self.id(), from, to = from + 1, "migrated filesystem schema");
        }
        Ok(())
    }
}
