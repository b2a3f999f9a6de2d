//! Environment driven construction of a filesystem.
//!
//! | variable       | meaning                          | default   |
//! |----------------|----------------------------------|-----------|
//! | `KVFS_ID`      | filesystem identifier            | `default` |
//! | `KVFS_BACKEND` | `memory` or `local`              | `memory`  |
//! | `KVFS_ROOT`    | store directory for `local`      | required  |

use crate::error::{Result, VfsError};
use crate::kv::{LocalFsBackend, MemoryBackend};
use crate::vfs::VirtualFileSystem;
use std::path::PathBuf;
use tracing::warn;

pub const ENV_ID: &str = "KVFS_ID";
pub const ENV_BACKEND: &str = "KVFS_BACKEND";
pub const ENV_ROOT: &str = "KVFS_ROOT";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendConfig {
    Memory,
    Local { root: PathBuf },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsConfig {
    pub fid: String,
    pub backend: BackendConfig,
}

impl FsConfig {
    pub fn new(fid: impl Into<String>, backend: BackendConfig) -> Self {
        Self {
            fid: fid.into(),
            backend,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fid = var(ENV_ID).unwrap_or_else(|| {
            warn!("{ENV_ID} is not set. Use default value: `default`");
            "default".into()
        });

        let backend = match var(ENV_BACKEND).as_deref() {
            None => {
                warn!("{ENV_BACKEND} is not set. Use default value: `memory`");
                BackendConfig::Memory
            }
            Some("memory") => BackendConfig::Memory,
            Some("local") => {
                let root = var(ENV_ROOT).ok_or_else(|| {
                    VfsError::InvalidConfig(format!("{ENV_ROOT} is required for the local backend"))
                })?;
                BackendConfig::Local { root: root.into() }
            }
            Some(other) => {
                return Err(VfsError::InvalidConfig(format!(
                    "{ENV_BACKEND} `{other}` is not one of `memory`, `local`"
                )));
            }
        };

        Ok(Self { fid, backend })
    }

    /// Build the backend and return an initialized filesystem.
    pub async fn open(&self) -> Result<VirtualFileSystem> {
        match &self.backend {
            BackendConfig::Memory => {
                VirtualFileSystem::open(self.fid.clone(), &MemoryBackend::new()).await
            }
            BackendConfig::Local { root } => {
                VirtualFileSystem::open(self.fid.clone(), &LocalFsBackend::new(root)).await
            }
        }
    }
}
