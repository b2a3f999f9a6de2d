//! Local directory backend: each namespace is a directory under the backend
//! root and each key is one file inside it.
//!
//! Keys may be empty or contain `/`, so file names are `k` followed by the hex
//! encoding of the key. A key whose encoded name would not fit in one file name
//! is stored as `h` followed by the sha256 of the key instead, and the file
//! starts with the key itself (u32 little-endian length, then the bytes) so
//! `keys()` can recover it. Namespace directories are named the same way.

use super::{KvBackend, KvStore};
use crate::error::StoreError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{fs, io::AsyncWriteExt};

const KEY_PREFIX: char = 'k';
const HASHED_PREFIX: char = 'h';
/// Longest file name common local filesystems accept.
const MAX_NAME_LEN: usize = 255;

#[derive(Clone, Debug, PartialEq, Eq)]
enum FileName {
    /// The key is recoverable from the name.
    Plain(String),
    /// The key is stored in a header at the start of the file.
    Hashed(String),
}

impl FileName {
    fn for_key(raw: &str) -> Self {
        let plain = format!("{KEY_PREFIX}{}", hex::encode(raw.as_bytes()));
        if plain.len() <= MAX_NAME_LEN {
            FileName::Plain(plain)
        } else {
            let digest = Sha256::digest(raw.as_bytes());
            FileName::Hashed(format!("{HASHED_PREFIX}{}", hex::encode(digest)))
        }
    }

    fn as_str(&self) -> &str {
        match self {
            FileName::Plain(name) | FileName::Hashed(name) => name,
        }
    }
}

fn decode_name(file_name: &str) -> Result<String, StoreError> {
    let encoded = file_name
        .strip_prefix(KEY_PREFIX)
        .ok_or_else(|| StoreError::Corrupt(format!("unexpected file `{file_name}`")))?;
    let bytes = hex::decode(encoded)
        .map_err(|e| StoreError::Corrupt(format!("file `{file_name}`: {e}")))?;
    String::from_utf8(bytes).map_err(|e| StoreError::Corrupt(format!("file `{file_name}`: {e}")))
}

fn encode_hashed(key: &str, value: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + key.len() + value.len());
    buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
    buf.extend_from_slice(key.as_bytes());
    buf.extend_from_slice(value);
    buf
}

/// Split a hashed file into its stored key and value.
fn decode_hashed(file_name: &str, buf: &[u8]) -> Result<(String, Vec<u8>), StoreError> {
    let corrupt = |what: &str| StoreError::Corrupt(format!("file `{file_name}`: {what}"));
    let len_bytes: [u8; 4] = buf
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| corrupt("missing key header"))?;
    let key_end = 4 + u32::from_le_bytes(len_bytes) as usize;
    let key = buf.get(4..key_end).ok_or_else(|| corrupt("truncated key"))?;
    let key = String::from_utf8(key.to_vec()).map_err(|e| corrupt(&e.to_string()))?;
    Ok((key, buf[key_end..].to_vec()))
}

pub struct LocalFsStore {
    dir: PathBuf,
}

impl LocalFsStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, name: &FileName) -> PathBuf {
        self.dir.join(name.as_str())
    }
}

#[async_trait]
impl KvStore for LocalFsStore {
    async fn ready(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let name = FileName::for_key(key);
        let buf = match fs::read(self.path_for(&name)).await {
            Ok(buf) => buf,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match name {
            FileName::Plain(_) => Ok(Some(buf)),
            FileName::Hashed(file_name) => {
                let (stored, value) = decode_hashed(&file_name, &buf)?;
                if stored != key {
                    return Err(StoreError::Corrupt(format!(
                        "file `{file_name}` holds key `{stored}`, expected `{key}`"
                    )));
                }
                Ok(Some(value))
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let name = FileName::for_key(key);
        let mut f = fs::File::create(self.path_for(&name)).await?;
        match name {
            FileName::Plain(_) => f.write_all(value).await?,
            FileName::Hashed(_) => f.write_all(&encode_hashed(key, value)).await?,
        }
        f.flush().await?;
        f.sync_all().await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(&FileName::for_key(key))).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with(HASHED_PREFIX) {
                let buf = fs::read(entry.path()).await?;
                keys.push(decode_hashed(&file_name, &buf)?.0);
            } else {
                keys.push(decode_name(&file_name)?);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Backend rooted at a local directory.
#[derive(Clone, Debug)]
pub struct LocalFsBackend {
    root: PathBuf,
}

impl LocalFsBackend {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl KvBackend for LocalFsBackend {
    fn open(&self, namespace: &str) -> Arc<dyn KvStore> {
        Arc::new(LocalFsStore::new(
            self.root.join(FileName::for_key(namespace).as_str()),
        ))
    }
}
