use thiserror::Error;

pub type Result<T> = std::result::Result<T, VfsError>;

/// Failures raised by a key-value backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("corrupt store entry: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum VfsError {
    #[error("invalid path `{0}`: no name before the trailing `/`")]
    InvalidPath(String),

    #[error("file path required, but `{0}` names a directory (trailing `/`)")]
    FilePathRequired(String),

    #[error("path `{0}` does not exist")]
    PathNotExist(String),

    #[error("path `{0}` already exists")]
    PathExist(String),

    #[error("parent directory `{0}` does not exist")]
    DirNotExist(String),

    #[error("parent `{0}` is not a directory")]
    ParentNotDir(String),

    #[error("path `{0}` is not a file")]
    PathNotFile(String),

    #[error("path `{0}` is not a directory")]
    PathNotDir(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("the root directory cannot be removed")]
    CannotRemoveRoot,

    #[error("schema version {found} is not supported (this build understands up to {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("record codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}
