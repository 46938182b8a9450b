use std::path::PathBuf;

use chardat_assets::AssetError;
use chardat_core::{NodeId, SceneError};
use chardat_net::TransferError;
use thiserror::Error;

use crate::resolver::PartRole;

/// A mandatory part of the character could not be located.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("character root {0:?} is not part of the scene")]
    UnknownRoot(NodeId),

    #[error("no direct child of the character matches skeleton root pattern '{pattern}'")]
    MissingSkeletonRoot { pattern: String },

    #[error("no skinned mesh matches body pattern '{pattern}'")]
    MissingBody { pattern: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no stored character at {0:?}")]
    NotFound(PathBuf),

    #[error("permission denied for {0:?}")]
    PermissionDenied(PathBuf),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn from_io(path: PathBuf, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound(path),
            std::io::ErrorKind::PermissionDenied => StoreError::PermissionDenied(path),
            _ => StoreError::Io { path, source: err },
        }
    }
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("{role:?} part failed: {source}")]
    Part {
        role: PartRole,
        #[source]
        source: AssetError,
    },

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("compression error: {0}")]
    Compression(String),

    #[error("worker pool error: {0}")]
    Worker(String),
}
