use chardat_core::{MeshError, NodeId, SceneError};

/// Errors that can occur while capturing or applying mesh, skeleton and material data.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("skeleton pose has {snapshot} bones but the live skeleton has {live}")]
    SkeletonMismatch { snapshot: usize, live: usize },

    #[error("bone index {index} is outside the {skeleton_len}-bone skeleton")]
    BoneIndexOutOfRange { index: u32, skeleton_len: usize },

    #[error("mesh references unresolved bones but the live skeleton is empty")]
    EmptySkeleton,

    #[error("bone {0:?} is not part of the scene")]
    UnknownBone(NodeId),

    #[error("invalid mesh data: {0}")]
    Mesh(#[from] MeshError),

    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("failed to encode image: {0}")]
    ImageEncode(String),

    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    #[error("graphics context error: {0}")]
    Graphics(String),
}
