use crate::scene::NodeId;

/// Errors raised when a mesh buffer would break a per-vertex invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error("{buffer} has {actual} entries but the mesh has {expected} vertices")]
    LengthMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("submesh {submesh} references vertex {index}, mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        submesh: usize,
        index: u32,
        vertex_count: usize,
    },

    #[error("triangle list references vertex {index}, mesh has {vertex_count} vertices")]
    TriangleOutOfRange { index: u32, vertex_count: usize },

    #[error("blend shape name must not be empty")]
    EmptyBlendShapeName,

    #[error("blend shape '{0}' appears more than once")]
    DuplicateBlendShape(String),
}

/// Errors raised by scene graph lookups.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),

    #[error("node {0:?} has no skinned mesh renderer")]
    NoRenderer(NodeId),

    #[error("texture is {width}x{height} but carries {actual} bytes of RGBA8 data")]
    TextureSize { width: u32, height: u32, actual: usize },
}
