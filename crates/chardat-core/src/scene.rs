//! Arena-backed scene graph holding live characters
//!
//! Nodes are addressed by [`NodeId`] handles into a flat arena. Each node has a
//! name, a parent-relative [`Transform`], and optionally a
//! [`SkinnedMeshRenderer`] which owns the mesh and materials drawn for it.

use std::collections::HashMap;
use std::fmt;

use glam::Mat4;

use crate::error::SceneError;
use crate::mesh::Mesh;
use crate::types::Transform;

/// Handle to a node inside a [`Scene`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The slot index of this node.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// An RGBA8 texture as bound to a material channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pixels: Vec<u8>,
    /// Whether CPU code may read the pixels back
    pub readable: bool,
    /// Whether the pixel data has been committed to the graphics device
    pub committed: bool,
}

impl Texture {
    /// Wrap raw RGBA8 pixels. The buffer must hold exactly `width * height * 4` bytes.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, SceneError> {
        if pixels.len() != width as usize * height as usize * 4 {
            return Err(SceneError::TextureSize {
                width,
                height,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            readable: true,
            committed: false,
        })
    }

    /// A texture filled with one color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
            readable: true,
            committed: false,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// A material: a shading technique name plus named texture channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    pub name: String,
    /// Shader identifier, e.g. "Standard" or "Universal Render Pipeline/Lit"
    pub shader: String,
    textures: HashMap<String, Texture>,
}

impl Material {
    pub fn new(name: impl Into<String>, shader: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shader: shader.into(),
            textures: HashMap::new(),
        }
    }

    pub fn texture(&self, channel: &str) -> Option<&Texture> {
        self.textures.get(channel)
    }

    /// Bind a texture to a channel, returning the previously bound one.
    pub fn set_texture(&mut self, channel: impl Into<String>, texture: Texture) -> Option<Texture> {
        self.textures.insert(channel.into(), texture)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

/// Draws a mesh deformed by a set of skeleton bones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinnedMeshRenderer {
    pub mesh: Mesh,
    /// Bones the mesh is skinned to; bone weights index into this list
    pub bones: Vec<NodeId>,
    pub root_bone: Option<NodeId>,
    pub materials: Vec<Material>,
}

/// A single node in the scene.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub renderer: Option<SkinnedMeshRenderer>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Owns every node of one or more characters.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<Node>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node under `parent` (or as a root). Panics if `parent` is not in this scene.
    pub fn add_node(&mut self, name: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        if let Some(p) = parent {
            assert!(p.index() < self.nodes.len(), "parent {p:?} is not in this scene");
            self.nodes[p.index()].children.push(id);
        }
        self.nodes.push(Node {
            name: name.into(),
            transform: Transform::default(),
            renderer: None,
            parent,
            children: Vec::new(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Direct children of a node, in insertion order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children()).unwrap_or(&[])
    }

    /// The node and all of its descendants in depth-first pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.node(id).is_none() {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            // Reverse so the first child is visited first.
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    pub fn renderer(&self, id: NodeId) -> Result<&SkinnedMeshRenderer, SceneError> {
        self.node(id)
            .ok_or(SceneError::UnknownNode(id))?
            .renderer
            .as_ref()
            .ok_or(SceneError::NoRenderer(id))
    }

    pub fn renderer_mut(&mut self, id: NodeId) -> Result<&mut SkinnedMeshRenderer, SceneError> {
        self.node_mut(id)
            .ok_or(SceneError::UnknownNode(id))?
            .renderer
            .as_mut()
            .ok_or(SceneError::NoRenderer(id))
    }

    pub fn set_renderer(
        &mut self,
        id: NodeId,
        renderer: SkinnedMeshRenderer,
    ) -> Result<(), SceneError> {
        self.node_mut(id).ok_or(SceneError::UnknownNode(id))?.renderer = Some(renderer);
        Ok(())
    }

    /// Model matrix of a node, composed from the root down.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = self.node(id);
        while let Some(node) = current {
            matrix = node.transform.matrix() * matrix;
            current = node.parent.and_then(|p| self.node(p));
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn descendants_are_depth_first_pre_order() {
        let mut scene = Scene::new();
        let root = scene.add_node("root", None);
        let a = scene.add_node("a", Some(root));
        let b = scene.add_node("b", Some(root));
        let a1 = scene.add_node("a1", Some(a));
        let a2 = scene.add_node("a2", Some(a));
        let b1 = scene.add_node("b1", Some(b));

        assert_eq!(scene.descendants(root), vec![root, a, a1, a2, b, b1]);
        assert_eq!(scene.descendants(b), vec![b, b1]);
        assert_eq!(scene.node(a1).unwrap().parent(), Some(a));
    }

    #[test]
    fn renderer_lookup_errors() {
        let mut scene = Scene::new();
        let root = scene.add_node("root", None);
        assert_eq!(scene.renderer(root).unwrap_err(), SceneError::NoRenderer(root));

        scene.set_renderer(root, SkinnedMeshRenderer::default()).unwrap();
        assert!(scene.renderer(root).is_ok());

        let mut other = Scene::new();
        other.add_node("x", None);
        let missing = other.add_node("y", None);
        assert_eq!(scene.renderer(missing).unwrap_err(), SceneError::UnknownNode(missing));
    }

    #[test]
    fn world_matrix_composes_parents() {
        let mut scene = Scene::new();
        let root = scene.add_node("root", None);
        let child = scene.add_node("child", Some(root));
        scene.node_mut(root).unwrap().transform = Transform::from_position(Vec3::X);
        scene.node_mut(child).unwrap().transform = Transform::from_position(Vec3::Y);

        let p = scene.world_matrix(child).transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn texture_size_is_checked() {
        assert!(Texture::from_rgba8(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            Texture::from_rgba8(2, 2, vec![0; 15]),
            Err(SceneError::TextureSize { actual: 15, .. })
        ));
        let solid = Texture::solid(2, 1, [1, 2, 3, 4]);
        assert_eq!(solid.pixels(), &[1, 2, 3, 4, 1, 2, 3, 4]);
    }

    #[test]
    fn material_rebinding_returns_previous() {
        let mut material = Material::new("skin", "Standard");
        assert!(material.set_texture("_MainTex", Texture::solid(1, 1, [0; 4])).is_none());
        let previous = material.set_texture("_MainTex", Texture::solid(1, 1, [9; 4]));
        assert_eq!(previous.unwrap().pixels(), &[0, 0, 0, 0]);
        assert_eq!(material.texture("_MainTex").unwrap().pixels(), &[9, 9, 9, 9]);
        assert_eq!(material.texture_count(), 1);
    }
}
