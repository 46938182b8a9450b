//! By-value capture and reconstruction of skinned meshes
//!
//! Bone references are stored as positions in the character's skeleton array
//! rather than as renderer-local slots, so a snapshot can be rebound to any
//! skeleton with the same bone ordering. Normals and tangents are never
//! stored; they are rebuilt from the geometry on the receiving side.

use chardat_core::{
    BoneWeight, Bounds, Color, Mat4, Mesh, MeshError, NodeId, SkinnedMeshRenderer, Vec2, Vec3,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AssetError;

/// Weight given to the single frame of every reconstructed blend shape.
pub const FULL_INTENSITY: f32 = 100.0;

/// One blend shape at full intensity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendShapeSnapshot {
    pub name: String,
    pub delta_vertices: Vec<Vec3>,
    pub delta_normals: Vec<Vec3>,
    pub delta_tangents: Vec<Vec3>,
}

/// Geometry, skinning and blend shapes of one skinned mesh, held by value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshSnapshot {
    /// Skeleton index of the renderer's root bone; `None` if it was not part of the skeleton
    pub root_bone: Option<u32>,
    /// Skeleton index of each renderer bone, in renderer order
    pub bones: Vec<Option<u32>>,

    pub vertices: Vec<Vec3>,
    pub triangles: Vec<u32>,
    pub colors: Option<Vec<Color>>,
    pub uvs: Vec<Vec2>,
    pub bounds: Bounds,
    pub submeshes: Vec<Vec<u32>>,

    pub bone_weight_indices: Vec<[u32; 4]>,
    pub bone_weight_weights: Vec<[f32; 4]>,
    pub bind_poses: Vec<Mat4>,

    pub blend_shapes: Vec<BlendShapeSnapshot>,
}

fn skeleton_index(skeleton: &[NodeId], bone: NodeId) -> Option<u32> {
    skeleton.iter().position(|&b| b == bone).map(|i| i as u32)
}

impl MeshSnapshot {
    /// Capture a renderer's mesh together with its bone bindings.
    pub fn from_renderer(renderer: &SkinnedMeshRenderer, skeleton: &[NodeId]) -> Self {
        Self::capture(&renderer.mesh, skeleton, renderer.root_bone, &renderer.bones)
    }

    /// Capture `mesh`, translating `root_bone` and each of `bones` into
    /// positions within `skeleton`.
    pub fn capture(
        mesh: &Mesh,
        skeleton: &[NodeId],
        root_bone: Option<NodeId>,
        bones: &[NodeId],
    ) -> Self {
        let root_bone = root_bone.and_then(|b| skeleton_index(skeleton, b));
        let bones: Vec<Option<u32>> = bones.iter().map(|&b| skeleton_index(skeleton, b)).collect();
        let unresolved = bones.iter().filter(|b| b.is_none()).count();
        if unresolved > 0 {
            warn!("{} of {} renderer bones are not part of the skeleton", unresolved, bones.len());
        }

        let (bone_weight_indices, bone_weight_weights) = mesh
            .bone_weights()
            .iter()
            .map(|bw| (bw.indices, bw.weights))
            .unzip();

        let vertex_count = mesh.vertex_count();
        let blend_shapes = mesh
            .blend_shapes()
            .iter()
            .map(|shape| match shape.strongest_frame() {
                Some(frame) => BlendShapeSnapshot {
                    name: shape.name.clone(),
                    delta_vertices: frame.delta_vertices.clone(),
                    delta_normals: frame.delta_normals.clone(),
                    delta_tangents: frame.delta_tangents.clone(),
                },
                None => BlendShapeSnapshot {
                    name: shape.name.clone(),
                    delta_vertices: vec![Vec3::ZERO; vertex_count],
                    delta_normals: vec![Vec3::ZERO; vertex_count],
                    delta_tangents: vec![Vec3::ZERO; vertex_count],
                },
            })
            .collect();

        Self {
            root_bone,
            bones,
            vertices: mesh.vertices.clone(),
            triangles: mesh.triangles.clone(),
            colors: (!mesh.colors.is_empty()).then(|| mesh.colors.clone()),
            uvs: mesh.uvs.clone(),
            bounds: mesh.bounds,
            submeshes: mesh.submeshes().to_vec(),
            bone_weight_indices,
            bone_weight_weights,
            bind_poses: mesh.bind_poses.clone(),
            blend_shapes,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Check the per-vertex invariants and skeleton indices against a skeleton
    /// of `skeleton_len` bones.
    pub fn validate(&self, skeleton_len: usize) -> Result<(), AssetError> {
        let n = self.vertices.len();
        let mismatch = |buffer: &'static str, actual: usize| {
            AssetError::Mesh(MeshError::LengthMismatch {
                buffer,
                expected: n,
                actual,
            })
        };

        if !self.uvs.is_empty() && self.uvs.len() != n {
            return Err(mismatch("uvs", self.uvs.len()));
        }
        if let Some(colors) = &self.colors {
            if colors.len() != n {
                return Err(mismatch("colors", colors.len()));
            }
        }
        if self.bone_weight_indices.len() != self.bone_weight_weights.len() {
            return Err(mismatch("bone weight weights", self.bone_weight_weights.len()));
        }
        if !self.bone_weight_indices.is_empty() && self.bone_weight_indices.len() != n {
            return Err(mismatch("bone weight indices", self.bone_weight_indices.len()));
        }
        if let Some(&index) = self.triangles.iter().find(|&&i| i as usize >= n) {
            return Err(MeshError::TriangleOutOfRange {
                index,
                vertex_count: n,
            }
            .into());
        }
        for (i, shape) in self.blend_shapes.iter().enumerate() {
            if self.blend_shapes[..i].iter().any(|s| s.name == shape.name) {
                return Err(MeshError::DuplicateBlendShape(shape.name.clone()).into());
            }
            for (buffer, len) in [
                ("blend shape vertex deltas", shape.delta_vertices.len()),
                ("blend shape normal deltas", shape.delta_normals.len()),
                ("blend shape tangent deltas", shape.delta_tangents.len()),
            ] {
                if len != n {
                    return Err(mismatch(buffer, len));
                }
            }
        }

        let out_of_range = self
            .root_bone
            .iter()
            .chain(self.bones.iter().flatten())
            .find(|&&i| i as usize >= skeleton_len);
        if let Some(&index) = out_of_range {
            return Err(AssetError::BoneIndexOutOfRange {
                index,
                skeleton_len,
            });
        }
        Ok(())
    }

    /// Rebuild the mesh and rebind it to `renderer` using the live `skeleton`.
    ///
    /// Everything is validated before the renderer is touched. Bones that were
    /// unresolved at capture time are bound to the skeleton root. The new mesh
    /// replaces the renderer's previous one.
    pub fn reconstruct(
        &self,
        renderer: &mut SkinnedMeshRenderer,
        skeleton: &[NodeId],
    ) -> Result<(), AssetError> {
        self.validate(skeleton.len())?;

        let resolve = |index: Option<u32>| -> Result<NodeId, AssetError> {
            match index {
                Some(i) => Ok(skeleton[i as usize]),
                None => skeleton.first().copied().ok_or(AssetError::EmptySkeleton),
            }
        };
        let root_bone = match self.root_bone {
            Some(i) => Some(resolve(Some(i))?),
            None => {
                warn!("root bone was not captured, falling back to the skeleton root");
                skeleton.first().copied()
            }
        };
        let bones = self
            .bones
            .iter()
            .map(|&i| resolve(i))
            .collect::<Result<Vec<_>, _>>()?;
        let unresolved = self.bones.iter().filter(|b| b.is_none()).count();
        if unresolved > 0 {
            warn!("bound {} unresolved bones to the skeleton root", unresolved);
        }
        if !self.bind_poses.is_empty() && self.bind_poses.len() != self.bones.len() {
            warn!(
                "mesh has {} bind poses for {} bones",
                self.bind_poses.len(),
                self.bones.len()
            );
        }

        let mesh = self.build_mesh()?;

        renderer.root_bone = root_bone;
        if !bones.is_empty() {
            renderer.bones = bones;
        }
        renderer.mesh = mesh;
        debug!(
            "rebuilt mesh: {} vertices, {} submeshes, {} blend shapes",
            self.vertices.len(),
            self.submeshes.len(),
            self.blend_shapes.len()
        );
        Ok(())
    }

    fn build_mesh(&self) -> Result<Mesh, AssetError> {
        let mut mesh = Mesh::new();
        mesh.dynamic = true;
        mesh.vertices = self.vertices.clone();
        mesh.triangles = self.triangles.clone();
        mesh.colors = self.colors.clone().unwrap_or_default();
        mesh.uvs = self.uvs.clone();
        mesh.recalculate_normals();
        mesh.recalculate_tangents();

        // The stored bounds only survive for meshes without vertices.
        mesh.bounds = self.bounds;
        mesh.recalculate_bounds();

        mesh.set_submeshes(self.submeshes.clone())?;

        let weights = self
            .bone_weight_indices
            .iter()
            .zip(&self.bone_weight_weights)
            .map(|(&indices, &weights)| BoneWeight { indices, weights })
            .collect();
        mesh.set_bone_weights(weights)?;
        mesh.bind_poses = self.bind_poses.clone();

        mesh.clear_blend_shapes();
        for shape in &self.blend_shapes {
            mesh.add_blend_shape_frame(
                &shape.name,
                FULL_INTENSITY,
                shape.delta_vertices.clone(),
                shape.delta_normals.clone(),
                shape.delta_tangents.clone(),
            )?;
        }
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chardat_core::sample::{build_character, SampleCharacter};
    use chardat_core::Scene;

    struct Fixture {
        scene: Scene,
        skeleton: Vec<NodeId>,
        body: NodeId,
    }

    fn fixture(seed: u64) -> Fixture {
        fixture_with(SampleCharacter {
            seed,
            ..Default::default()
        })
    }

    fn fixture_with(config: SampleCharacter) -> Fixture {
        let mut scene = Scene::new();
        let root = build_character(&mut scene, "Character", &config);
        let skeleton = scene.descendants(scene.children(root)[0]);
        let body = scene.children(root)[1];
        Fixture {
            scene,
            skeleton,
            body,
        }
    }

    #[test]
    fn bone_indices_follow_skeleton_positions() {
        let f = fixture(1);
        let renderer = f.scene.renderer(f.body).unwrap();
        let snapshot = MeshSnapshot::from_renderer(renderer, &f.skeleton);

        // Renderer lists bones in reverse skeleton order.
        let expected: Vec<Option<u32>> = (0..10u32).rev().map(Some).collect();
        assert_eq!(snapshot.bones, expected);
        for (slot, index) in snapshot.bones.iter().enumerate() {
            let k = index.unwrap() as usize;
            assert_eq!(f.skeleton[k], renderer.bones[slot]);
        }
        assert_eq!(snapshot.root_bone, Some(1));
    }

    #[test]
    fn bones_outside_skeleton_are_unresolved() {
        let f = fixture(1);
        let renderer = f.scene.renderer(f.body).unwrap();
        let snapshot = MeshSnapshot::capture(
            &renderer.mesh,
            &f.skeleton[..5],
            Some(f.skeleton[7]),
            &renderer.bones,
        );
        assert_eq!(snapshot.root_bone, None);
        assert_eq!(snapshot.bones.iter().filter(|b| b.is_none()).count(), 5);
    }

    #[test]
    fn reconstruct_then_recapture_round_trips() {
        let source = fixture(1);
        let mut target = fixture(7);
        let original = MeshSnapshot::from_renderer(
            source.scene.renderer(source.body).unwrap(),
            &source.skeleton,
        );

        let renderer = target.scene.renderer_mut(target.body).unwrap();
        original.reconstruct(renderer, &target.skeleton).unwrap();
        let recaptured = MeshSnapshot::from_renderer(renderer, &target.skeleton);

        assert_eq!(recaptured.vertex_count(), original.vertex_count());
        assert_eq!(recaptured.uvs.len(), original.uvs.len());
        assert_eq!(recaptured.submeshes.len(), original.submeshes.len());
        assert_eq!(recaptured.bones, original.bones);
        assert_eq!(recaptured.root_bone, original.root_bone);
        let names = |s: &MeshSnapshot| -> Vec<String> {
            s.blend_shapes.iter().map(|b| b.name.clone()).collect()
        };
        assert_eq!(names(&recaptured), names(&original));
        assert_eq!(recaptured.blend_shapes, original.blend_shapes);
        assert_eq!(recaptured.bone_weight_indices, original.bone_weight_indices);
        for (a, b) in recaptured.bone_weight_weights.iter().zip(&original.bone_weight_weights) {
            for k in 0..4 {
                assert_eq!(a[k].to_bits(), b[k].to_bits());
            }
        }
        assert_eq!(recaptured.bind_poses, original.bind_poses);

        let mesh = &renderer.mesh;
        assert!(mesh.dynamic);
        assert_eq!(mesh.normals.len(), mesh.vertex_count());
        assert_eq!(mesh.tangents.len(), mesh.vertex_count());
        assert_eq!(mesh.blend_shapes()[0].frames[0].weight, FULL_INTENSITY);
    }

    #[test]
    fn blend_shape_order_survives_reconstruct() {
        let source = fixture_with(SampleCharacter {
            blend_shapes: 3,
            ..Default::default()
        });
        let mut snapshot = MeshSnapshot::from_renderer(
            source.scene.renderer(source.body).unwrap(),
            &source.skeleton,
        );
        snapshot.blend_shapes.reverse();

        let mut renderer = SkinnedMeshRenderer::default();
        snapshot.reconstruct(&mut renderer, &source.skeleton).unwrap();
        let recaptured = MeshSnapshot::from_renderer(&renderer, &source.skeleton);

        let names: Vec<&str> = recaptured.blend_shapes.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Shape_2", "Shape_1", "Shape_0"]);
        assert_eq!(recaptured.blend_shapes, snapshot.blend_shapes);
    }

    #[test]
    fn duplicate_blend_shape_names_are_rejected() {
        let mut f = fixture_with(SampleCharacter {
            blend_shapes: 3,
            ..Default::default()
        });
        let mut snapshot =
            MeshSnapshot::from_renderer(f.scene.renderer(f.body).unwrap(), &f.skeleton);
        snapshot.blend_shapes[2].name = "Shape_0".to_string();

        let renderer = f.scene.renderer_mut(f.body).unwrap();
        let before = renderer.clone();
        let err = snapshot.reconstruct(renderer, &f.skeleton).unwrap_err();
        assert!(matches!(
            err,
            AssetError::Mesh(MeshError::DuplicateBlendShape(ref name)) if name == "Shape_0"
        ));
        assert_eq!(*renderer, before);
    }

    #[test]
    fn recomputed_bounds_win_over_stored_hint() {
        let f = fixture(1);
        let mut snapshot =
            MeshSnapshot::from_renderer(f.scene.renderer(f.body).unwrap(), &f.skeleton);
        let actual = snapshot.bounds;
        snapshot.bounds = Bounds::new(Vec3::splat(100.0), Vec3::ONE);

        let mut renderer = SkinnedMeshRenderer::default();
        snapshot.reconstruct(&mut renderer, &f.skeleton).unwrap();
        assert!((renderer.mesh.bounds.center - actual.center).length() < 1e-5);
    }

    #[test]
    fn out_of_range_bone_index_is_rejected_before_mutation() {
        let mut f = fixture(1);
        let mut snapshot =
            MeshSnapshot::from_renderer(f.scene.renderer(f.body).unwrap(), &f.skeleton);
        snapshot.bones[3] = Some(42);

        let renderer = f.scene.renderer_mut(f.body).unwrap();
        let before = renderer.clone();
        let err = snapshot.reconstruct(renderer, &f.skeleton).unwrap_err();
        assert!(matches!(err, AssetError::BoneIndexOutOfRange { index: 42, skeleton_len: 10 }));
        assert_eq!(*renderer, before);
    }

    #[test]
    fn unresolved_bones_bind_to_skeleton_root() {
        let f = fixture(1);
        let mut snapshot =
            MeshSnapshot::from_renderer(f.scene.renderer(f.body).unwrap(), &f.skeleton);
        snapshot.bones[0] = None;
        snapshot.root_bone = None;

        let mut renderer = SkinnedMeshRenderer::default();
        snapshot.reconstruct(&mut renderer, &f.skeleton).unwrap();
        assert_eq!(renderer.bones[0], f.skeleton[0]);
        assert_eq!(renderer.root_bone, Some(f.skeleton[0]));

        let err = snapshot.reconstruct(&mut renderer, &[]).unwrap_err();
        assert!(matches!(err, AssetError::BoneIndexOutOfRange { .. }));
    }

    #[test]
    fn inconsistent_buffers_fail_validation() {
        let f = fixture(1);
        let mut snapshot =
            MeshSnapshot::from_renderer(f.scene.renderer(f.body).unwrap(), &f.skeleton);
        snapshot.blend_shapes[0].delta_normals.pop();
        assert!(matches!(
            snapshot.validate(10),
            Err(AssetError::Mesh(MeshError::LengthMismatch { expected: 500, actual: 499, .. }))
        ));
    }
}
