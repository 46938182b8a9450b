//! Deterministic procedural characters for demos and tests
//!
//! Builds a character hierarchy laid out the way exported rigs usually are:
//!
//! ```text
//! <name>
//! ├── Root            (skeleton root, a spine chain with alternating side branches)
//! ├── Body            (skinned mesh renderer)
//! └── Hair, Eyes, ... (optional skinned mesh renderers)
//! ```

use glam::{Mat4, Quat, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::mesh::Mesh;
use crate::scene::{Material, NodeId, Scene, SkinnedMeshRenderer, Texture};
use crate::types::{BoneWeight, Color, Transform};

/// Vertices per ring of the generated tube meshes.
const RING_SIZE: usize = 10;

/// Texture channels of the "Standard" shading technique.
pub const STANDARD_CHANNELS: [&str; 3] = ["_MainTex", "_MetallicGlossMap", "_BumpMap"];

/// Parameters for [`build_character`].
#[derive(Debug, Clone)]
pub struct SampleCharacter {
    pub bone_count: usize,
    pub body_vertices: usize,
    pub blend_shapes: usize,
    pub materials: usize,
    pub texture_size: u32,
    pub shader: String,
    /// Names of optional part nodes to add next to the body, e.g. "Hair"
    pub extra_parts: Vec<String>,
    pub seed: u64,
}

impl Default for SampleCharacter {
    fn default() -> Self {
        Self {
            bone_count: 10,
            body_vertices: 500,
            blend_shapes: 1,
            materials: 2,
            texture_size: 16,
            shader: "Standard".to_string(),
            extra_parts: Vec::new(),
            seed: 1,
        }
    }
}

/// Build a character under a new root node named `name` and return that node.
pub fn build_character(scene: &mut Scene, name: &str, config: &SampleCharacter) -> NodeId {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let root = scene.add_node(name, None);

    let skeleton = build_skeleton(scene, root, config.bone_count.max(1), &mut rng);

    let body = scene.add_node("Body", Some(root));
    let renderer = skinned_part(
        scene,
        &skeleton,
        config.body_vertices,
        config.blend_shapes,
        config.materials,
        config,
        &mut rng,
    );
    scene
        .set_renderer(body, renderer)
        .expect("body node was just added");

    for part in &config.extra_parts {
        let node = scene.add_node(part.as_str(), Some(root));
        let renderer = skinned_part(scene, &skeleton, 40, 0, 1, config, &mut rng);
        scene
            .set_renderer(node, renderer)
            .expect("part node was just added");
    }

    root
}

fn build_skeleton(scene: &mut Scene, root: NodeId, count: usize, rng: &mut StdRng) -> Vec<NodeId> {
    let skeleton_root = scene.add_node("Root", Some(root));
    let mut spine = skeleton_root;

    for i in 1..count {
        // Every third bone branches sideways off the spine instead of extending it.
        let branch = i % 3 == 0;
        let bone = scene.add_node(format!("Bone_{i:02}"), Some(spine));
        let offset = if branch {
            Vec3::new(0.15 * if i % 2 == 0 { 1.0 } else { -1.0 }, 0.0, 0.0)
        } else {
            Vec3::new(0.0, 0.2, 0.0)
        };
        let jitter = Vec3::new(
            rng.gen_range(-0.01..0.01),
            rng.gen_range(-0.01..0.01),
            rng.gen_range(-0.01..0.01),
        );
        let rotation = Quat::from_rotation_z(rng.gen_range(-0.2..0.2));
        if let Some(node) = scene.node_mut(bone) {
            node.transform = Transform::from_position_rotation(offset + jitter, rotation);
        }
        if !branch {
            spine = bone;
        }
    }

    // Depth-first order is what resolvers see; return bones in that order.
    scene.descendants(skeleton_root)
}

fn skinned_part(
    scene: &Scene,
    skeleton: &[NodeId],
    vertex_count: usize,
    blend_shapes: usize,
    materials: usize,
    config: &SampleCharacter,
    rng: &mut StdRng,
) -> SkinnedMeshRenderer {
    let mut mesh = tube_mesh(vertex_count, rng);

    // Renderers list their bones in reverse skeleton order so that slot indices
    // and skeleton indices differ.
    let bones: Vec<NodeId> = skeleton.iter().rev().copied().collect();
    let slot_count = bones.len() as u32;
    let weights = (0..mesh.vertex_count())
        .map(|v| {
            let a = v as u32 % slot_count;
            let b = (a + 1) % slot_count;
            let w = rng.gen_range(0.5..1.0f32);
            BoneWeight {
                indices: [a, b, 0, 0],
                weights: [w, 1.0 - w, 0.0, 0.0],
            }
        })
        .collect();
    mesh.set_bone_weights(weights)
        .expect("weights are generated per vertex");
    mesh.bind_poses = bones
        .iter()
        .map(|&b| scene.world_matrix(b).inverse())
        .collect::<Vec<Mat4>>();

    for s in 0..blend_shapes {
        let n = mesh.vertex_count();
        let deltas: Vec<Vec3> = (0..n)
            .map(|_| Vec3::new(rng.gen_range(-0.02..0.02), rng.gen_range(0.0..0.03), 0.0))
            .collect();
        let normals = vec![Vec3::new(0.0, 0.0, 0.01); n];
        let tangents = vec![Vec3::ZERO; n];
        mesh.add_blend_shape_frame(&format!("Shape_{s}"), 100.0, deltas, normals, tangents)
            .expect("deltas are generated per vertex");
    }

    partition_submeshes(&mut mesh, materials.max(1));

    let materials = (0..materials)
        .map(|m| {
            let mut material = Material::new(format!("Material_{m}"), config.shader.as_str());
            for channel in STANDARD_CHANNELS {
                material.set_texture(channel, noise_texture(config.texture_size, rng));
            }
            material
        })
        .collect();

    SkinnedMeshRenderer {
        mesh,
        root_bone: skeleton.get(1).or(skeleton.first()).copied(),
        bones,
        materials,
    }
}

/// A ring-stacked tube. Only complete rings are triangulated.
fn tube_mesh(vertex_count: usize, rng: &mut StdRng) -> Mesh {
    let rings = vertex_count.div_ceil(RING_SIZE);
    let skin = Color::from_hex(0xE0AC8A);
    let mut mesh = Mesh::new();

    for v in 0..vertex_count {
        let (ring, seg) = (v / RING_SIZE, v % RING_SIZE);
        let theta = std::f32::consts::TAU * seg as f32 / RING_SIZE as f32;
        let radius = 0.15 + rng.gen_range(-0.005..0.005);
        mesh.vertices
            .push(Vec3::new(radius * theta.cos(), ring as f32 * 0.04, radius * theta.sin()));
        mesh.uvs.push(Vec2::new(
            seg as f32 / RING_SIZE as f32,
            ring as f32 / rings.max(1) as f32,
        ));
        mesh.colors.push(skin);
    }

    let full_rings = vertex_count / RING_SIZE;
    for ring in 0..full_rings.saturating_sub(1) {
        for seg in 0..RING_SIZE {
            let a = (ring * RING_SIZE + seg) as u32;
            let b = (ring * RING_SIZE + (seg + 1) % RING_SIZE) as u32;
            let c = a + RING_SIZE as u32;
            let d = b + RING_SIZE as u32;
            mesh.triangles.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    mesh.recalculate_normals();
    mesh.recalculate_tangents();
    mesh.recalculate_bounds();
    mesh
}

/// Split the triangle list into `count` contiguous submeshes.
fn partition_submeshes(mesh: &mut Mesh, count: usize) {
    let triangles = mesh.triangles.len() / 3;
    let per = triangles.div_ceil(count).max(1);
    let submeshes: Vec<Vec<u32>> = (0..count)
        .map(|i| {
            let start = (i * per * 3).min(mesh.triangles.len());
            let end = ((i + 1) * per * 3).min(mesh.triangles.len());
            mesh.triangles[start..end].to_vec()
        })
        .collect();
    mesh.set_submeshes(submeshes)
        .expect("submeshes are slices of the triangle list");
}

fn noise_texture(size: u32, rng: &mut StdRng) -> Texture {
    let pixels = (0..size as usize * size as usize * 4).map(|_| rng.gen()).collect();
    Texture::from_rgba8(size, size, pixels).expect("pixel buffer is sized from the dimensions")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_character_matches_requested_shape() {
        let mut scene = Scene::new();
        let root = build_character(&mut scene, "Alice", &SampleCharacter::default());

        let children: Vec<&str> = scene
            .children(root)
            .iter()
            .map(|&c| scene.node(c).unwrap().name.as_str())
            .collect();
        assert_eq!(children, vec!["Root", "Body"]);

        let skeleton_root = scene.children(root)[0];
        assert_eq!(scene.descendants(skeleton_root).len(), 10);

        let body = scene.renderer(scene.children(root)[1]).unwrap();
        assert_eq!(body.mesh.vertex_count(), 500);
        assert_eq!(body.mesh.bone_weights().len(), 500);
        assert_eq!(body.mesh.blend_shapes().len(), 1);
        assert_eq!(body.mesh.submesh_count(), 2);
        assert_eq!(body.bones.len(), 10);
        assert_eq!(body.mesh.bind_poses.len(), 10);
        assert_eq!(body.materials.len(), 2);
        for material in &body.materials {
            assert_eq!(material.texture_count(), 3);
        }
    }

    #[test]
    fn same_seed_builds_identical_geometry() {
        let mut a = Scene::new();
        let mut b = Scene::new();
        let ra = build_character(&mut a, "A", &SampleCharacter::default());
        let rb = build_character(&mut b, "B", &SampleCharacter::default());
        let body_a = a.renderer(a.children(ra)[1]).unwrap();
        let body_b = b.renderer(b.children(rb)[1]).unwrap();
        assert_eq!(body_a.mesh.vertices, body_b.mesh.vertices);
    }

    #[test]
    fn extra_parts_get_renderers() {
        let mut scene = Scene::new();
        let config = SampleCharacter {
            extra_parts: vec!["Hair".to_string(), "Shoes".to_string()],
            ..Default::default()
        };
        let root = build_character(&mut scene, "Bob", &config);
        let names: Vec<&str> = scene
            .children(root)
            .iter()
            .map(|&c| scene.node(c).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["Root", "Body", "Hair", "Shoes"]);
        let hair = scene.renderer(scene.children(root)[2]).unwrap();
        assert_eq!(hair.mesh.vertex_count(), 40);
    }
}
