//! Engine-side skinned mesh with derived-data recomputation

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::error::MeshError;
use crate::types::{BoneWeight, Bounds, Color};

/// Below this UV-space area a triangle contributes nothing to tangents.
const DEGENERATE_UV_AREA: f32 = 1e-12;

/// One keyed deformation of a blend shape.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendShapeFrame {
    /// Intensity at which the deltas apply fully (conventionally 0..=100)
    pub weight: f32,
    pub delta_vertices: Vec<Vec3>,
    pub delta_normals: Vec<Vec3>,
    pub delta_tangents: Vec<Vec3>,
}

/// A named blend shape with one or more frames.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendShape {
    pub name: String,
    pub frames: Vec<BlendShapeFrame>,
}

impl BlendShape {
    /// The frame with the highest weight; ties keep the earliest frame.
    pub fn strongest_frame(&self) -> Option<&BlendShapeFrame> {
        self.frames
            .iter()
            .reduce(|best, frame| if frame.weight > best.weight { frame } else { best })
    }
}

/// A skinned triangle mesh as held by a renderer.
///
/// Normals, tangents and bounds are derived data and can be rebuilt from
/// positions, triangles and UVs at any time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub triangles: Vec<u32>,
    pub colors: Vec<Color>,
    pub uvs: Vec<Vec2>,
    pub bounds: Bounds,
    pub bind_poses: Vec<Mat4>,
    /// Hint that the buffers will be rewritten at runtime
    pub dynamic: bool,
    submeshes: Vec<Vec<u32>>,
    bone_weights: Vec<BoneWeight>,
    blend_shapes: Vec<BlendShape>,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn submeshes(&self) -> &[Vec<u32>] {
        &self.submeshes
    }

    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }

    /// Replace the submesh partition. Every index must address an existing vertex.
    pub fn set_submeshes(&mut self, submeshes: Vec<Vec<u32>>) -> Result<(), MeshError> {
        let vertex_count = self.vertices.len();
        for (submesh, indices) in submeshes.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshError::IndexOutOfRange {
                    submesh,
                    index,
                    vertex_count,
                });
            }
        }
        self.submeshes = submeshes;
        Ok(())
    }

    pub fn bone_weights(&self) -> &[BoneWeight] {
        &self.bone_weights
    }

    /// Replace the skinning influences. An empty list unskins the mesh.
    pub fn set_bone_weights(&mut self, weights: Vec<BoneWeight>) -> Result<(), MeshError> {
        if !weights.is_empty() && weights.len() != self.vertices.len() {
            return Err(MeshError::LengthMismatch {
                buffer: "bone weights",
                expected: self.vertices.len(),
                actual: weights.len(),
            });
        }
        self.bone_weights = weights;
        Ok(())
    }

    pub fn blend_shapes(&self) -> &[BlendShape] {
        &self.blend_shapes
    }

    pub fn clear_blend_shapes(&mut self) {
        self.blend_shapes.clear();
    }

    /// Append a frame to the named blend shape, creating the shape at the end
    /// of the list if it does not exist yet.
    pub fn add_blend_shape_frame(
        &mut self,
        name: &str,
        weight: f32,
        delta_vertices: Vec<Vec3>,
        delta_normals: Vec<Vec3>,
        delta_tangents: Vec<Vec3>,
    ) -> Result<(), MeshError> {
        if name.is_empty() {
            return Err(MeshError::EmptyBlendShapeName);
        }
        let expected = self.vertices.len();
        for (buffer, len) in [
            ("blend shape vertex deltas", delta_vertices.len()),
            ("blend shape normal deltas", delta_normals.len()),
            ("blend shape tangent deltas", delta_tangents.len()),
        ] {
            if len != expected {
                return Err(MeshError::LengthMismatch {
                    buffer,
                    expected,
                    actual: len,
                });
            }
        }

        let frame = BlendShapeFrame {
            weight,
            delta_vertices,
            delta_normals,
            delta_tangents,
        };
        match self.blend_shapes.iter_mut().find(|s| s.name == name) {
            Some(shape) => shape.frames.push(frame),
            None => self.blend_shapes.push(BlendShape {
                name: name.to_string(),
                frames: vec![frame],
            }),
        }
        Ok(())
    }

    /// Iterate over triangles whose three indices address existing vertices.
    fn valid_triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let n = self.vertices.len();
        self.triangles.chunks_exact(3).filter_map(move |t| {
            let tri = [t[0] as usize, t[1] as usize, t[2] as usize];
            tri.iter().all(|&i| i < n).then_some(tri)
        })
    }

    /// Rebuild smooth per-vertex normals from area-weighted face normals.
    pub fn recalculate_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.vertices.len()];
        for [a, b, c] in self.valid_triangles() {
            let (p0, p1, p2) = (self.vertices[a], self.vertices[b], self.vertices[c]);
            // Unnormalized cross product weights each face by its area.
            let face = (p1 - p0).cross(p2 - p0);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        for n in &mut normals {
            *n = n.normalize_or_zero();
        }
        self.normals = normals;
    }

    /// Rebuild per-vertex tangents (xyz + handedness in w) from positions,
    /// normals and UVs. Recomputes normals first if they are stale.
    pub fn recalculate_tangents(&mut self) {
        let n = self.vertices.len();
        if self.normals.len() != n {
            self.recalculate_normals();
        }

        let mut tan_u = vec![Vec3::ZERO; n];
        let mut tan_v = vec![Vec3::ZERO; n];
        if self.uvs.len() == n {
            for [a, b, c] in self.valid_triangles() {
                let e1 = self.vertices[b] - self.vertices[a];
                let e2 = self.vertices[c] - self.vertices[a];
                let d1 = self.uvs[b] - self.uvs[a];
                let d2 = self.uvs[c] - self.uvs[a];

                let r = d1.x * d2.y - d2.x * d1.y;
                if r.abs() < DEGENERATE_UV_AREA {
                    continue;
                }
                let f = 1.0 / r;
                let sdir = (e1 * d2.y - e2 * d1.y) * f;
                let tdir = (e2 * d1.x - e1 * d2.x) * f;
                for i in [a, b, c] {
                    tan_u[i] += sdir;
                    tan_v[i] += tdir;
                }
            }
        }

        self.tangents = (0..n)
            .map(|i| {
                let normal = self.normals[i];
                // Gram-Schmidt against the normal.
                let t = (tan_u[i] - normal * normal.dot(tan_u[i])).normalize_or_zero();
                let t = if t != Vec3::ZERO {
                    t
                } else if normal != Vec3::ZERO {
                    normal.any_orthonormal_vector()
                } else {
                    Vec3::X
                };
                let w = if normal.cross(t).dot(tan_v[i]) < 0.0 { -1.0 } else { 1.0 };
                t.extend(w)
            })
            .collect();
    }

    /// Recompute bounds from the vertex positions. Keeps the current bounds
    /// when there are no vertices.
    pub fn recalculate_bounds(&mut self) {
        if let Some(bounds) = Bounds::from_points(&self.vertices) {
            self.bounds = bounds;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        mesh.uvs = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        mesh.triangles = vec![0, 1, 2, 0, 2, 3];
        mesh
    }

    #[test]
    fn normals_face_out_of_the_quad() {
        let mut mesh = quad();
        mesh.recalculate_normals();
        assert_eq!(mesh.normals.len(), 4);
        for n in &mesh.normals {
            assert!((*n - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn tangents_follow_u_direction() {
        let mut mesh = quad();
        mesh.recalculate_tangents();
        assert_eq!(mesh.tangents.len(), 4);
        for t in &mesh.tangents {
            assert!((t.truncate() - Vec3::X).length() < 1e-6);
            assert_eq!(t.w, 1.0);
        }
    }

    #[test]
    fn tangents_without_uvs_are_orthogonal_to_normals() {
        let mut mesh = quad();
        mesh.uvs.clear();
        mesh.recalculate_tangents();
        for (t, n) in mesh.tangents.iter().zip(&mesh.normals) {
            assert!(t.truncate().dot(*n).abs() < 1e-6);
            assert!((t.truncate().length() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn out_of_range_triangles_are_ignored() {
        let mut mesh = quad();
        mesh.triangles.extend_from_slice(&[0, 1, 99]);
        mesh.recalculate_normals();
        assert!((mesh.normals[0] - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn bounds_recalculation_keeps_hint_for_empty_mesh() {
        let mut mesh = Mesh::new();
        let hint = Bounds::new(Vec3::ONE, Vec3::splat(2.0));
        mesh.bounds = hint;
        mesh.recalculate_bounds();
        assert_eq!(mesh.bounds, hint);

        let mut mesh = quad();
        mesh.bounds = hint;
        mesh.recalculate_bounds();
        assert_eq!(mesh.bounds.center, Vec3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn submesh_indices_are_validated() {
        let mut mesh = quad();
        assert!(mesh.set_submeshes(vec![vec![0, 1, 2], vec![0, 2, 3]]).is_ok());
        assert_eq!(mesh.submesh_count(), 2);
        let err = mesh.set_submeshes(vec![vec![0, 1, 4]]).unwrap_err();
        assert!(matches!(err, MeshError::IndexOutOfRange { submesh: 0, index: 4, .. }));
        assert_eq!(mesh.submesh_count(), 2);
    }

    #[test]
    fn bone_weights_must_match_vertex_count() {
        let mut mesh = quad();
        assert!(mesh.set_bone_weights(vec![BoneWeight::single(0); 3]).is_err());
        assert!(mesh.set_bone_weights(vec![BoneWeight::single(0); 4]).is_ok());
        assert!(mesh.set_bone_weights(Vec::new()).is_ok());
    }

    #[test]
    fn blend_shape_frames_group_by_name() {
        let mut mesh = quad();
        let zeros = || vec![Vec3::ZERO; 4];
        mesh.add_blend_shape_frame("smile", 50.0, zeros(), zeros(), zeros()).unwrap();
        mesh.add_blend_shape_frame("blink", 100.0, zeros(), zeros(), zeros()).unwrap();
        mesh.add_blend_shape_frame("smile", 100.0, vec![Vec3::Y; 4], zeros(), zeros()).unwrap();

        let shapes = mesh.blend_shapes();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].name, "smile");
        assert_eq!(shapes[0].frames.len(), 2);
        let strongest = shapes[0].strongest_frame().unwrap();
        assert_eq!(strongest.weight, 100.0);
        assert_eq!(strongest.delta_vertices[0], Vec3::Y);

        let err = mesh
            .add_blend_shape_frame("short", 100.0, vec![Vec3::ZERO; 2], zeros(), zeros())
            .unwrap_err();
        assert!(matches!(err, MeshError::LengthMismatch { expected: 4, actual: 2, .. }));

        mesh.clear_blend_shapes();
        assert!(mesh.blend_shapes().is_empty());
    }
}
