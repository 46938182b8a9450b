use chardat_core::{NodeId, Quat, Scene, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::AssetError;

/// Parent-relative position and rotation of one bone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BonePose {
    pub local_position: Vec3,
    pub local_rotation: Quat,
}

/// Local transforms of every skeleton bone, in skeleton array order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkeletonPose {
    pub bones: Vec<BonePose>,
}

impl SkeletonPose {
    /// Read the local transform of every bone in `skeleton`.
    pub fn capture(scene: &Scene, skeleton: &[NodeId]) -> Result<Self, AssetError> {
        let bones = skeleton
            .iter()
            .map(|&id| {
                let node = scene.node(id).ok_or(AssetError::UnknownBone(id))?;
                Ok(BonePose {
                    local_position: node.transform.position,
                    local_rotation: node.transform.rotation,
                })
            })
            .collect::<Result<_, AssetError>>()?;
        Ok(Self { bones })
    }

    /// Write the pose back onto a live skeleton.
    ///
    /// The skeleton must have exactly as many bones as the pose and every bone
    /// must exist; nothing is written otherwise.
    pub fn apply(&self, scene: &mut Scene, skeleton: &[NodeId]) -> Result<(), AssetError> {
        if self.bones.len() != skeleton.len() {
            return Err(AssetError::SkeletonMismatch {
                snapshot: self.bones.len(),
                live: skeleton.len(),
            });
        }
        if let Some(&missing) = skeleton.iter().find(|&&id| scene.node(id).is_none()) {
            return Err(AssetError::UnknownBone(missing));
        }

        for (pose, &id) in self.bones.iter().zip(skeleton) {
            if let Some(node) = scene.node_mut(id) {
                node.transform.position = pose.local_position;
                node.transform.rotation = pose.local_rotation;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chardat_core::sample::{build_character, SampleCharacter};

    fn skeleton_of(scene: &Scene, character: NodeId) -> Vec<NodeId> {
        scene.descendants(scene.children(character)[0])
    }

    #[test]
    fn capture_then_apply_copies_local_transforms() {
        let mut scene = Scene::new();
        let source = build_character(&mut scene, "A", &SampleCharacter::default());
        let target = build_character(
            &mut scene,
            "B",
            &SampleCharacter {
                seed: 99,
                ..Default::default()
            },
        );
        let src_bones = skeleton_of(&scene, source);
        let dst_bones = skeleton_of(&scene, target);

        let pose = SkeletonPose::capture(&scene, &src_bones).unwrap();
        assert_eq!(pose.len(), 10);
        pose.apply(&mut scene, &dst_bones).unwrap();

        for (a, b) in src_bones.iter().zip(&dst_bones) {
            let ta = scene.node(*a).unwrap().transform;
            let tb = scene.node(*b).unwrap().transform;
            assert_eq!(ta.position, tb.position);
            assert_eq!(ta.rotation, tb.rotation);
        }
    }

    #[test]
    fn apply_rejects_mismatched_skeleton() {
        let mut scene = Scene::new();
        let character = build_character(&mut scene, "A", &SampleCharacter::default());
        let bones = skeleton_of(&scene, character);
        let pose = SkeletonPose::capture(&scene, &bones).unwrap();
        let before = scene.node(bones[1]).unwrap().transform;

        let err = pose.apply(&mut scene, &bones[..5]).unwrap_err();
        assert!(matches!(err, AssetError::SkeletonMismatch { snapshot: 10, live: 5 }));
        assert_eq!(scene.node(bones[1]).unwrap().transform, before);
    }
}
