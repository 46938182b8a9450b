//! Capture to and apply from the local blob store

use chardat_assets::GraphicsContext;
use chardat_core::{NodeId, Scene};
use tracing::warn;

use crate::codec::BlobCodec;
use crate::config::ExchangeConfig;
use crate::error::{ExchangeError, StoreError};
use crate::reconstruct::apply_character;
use crate::resolver::CharacterId;
use crate::snapshot::capture_character;
use crate::store::{BlobStore, SaveOutcome};
use crate::worker::WorkerPool;

/// Capture the character at `root` and store it under `id`.
pub fn save_character<G: GraphicsContext + ?Sized>(
    scene: &Scene,
    root: NodeId,
    id: CharacterId,
    store: &BlobStore,
    pool: &WorkerPool,
    config: &ExchangeConfig,
    gfx: &mut G,
) -> Result<SaveOutcome, ExchangeError> {
    let snapshot = capture_character(scene, root, id, &config.schema, &config.channels, gfx)?;
    let blob = pool
        .encode(BlobCodec::new(config.compression_level), snapshot)
        .wait()?;
    Ok(store.save(id, &blob)?)
}

/// Load the blob stored under `id` and apply it to the character at `root`.
///
/// Returns `Ok(false)` when nothing is stored under `id`.
pub fn load_and_apply<G: GraphicsContext + ?Sized>(
    scene: &mut Scene,
    root: NodeId,
    id: CharacterId,
    store: &BlobStore,
    pool: &WorkerPool,
    config: &ExchangeConfig,
    gfx: &mut G,
) -> Result<bool, ExchangeError> {
    let blob = match store.load(id) {
        Ok(blob) => blob,
        Err(StoreError::NotFound(path)) => {
            warn!("file not found: {:?}", path);
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };
    let snapshot = pool
        .decode(BlobCodec::new(config.compression_level), blob)
        .wait()?;
    let target = config.schema.resolve(scene, root, snapshot.id)?;
    apply_character(snapshot, scene, &target, &config.channels, gfx)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chardat_assets::SoftwareGraphics;
    use chardat_core::sample::{build_character, SampleCharacter};

    #[test]
    fn save_then_load_onto_another_character() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        let pool = WorkerPool::new(2).unwrap();
        let config = ExchangeConfig::default();
        let mut gfx = SoftwareGraphics::default();

        let mut scene = Scene::new();
        let source = build_character(&mut scene, "Source", &SampleCharacter::default());
        let target = build_character(
            &mut scene,
            "Target",
            &SampleCharacter {
                seed: 4,
                ..Default::default()
            },
        );

        let outcome =
            save_character(&scene, source, CharacterId(2), &store, &pool, &config, &mut gfx)
                .unwrap();
        assert!(matches!(outcome, SaveOutcome::Written(_)));
        let again =
            save_character(&scene, source, CharacterId(2), &store, &pool, &config, &mut gfx)
                .unwrap();
        assert!(matches!(again, SaveOutcome::Skipped(_)));

        assert!(
            load_and_apply(&mut scene, target, CharacterId(2), &store, &pool, &config, &mut gfx)
                .unwrap()
        );
        let body = |root: NodeId| scene.renderer(scene.children(root)[1]).unwrap();
        assert_eq!(body(target).mesh.vertices, body(source).mesh.vertices);
    }

    #[test]
    fn missing_blob_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut scene = Scene::new();
        let target = build_character(&mut scene, "Target", &SampleCharacter::default());
        let loaded = load_and_apply(
            &mut scene,
            target,
            CharacterId(40),
            &BlobStore::new(dir.path()),
            &WorkerPool::new(1).unwrap(),
            &ExchangeConfig::default(),
            &mut SoftwareGraphics::default(),
        )
        .unwrap();
        assert!(!loaded);
    }
}
