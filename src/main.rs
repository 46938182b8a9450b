//! Chardat - capture, store, transfer and reapply a skinned character
//!
//! Runs the full exchange on two procedural characters: the source is
//! captured into the local blob store, sent chunk by chunk over a loopback
//! transport and applied to the target one step per frame.

mod settings;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chardat_assets::SoftwareGraphics;
use chardat_core::sample::{build_character, SampleCharacter};
use chardat_core::Scene;
use chardat_exchange::{
    save_character, BlobStore, CharacterId, CharacterReceiver, CharacterSender, ReceiverStatus,
    SaveOutcome, WorkerPool,
};
use chardat_net::LoopbackTransport;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use settings::Settings;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    let settings = Settings::load();
    if std::env::args().any(|a| a == "--write-settings") {
        settings.save().context("Failed to write settings")?;
    }
    let config = &settings.exchange;
    let id = CharacterId(settings.demo.character_id);

    let mut scene = Scene::new();
    let source = build_character(
        &mut scene,
        "Source",
        &SampleCharacter {
            extra_parts: settings.demo.extra_parts.clone(),
            ..Default::default()
        },
    );
    let target = build_character(
        &mut scene,
        "Target",
        &SampleCharacter {
            extra_parts: settings.demo.extra_parts.clone(),
            seed: 2,
            ..Default::default()
        },
    );
    let mut gfx = SoftwareGraphics::default();
    let pool = WorkerPool::new(config.worker_threads).context("Failed to start worker pool")?;

    let store = BlobStore::new(settings.storage_dir());
    match save_character(&scene, source, id, &store, &pool, config, &mut gfx)
        .context("Failed to save character")?
    {
        SaveOutcome::Written(path) => info!("Stored character {} at {:?}", id, path),
        SaveOutcome::Skipped(path) => warn!("Sending the existing blob at {:?}", path),
    }

    let (mut tx, mut rx) = LoopbackTransport::pair();
    let chunks = CharacterSender::new(config.chunk_size)
        .send_stored(&mut tx, &store, id)
        .context("Failed to send character")?;

    let mut receiver = CharacterReceiver::new(target, config);
    let frame = Duration::from_millis(settings.demo.frame_millis);
    let started = Instant::now();
    let mut frames = 0u32;
    loop {
        receiver.poll(&mut rx, &pool).context("Transport failed")?;
        let status = receiver
            .update(&mut scene, &mut gfx)
            .context("Failed to apply character")?;
        frames += 1;
        match status {
            ReceiverStatus::Applied { id } => {
                info!(
                    "Applied character {} from {} chunks in {} frames ({:?})",
                    id,
                    chunks,
                    frames,
                    started.elapsed()
                );
                break;
            }
            ReceiverStatus::Idle => anyhow::bail!("Transfer ended without a character"),
            status => info!("Frame {}: {:?}", frames, status),
        }
        std::thread::sleep(frame);
    }

    Ok(())
}
