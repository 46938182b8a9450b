//! Snapshot blob format: gzip-compressed bincode

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::error::ExchangeError;
use crate::snapshot::CharacterSnapshot;

/// Default gzip level, between speed and size.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Gzip-compress `data` at `level` (0-9).
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>, ExchangeError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder
        .write_all(data)
        .map_err(|e| ExchangeError::Compression(format!("gzip compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| ExchangeError::Compression(format!("gzip finalization failed: {}", e)))
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>, ExchangeError> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| ExchangeError::Compression(format!("gzip decompression failed: {}", e)))?;
    Ok(decompressed)
}

/// Converts snapshots to and from blobs.
#[derive(Debug, Clone, Copy)]
pub struct BlobCodec {
    level: u32,
}

impl Default for BlobCodec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl BlobCodec {
    pub fn new(level: u32) -> Self {
        Self { level }
    }

    pub fn encode(&self, snapshot: &CharacterSnapshot) -> Result<Vec<u8>, ExchangeError> {
        let body = bincode::serialize(snapshot)?;
        let blob = compress(&body, self.level)?;
        debug!(
            "encoded character {}: {} bytes, {} compressed",
            snapshot.id,
            body.len(),
            blob.len()
        );
        Ok(blob)
    }

    pub fn decode(&self, blob: &[u8]) -> Result<CharacterSnapshot, ExchangeError> {
        let body = decompress(blob)?;
        Ok(bincode::deserialize(&body)?)
    }
}
