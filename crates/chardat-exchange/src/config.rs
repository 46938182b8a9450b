use std::time::Duration;

use chardat_assets::ChannelTable;
use chardat_net::{DEFAULT_CHUNK_SIZE, DEFAULT_SESSION_TIMEOUT};
use serde::{Deserialize, Serialize};

use crate::codec::DEFAULT_COMPRESSION_LEVEL;
use crate::resolver::CharacterSchema;

/// Tunables for capture, storage and transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Bytes per transfer chunk
    pub chunk_size: usize,
    /// Seconds a transfer may stay silent before it is abandoned
    pub session_timeout_secs: u64,
    pub worker_threads: usize,
    /// Gzip level, 0-9
    pub compression_level: u32,
    /// Directory name of the blob store below the data directory
    pub storage_dir: String,
    pub schema: CharacterSchema,
    pub channels: ChannelTable,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT.as_secs(),
            worker_threads: 2,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            storage_dir: "characters".to_string(),
            schema: CharacterSchema::default(),
            channels: ChannelTable::default(),
        }
    }
}

impl ExchangeConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}
