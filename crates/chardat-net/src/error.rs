/// Errors raised while splitting, sending or reassembling a blob.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("chunk size must be positive")]
    ZeroChunkSize,

    #[error("chunk {sequence_index} arrived with no transfer announced")]
    UnexpectedChunk { sequence_index: u32 },

    #[error("chunk {sequence_index} is outside the announced {expected} chunks")]
    ChunkOutOfRange { sequence_index: u32, expected: u32 },

    #[error("transfer for target {target_id} completed without chunks {missing:?}")]
    MissingChunks { target_id: u32, missing: Vec<u32> },

    #[error("transfer for target {target_id} timed out with {received} of {expected} chunks")]
    TimedOut {
        target_id: u32,
        received: u32,
        expected: u32,
    },

    #[error("message encoding failed: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("transport disconnected")]
    Disconnected,
}
