use serde::{Deserialize, Serialize};

/// Messages exchanged while transferring one character blob.
///
/// There is no acknowledgement or completion message; the receiver knows
/// from the announcement how many chunks to expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Opens a transfer for `target_id`
    Announcement {
        target_id: u32,
        expected_chunk_count: u32,
    },
    /// One piece of the blob
    Chunk { sequence_index: u32, bytes: Vec<u8> },
}

impl Message {
    /// Serialize to bytes for transmission
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Messages announcing and carrying `chunks` for `target_id`, in send order.
    pub fn transfer(target_id: u32, chunks: Vec<Vec<u8>>) -> Vec<Message> {
        let mut messages = Vec::with_capacity(chunks.len() + 1);
        messages.push(Message::Announcement {
            target_id,
            expected_chunk_count: chunks.len() as u32,
        });
        messages.extend(
            chunks
                .into_iter()
                .enumerate()
                .map(|(i, bytes)| Message::Chunk {
                    sequence_index: i as u32,
                    bytes,
                }),
        );
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_announces_then_numbers_chunks() {
        let messages = Message::transfer(7, vec![vec![1, 2], vec![3]]);
        assert_eq!(
            messages,
            vec![
                Message::Announcement {
                    target_id: 7,
                    expected_chunk_count: 2
                },
                Message::Chunk {
                    sequence_index: 0,
                    bytes: vec![1, 2]
                },
                Message::Chunk {
                    sequence_index: 1,
                    bytes: vec![3]
                },
            ]
        );
    }

    #[test]
    fn wire_format_preserves_chunk_bytes() {
        let message = Message::Chunk {
            sequence_index: 3,
            bytes: (0..=255).collect(),
        };
        let decoded = Message::from_bytes(&message.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, message);
        assert!(Message::from_bytes(&[0xff; 3]).is_err());
    }
}
