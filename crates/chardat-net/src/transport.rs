use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use tracing::trace;

use crate::error::TransferError;
use crate::message::Message;

/// A reliable, ordered message channel.
pub trait Transport {
    fn send(&mut self, message: &Message) -> Result<(), TransferError>;

    /// Next received message, or `None` if nothing is waiting.
    fn try_recv(&mut self) -> Result<Option<Message>, TransferError>;
}

/// In-process transport. Messages cross the link in their wire encoding.
#[derive(Debug)]
pub struct LoopbackTransport {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

impl LoopbackTransport {
    /// Two connected endpoints.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel();
        let (b_tx, a_rx) = mpsc::channel();
        (
            Self { tx: a_tx, rx: a_rx },
            Self { tx: b_tx, rx: b_rx },
        )
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, message: &Message) -> Result<(), TransferError> {
        let bytes = message.to_bytes()?;
        trace!("sending {} byte message", bytes.len());
        self.tx.send(bytes).map_err(|_| TransferError::Disconnected)
    }

    fn try_recv(&mut self) -> Result<Option<Message>, TransferError> {
        match self.rx.try_recv() {
            Ok(bytes) => Ok(Some(Message::from_bytes(&bytes)?)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransferError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_cross_in_order() {
        let (mut a, mut b) = LoopbackTransport::pair();
        for message in Message::transfer(1, vec![vec![1], vec![2, 3]]) {
            a.send(&message).unwrap();
        }

        let mut received = Vec::new();
        while let Some(message) = b.try_recv().unwrap() {
            received.push(message);
        }
        assert_eq!(received, Message::transfer(1, vec![vec![1], vec![2, 3]]));
        assert!(a.try_recv().unwrap().is_none());
    }

    #[test]
    fn dropped_peer_disconnects() {
        let (mut a, b) = LoopbackTransport::pair();
        drop(b);
        assert!(matches!(
            a.send(&Message::Announcement {
                target_id: 0,
                expected_chunk_count: 0
            }),
            Err(TransferError::Disconnected)
        ));
        assert!(matches!(a.try_recv(), Err(TransferError::Disconnected)));
    }
}
