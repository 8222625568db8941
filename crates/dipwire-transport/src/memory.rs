//! In-memory connection pair.
//!
//! Two [`MemoryConnection`]s created by [`MemoryConnection::pair`] are wired
//! back to back: whatever one sends, the other receives. Closing (or
//! dropping) one side makes the other side's `recv` return `Ok(None)`, the
//! same signal a WebSocket gives on a clean close.

use std::sync::Mutex;

use tokio::sync::{mpsc, watch};

use crate::{Connection, ConnectionId, TransportError};

/// One end of an in-memory duplex link.
pub struct MemoryConnection {
    id: ConnectionId,
    tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    closed: watch::Sender<bool>,
}

impl MemoryConnection {
    /// Creates two connected ends.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (Self::new(a_tx, a_rx), Self::new(b_tx, b_rx))
    }

    fn new(
        tx: mpsc::UnboundedSender<Vec<u8>>,
        rx: mpsc::UnboundedReceiver<Vec<u8>>,
    ) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            id: ConnectionId::next(),
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            closed,
        }
    }

    fn sender(&self) -> Option<mpsc::UnboundedSender<Vec<u8>>> {
        self.tx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Connection for MemoryConnection {
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let tx = self.sender().ok_or_else(|| {
            TransportError::ConnectionClosed("closed locally".into())
        })?;
        tx.send(frame.to_vec()).map_err(|_| {
            TransportError::ConnectionClosed("peer dropped".into())
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let closed = self.closed.subscribe();
        let already_closed = *closed.borrow();
        if already_closed {
            return Ok(None);
        }
        let mut rx = self.rx.lock().await;
        tokio::select! {
            frame = rx.recv() => Ok(frame),
            () = wait_closed(closed) => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.tx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        self.closed.send_replace(true);
        tracing::debug!(id = %self.id, "memory connection closed");
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Resolves once the local side has been closed.
async fn wait_closed(mut closed: watch::Receiver<bool>) {
    loop {
        let is_closed = *closed.borrow_and_update();
        if is_closed {
            return;
        }
        if closed.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_pair_delivers_frames_both_ways() {
        let (a, b) = MemoryConnection::pair();

        a.send(b"ping").await.unwrap();
        assert_eq!(b.recv().await.unwrap(), Some(b"ping".to_vec()));

        b.send(b"pong").await.unwrap();
        assert_eq!(a.recv().await.unwrap(), Some(b"pong".to_vec()));
    }

    #[tokio::test]
    async fn test_pair_preserves_frame_order() {
        let (a, b) = MemoryConnection::pair();
        for i in 0..5u8 {
            a.send(&[i]).await.unwrap();
        }
        for i in 0..5u8 {
            assert_eq!(b.recv().await.unwrap(), Some(vec![i]));
        }
    }

    #[tokio::test]
    async fn test_close_ends_peer_recv() {
        let (a, b) = MemoryConnection::pair();
        a.close().await.unwrap();
        assert_eq!(b.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_drop_ends_peer_recv() {
        let (a, b) = MemoryConnection::pair();
        drop(a);
        assert_eq!(b.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_close_wakes_pending_local_recv() {
        let (a, _b) = MemoryConnection::pair();
        let a = std::sync::Arc::new(a);

        let reader = {
            let a = std::sync::Arc::clone(&a);
            tokio::spawn(async move { a.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        a.close().await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .expect("recv should wake up")
            .unwrap();
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn test_send_after_close_is_connection_closed() {
        let (a, _b) = MemoryConnection::pair();
        a.close().await.unwrap();
        let err = a.send(b"late").await.unwrap_err();
        assert!(err.is_closed());
    }

    #[tokio::test]
    async fn test_send_to_dropped_peer_is_connection_closed() {
        let (a, b) = MemoryConnection::pair();
        drop(b);
        let err = a.send(b"anyone?").await.unwrap_err();
        assert!(err.is_closed());
    }
}
