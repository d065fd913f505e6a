//! Scripted transport for testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::Mutex;

use crate::{Transport, error::*};

#[derive(Debug, Default)]
struct MockState {
    incoming: VecDeque<u8>,
    writes: Vec<Vec<u8>>,
    open: bool,
    fail_open: bool,
}

/// In-memory transport that replays queued device bytes and records
/// everything the host writes
///
/// Clones share state, so a test can keep a handle after moving the
/// transport into a device.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the host to read
    pub fn queue(&self, bytes: impl AsRef<[u8]>) {
        self.state.lock().incoming.extend(bytes.as_ref());
    }

    /// Make the next `open` call fail
    pub fn fail_open(&self) {
        self.state.lock().fail_open = true;
    }

    /// All writes made by the host, one entry per `send`
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    /// Clear captured writes
    pub fn clear_written(&self) {
        self.state.lock().writes.clear();
    }

    /// Bytes queued but not yet read
    pub fn pending(&self) -> usize {
        self.state.lock().incoming.len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.open {
            return Err(Error::AlreadyOpen);
        }
        if state.fail_open {
            state.fail_open = false;
            return Err(Error::Io(std::io::ErrorKind::NotFound.into()));
        }
        state.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state.lock().open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(Error::NotOpen);
        }
        state.writes.push(data.to_vec());
        Ok(())
    }

    async fn receive_exact(&mut self, len: usize) -> Result<BytesMut> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(Error::NotOpen);
        }

        let available = state.incoming.len();
        if available < len {
            state.incoming.clear();
            return Err(Error::ReadTimeout {
                expected: len,
                received: available,
            });
        }

        Ok(state.incoming.drain(..len).collect())
    }

    async fn bytes_available(&mut self) -> Result<usize> {
        let state = self.state.lock();
        if !state.open {
            return Err(Error::NotOpen);
        }
        Ok(state.incoming.len())
    }

    fn port_name(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_queue() {
        let mut mock = MockTransport::new();
        mock.open().await.unwrap();
        mock.queue([0xEF, 0x01]);
        mock.queue(vec![0xAA]);

        assert_eq!(mock.bytes_available().await.unwrap(), 3);
        assert_eq!(&mock.receive_exact(2).await.unwrap()[..], &[0xEF, 0x01]);
        assert_eq!(mock.read_byte().await.unwrap(), 0xAA);
        assert_eq!(mock.pending(), 0);
    }

    #[tokio::test]
    async fn test_mock_short_read_times_out() {
        let mut mock = MockTransport::new();
        mock.open().await.unwrap();
        mock.queue([0x01, 0x02]);

        let result = mock.receive_exact(4).await;
        assert!(matches!(result, Err(Error::ReadTimeout { expected: 4, received: 2 })));
        assert_eq!(mock.pending(), 0);
    }

    #[tokio::test]
    async fn test_mock_write_capture_shared_between_clones() {
        let handle = MockTransport::new();
        let mut mock = handle.clone();
        mock.open().await.unwrap();

        mock.send(b"Hello").await.unwrap();
        mock.send(b"World").await.unwrap();

        let writes = handle.written();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], b"Hello");
        assert_eq!(writes[1], b"World");

        handle.clear_written();
        assert!(handle.written().is_empty());
    }

    #[tokio::test]
    async fn test_mock_closed() {
        let mut mock = MockTransport::new();
        assert!(!mock.is_open());
        assert!(matches!(mock.send(b"x").await, Err(Error::NotOpen)));

        mock.fail_open();
        assert!(mock.open().await.is_err());
        mock.open().await.unwrap();
        assert!(matches!(mock.open().await, Err(Error::AlreadyOpen)));

        mock.close().await.unwrap();
        assert!(!mock.is_open());
    }
}
