//! Serial port transport
//!
//! The module talks 8N1 UART at a multiple of 9600 baud. `serialport` is
//! blocking, so every port operation runs on tokio's blocking pool.
//!
//! Reads are bounded by the port's own read timeout only. Dropping a
//! `receive_exact` future (for example under `tokio::time::timeout`) does not
//! stop the blocking read: it keeps running and swallows bytes of the next
//! reply. Set the bound with [`SerialTransport::with_read_timeout`] instead.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use parking_lot::Mutex;
use serialport::SerialPort;
use tracing::{debug, trace, warn};

use crate::{Transport, error::*};

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

/// Serial transport for fingerprint modules
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    read_timeout: Duration,
    port: Option<SharedPort>,
}

impl SerialTransport {
    /// Create new serial transport
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            read_timeout: Duration::from_secs(1),
            port: None,
        }
    }

    /// Set per-read timeout
    ///
    /// This is the only supported bound on a read; see the module docs.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn shared_port(&self) -> Result<SharedPort> {
        self.port.clone().ok_or(Error::NotOpen)
    }

    async fn blocking<T, F>(port: SharedPort, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn SerialPort) -> Result<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(move || {
            let mut port = port.lock();
            f(port.as_mut())
        })
        .await
        .map_err(|e| Error::Io(io::Error::other(e)))?
    }
}

/// Fill `buf` from `reader`, stopping at the first timeout
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(Error::ConnectionClosed),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                return Err(Error::ReadTimeout {
                    expected: buf.len(),
                    received: filled,
                });
            }
            Err(e) => return Err(Error::Io(e)),
        }
    }

    Ok(())
}

#[async_trait]
impl Transport for SerialTransport {
    async fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        debug!("Opening {} at {} baud...", self.path, self.baud_rate);

        let builder = serialport::new(self.path.clone(), self.baud_rate).timeout(self.read_timeout);
        let port = tokio::task::spawn_blocking(move || builder.open())
            .await
            .map_err(|e| Error::Io(io::Error::other(e)))??;

        debug!("Opened {}", self.path);

        self.port = Some(Arc::new(Mutex::new(port)));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!("Closed {}", self.path);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.shared_port()?;

        trace!("Sending {} bytes: {}", data.len(), hex::encode(&data[..data.len().min(32)]));

        let data = data.to_vec();
        Self::blocking(port, move |port| {
            port.write_all(&data)?;
            port.flush()?;
            Ok(())
        })
        .await
    }

    async fn receive_exact(&mut self, len: usize) -> Result<BytesMut> {
        let port = self.shared_port()?;

        let buf = Self::blocking(port, move |port| {
            let mut buf = BytesMut::zeroed(len);
            read_full(port, &mut buf)?;
            Ok(buf)
        })
        .await
        .inspect_err(|e| {
            if e.is_timeout() {
                warn!("{}", e);
            }
        })?;

        trace!("Received {} bytes: {}", len, hex::encode(&buf[..len.min(32)]));

        Ok(buf)
    }

    async fn bytes_available(&mut self) -> Result<usize> {
        let port = self.shared_port()?;
        Self::blocking(port, |port| Ok(port.bytes_to_read()? as usize)).await
    }

    fn port_name(&self) -> String {
        self.path.clone()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("Serial transport dropped while still open");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Trickle {
        chunks: Vec<io::Result<Vec<u8>>>,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() {
                return Err(io::ErrorKind::TimedOut.into());
            }
            let chunk = self.chunks.remove(0)?;
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_read_full_across_chunks() {
        let mut reader = Trickle {
            chunks: vec![Ok(vec![1, 2]), Err(io::ErrorKind::Interrupted.into()), Ok(vec![3])],
        };
        let mut buf = [0u8; 3];

        read_full(&mut reader, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn test_read_full_timeout_reports_progress() {
        let mut reader = Trickle { chunks: vec![Ok(vec![1, 2])] };
        let mut buf = [0u8; 4];

        let result = read_full(&mut reader, &mut buf);
        assert!(matches!(result, Err(Error::ReadTimeout { expected: 4, received: 2 })));
    }

    #[tokio::test]
    async fn test_serial_transport_create() {
        let transport = SerialTransport::new("/dev/ttyUSB0", 57_600);
        assert_eq!(transport.read_timeout(), Duration::from_secs(1));
        assert!(!transport.is_open());
        assert_eq!(transport.port_name(), "/dev/ttyUSB0");
    }

    #[tokio::test]
    async fn test_serial_transport_not_open() {
        let mut transport = SerialTransport::new("/dev/ttyUSB0", 57_600);
        assert!(matches!(transport.send(&[0x00]).await, Err(Error::NotOpen)));
        assert!(matches!(transport.receive_exact(1).await, Err(Error::NotOpen)));
    }

    #[tokio::test]
    async fn test_serial_transport_read_timeout_setting() {
        let transport = SerialTransport::new("/dev/ttyUSB0", 57_600)
            .with_read_timeout(Duration::from_millis(250));
        assert_eq!(transport.read_timeout(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_serial_transport_invalid_port() {
        let mut transport = SerialTransport::new("/dev/does-not-exist-zfm", 57_600)
            .with_read_timeout(Duration::from_millis(100));

        assert!(transport.open().await.is_err());
        assert!(!transport.is_open());
    }
}
