//! Transport layer for ZFM fingerprint modules
//!
//! Provides the byte channel the protocol runs over: a serial port for real
//! hardware and a scripted mock for tests.

pub mod error;
pub mod mock;
pub mod serial;

pub use error::{Error, Result};
pub use mock::MockTransport;
pub use serial::SerialTransport;

use async_trait::async_trait;
use bytes::BytesMut;

/// Byte channel to a fingerprint module
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the channel
    async fn open(&mut self) -> Result<()>;

    /// Close the channel
    async fn close(&mut self) -> Result<()>;

    /// Check if open
    fn is_open(&self) -> bool;

    /// Send raw bytes
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive exactly `len` bytes, failing with `ReadTimeout` if the
    /// device goes quiet first
    ///
    /// Not cancel-safe: bound reads with the transport's own timeout rather
    /// than by dropping the future.
    async fn receive_exact(&mut self, len: usize) -> Result<BytesMut>;

    /// Receive a single byte
    async fn read_byte(&mut self) -> Result<u8> {
        let buf = self.receive_exact(1).await?;
        Ok(buf[0])
    }

    /// Number of bytes waiting to be read
    async fn bytes_available(&mut self) -> Result<usize>;

    /// Name of the underlying port
    fn port_name(&self) -> String;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn open(&mut self) -> Result<()> {
        (**self).open().await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        (**self).send(data).await
    }

    async fn receive_exact(&mut self, len: usize) -> Result<BytesMut> {
        (**self).receive_exact(len).await
    }

    async fn read_byte(&mut self) -> Result<u8> {
        (**self).read_byte().await
    }

    async fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available().await
    }

    fn port_name(&self) -> String {
        (**self).port_name()
    }
}
