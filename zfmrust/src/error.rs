//! High-level error types

use zfmrust_core::Status;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] zfmrust_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] zfmrust_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] zfmrust_types::Error),

    #[error("Device not connected")]
    NotConnected,

    #[error("{command} rejected by device: {status}")]
    Rejected {
        command: &'static str,
        status: Status,
    },
}

impl Error {
    /// The transport gave up waiting for bytes
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// The device sent something the protocol does not allow
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_protocol_violation())
    }
}
