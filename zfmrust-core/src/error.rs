//! Error types for zfmrust-core

use crate::packet::PacketType;

/// Result type alias for zfmrust operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Frame does not start with the protocol start code
    #[error("Invalid start code: expected 0x{expected:04X}, got 0x{actual:04X}")]
    InvalidStartCode {
        expected: u16,
        actual: u16,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    ChecksumMismatch {
        expected: u16,
        received: u16,
    },

    /// Buffer is too short to hold the frame it describes
    #[error("Packet too short: expected at least {expected} bytes, got {actual} bytes")]
    PacketTooShort {
        expected: usize,
        actual: usize,
    },

    /// Length field smaller than the checksum it must cover
    #[error("Invalid length field: {0} (minimum is 2)")]
    InvalidLength(u16),

    /// Unknown packet identifier
    #[error("Unknown packet type: 0x{0:02X}")]
    UnknownPacketType(u8),

    /// Packet of a type the exchange does not allow at this point
    #[error("Unexpected packet type: expected {expected}, got {actual}")]
    UnexpectedPacketType {
        expected: &'static str,
        actual: PacketType,
    },

    /// Reply came from a different module address
    #[error("Address mismatch: expected 0x{expected:08X}, got 0x{actual:08X}")]
    AddressMismatch {
        expected: u32,
        actual: u32,
    },

    /// Fewer packets arrived than the command always produces
    #[error("Missing packets: expected {expected}, received {received}")]
    MissingPackets {
        expected: usize,
        received: usize,
    },

    /// Reassembled bulk transfer has the wrong size
    #[error("Transfer length mismatch: expected {expected} bytes, got {actual} bytes")]
    TransferLength {
        expected: usize,
        actual: usize,
    },

    /// Acknowledgment without a confirmation code
    #[error("Empty reply: acknowledgment carries no confirmation code")]
    EmptyReply,

    /// Successful reply shorter than the command's result layout
    #[error("Reply too short for {command}: expected {expected} bytes, got {actual} bytes")]
    ReplyTooShort {
        command: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Invalid session state
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),
}

impl Error {
    /// Start code mismatch or impossible length field
    pub fn is_framing_error(&self) -> bool {
        matches!(self, Self::InvalidStartCode { .. } | Self::InvalidLength(_))
    }

    /// Transmitted and computed checksums disagree
    pub fn is_checksum_error(&self) -> bool {
        matches!(self, Self::ChecksumMismatch { .. })
    }

    /// Number, type or origin of packets does not match the command contract
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedPacketType { .. }
                | Self::AddressMismatch { .. }
                | Self::MissingPackets { .. }
                | Self::TransferLength { .. }
                | Self::EmptyReply
                | Self::ReplyTooShort { .. }
                | Self::UnknownPacketType(_)
        )
    }
}
