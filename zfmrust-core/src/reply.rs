//! Acknowledgment interpretation

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;

use crate::{
    command::Command,
    error::{Error, Result},
    packet::Packet,
    status::Status,
};

/// Confirmation code and result bytes of one acknowledgment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReply {
    /// Literal confirmation code
    pub status: Status,

    /// Bytes after the confirmation code
    pub payload: Bytes,
}

impl RawReply {
    /// Interpret an acknowledgment packet
    ///
    /// # Errors
    ///
    /// - `UnexpectedPacketType` if the packet is not an acknowledgment
    /// - `EmptyReply` if it carries no confirmation code
    pub fn from_packet(packet: Packet) -> Result<Self> {
        if !packet.is_ack() {
            return Err(Error::UnexpectedPacketType {
                expected: "ACK",
                actual: packet.packet_type,
            });
        }

        let mut payload = packet.payload;
        if payload.is_empty() {
            return Err(Error::EmptyReply);
        }

        let status = Status::from(payload[0]);
        let payload = payload.split_off(1);

        Ok(Self { status, payload })
    }

    /// Check that a successful reply carries the command's full result layout
    ///
    /// Failure replies are not checked: the module only sends the
    /// confirmation code for those.
    pub fn check_layout(&self, command: &Command) -> Result<()> {
        let expected = command.reply_len();
        if self.status.is_ok() && self.payload.len() < expected {
            return Err(Error::ReplyTooShort {
                command: command.name(),
                expected,
                actual: self.payload.len(),
            });
        }
        Ok(())
    }

    /// Big-endian u16 at `offset` of the result bytes
    pub fn u16_at(&self, offset: usize) -> Option<u16> {
        self.payload
            .get(offset..offset + 2)
            .map(BigEndian::read_u16)
    }

    /// Big-endian u32 at `offset` of the result bytes
    pub fn u32_at(&self, offset: usize) -> Option<u32> {
        self.payload
            .get(offset..offset + 4)
            .map(BigEndian::read_u32)
    }
}

/// Result of a typed operation: either the decoded value or the module's
/// confirmation code explaining why there is none
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Success(T),
    Failure(Status),
}

impl<T> Outcome<T> {
    /// Confirmation code of the exchange
    pub fn status(&self) -> Status {
        match self {
            Self::Success(_) => Status::Ok,
            Self::Failure(status) => *status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Value on success
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Failure(status) => Outcome::Failure(status),
        }
    }

    /// Convert to a `Result` with the failure status as error
    pub fn into_result(self) -> std::result::Result<T, Status> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(status) => Err(status),
        }
    }
}
