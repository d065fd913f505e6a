//! Frame structure and encoding/decoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    constants::START_CODE,
    error::{Error, Result},
};

/// Packet identifier
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Host to module instruction
    Command = 0x01,

    /// Bulk transfer chunk, more chunks follow
    Data = 0x02,

    /// Module acknowledgment / reply
    Ack = 0x07,

    /// Last chunk of a bulk transfer
    EndData = 0x08,
}

impl PacketType {
    /// Data-class packets carry bulk transfer chunks
    pub fn is_data(self) -> bool {
        matches!(self, Self::Data | Self::EndData)
    }

    /// Get packet type name
    pub fn name(self) -> &'static str {
        match self {
            Self::Command => "COMMAND",
            Self::Data => "DATA",
            Self::Ack => "ACK",
            Self::EndData => "END_DATA",
        }
    }
}

impl From<PacketType> for u8 {
    fn from(packet_type: PacketType) -> u8 {
        packet_type as u8
    }
}

impl TryFrom<u8> for PacketType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Command),
            0x02 => Ok(Self::Data),
            0x07 => Ok(Self::Ack),
            0x08 => Ok(Self::EndData),
            _ => Err(Error::UnknownPacketType(value)),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

/// Fixed-size frame header
///
/// Parsed on its own so that a reader knows how many more bytes belong to
/// the frame before pulling them from the byte stream. The identifier and
/// length are kept as transmitted; both are covered by the checksum and are
/// only interpreted once it has been verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Module address
    pub address: u32,

    /// Raw packet identifier
    pub packet_type: u8,

    /// Length field (payload length + 2)
    pub length: u16,
}

impl PacketHeader {
    /// Parse the 9 header bytes
    ///
    /// # Errors
    ///
    /// - `PacketTooShort` if fewer than 9 bytes are given
    /// - `InvalidStartCode` if the frame does not start with `0xEF01`
    pub fn parse(mut buf: &[u8]) -> Result<Self> {
        if buf.len() < Packet::HEADER_SIZE {
            return Err(Error::PacketTooShort {
                expected: Packet::HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let start = buf.get_u16();
        if start != START_CODE {
            return Err(Error::InvalidStartCode {
                expected: START_CODE,
                actual: start,
            });
        }

        Ok(Self {
            address: buf.get_u32(),
            packet_type: buf.get_u8(),
            length: buf.get_u16(),
        })
    }

    /// Number of payload bytes following the header
    pub fn payload_len(&self) -> usize {
        (self.length as usize).saturating_sub(Packet::CHECKSUM_SIZE)
    }

    /// Number of bytes following the header (payload + checksum)
    ///
    /// A length field below 2 cannot cover its own checksum; the two
    /// checksum bytes are still read so the frame is consumed whole.
    pub fn remaining_len(&self) -> usize {
        self.payload_len() + Packet::CHECKSUM_SIZE
    }

    /// Total frame size
    pub fn frame_len(&self) -> usize {
        Packet::HEADER_SIZE + self.remaining_len()
    }
}

/// Protocol frame
///
/// # Frame Structure
///
/// ```text
/// ┌───────────┬───────────┬──────────┬──────────┬───────────┬───────────┐
/// │   Start   │  Address  │   Type   │  Length  │  Payload  │ Checksum  │
/// │  2 bytes  │  4 bytes  │  1 byte  │ 2 bytes  │  N bytes  │  2 bytes  │
/// │  0xEF01   │  (BE u32) │          │ (N + 2)  │           │ (BE u16)  │
/// └───────────┴───────────┴──────────┴──────────┴───────────┴───────────┘
/// ```
///
/// All multi-byte values are big-endian.
///
/// # Examples
///
/// ```
/// use zfmrust_core::{Packet, PacketType};
///
/// let packet = Packet::new(0xFFFF_FFFF, PacketType::Command, vec![0x01]);
/// let encoded = packet.encode();
///
/// let decoded = Packet::decode(encoded).unwrap();
/// assert_eq!(packet, decoded);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Module address
    pub address: u32,

    /// Packet identifier
    pub packet_type: PacketType,

    /// Instruction, reply or data bytes
    pub payload: Bytes,
}

impl Packet {
    /// Start code + address + identifier + length
    pub const HEADER_SIZE: usize = 9;

    /// Trailing checksum size
    pub const CHECKSUM_SIZE: usize = 2;

    /// Largest payload the 16-bit length field can describe
    pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize - Self::CHECKSUM_SIZE;

    /// Create a packet
    pub fn new(address: u32, packet_type: PacketType, payload: impl Into<Bytes>) -> Self {
        Self {
            address,
            packet_type,
            payload: payload.into(),
        }
    }

    /// Create a command packet
    ///
    /// # Examples
    ///
    /// ```
    /// use zfmrust_core::{Packet, PacketType};
    ///
    /// let packet = Packet::command(0xFFFF_FFFF, vec![0x1D]);
    /// assert_eq!(packet.packet_type, PacketType::Command);
    /// ```
    pub fn command(address: u32, payload: impl Into<Bytes>) -> Self {
        Self::new(address, PacketType::Command, payload)
    }

    /// Length field value
    pub fn length(&self) -> u16 {
        (self.payload.len() + Self::CHECKSUM_SIZE) as u16
    }

    /// Calculate checksum for this packet
    pub fn checksum(&self) -> u16 {
        checksum::calculate(self.packet_type.into(), &self.payload)
    }

    /// Encode packet to bytes
    ///
    /// # Panics
    ///
    /// Panics if the payload exceeds [`Packet::MAX_PAYLOAD_SIZE`]. No command
    /// or transfer of this device family comes close; an oversized payload is
    /// a bug in the caller.
    ///
    /// # Examples
    ///
    /// ```
    /// use zfmrust_core::Packet;
    ///
    /// let bytes = Packet::command(0xFFFF_FFFF, vec![0x01]).encode();
    /// assert_eq!(&bytes[..], &[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x03, 0x01, 0x00, 0x05]);
    /// ```
    pub fn encode(&self) -> BytesMut {
        assert!(
            self.payload.len() <= Self::MAX_PAYLOAD_SIZE,
            "payload of {} bytes exceeds the 16-bit length field",
            self.payload.len()
        );

        let mut buf = BytesMut::with_capacity(self.size());

        buf.put_u16(START_CODE);
        buf.put_u32(self.address);
        buf.put_u8(self.packet_type.into());
        buf.put_u16(self.length());
        buf.put_slice(&self.payload);
        buf.put_u16(self.checksum());

        buf
    }

    /// Decode a complete frame
    ///
    /// The buffer must hold exactly one frame: header, payload and checksum.
    ///
    /// # Errors
    ///
    /// - Any header error from [`PacketHeader::parse`]
    /// - `PacketTooShort` if the buffer is shorter than the length field says
    /// - `ChecksumMismatch` if the transmitted checksum is wrong
    pub fn decode(buf: BytesMut) -> Result<Self> {
        let header = PacketHeader::parse(&buf)?;

        if buf.len() < header.frame_len() {
            return Err(Error::PacketTooShort {
                expected: header.frame_len(),
                actual: buf.len(),
            });
        }

        let mut buf = buf.freeze();
        buf.advance(Self::HEADER_SIZE);
        let payload = buf.split_to(header.payload_len());
        let checksum_received = buf.get_u16();

        Self::from_parts(header, payload, checksum_received)
    }

    /// Assemble a packet from an already parsed header, its payload and the
    /// transmitted checksum
    ///
    /// The checksum is verified over the identifier and length exactly as
    /// transmitted, before either is interpreted. A corrupted header byte
    /// is therefore reported as `ChecksumMismatch`.
    ///
    /// # Errors
    ///
    /// - `ChecksumMismatch` if the transmitted checksum is wrong
    /// - `UnknownPacketType` for an unknown identifier with a valid checksum
    /// - `InvalidLength` for a length field below 2 with a valid checksum
    pub fn from_parts(header: PacketHeader, payload: Bytes, checksum_received: u16) -> Result<Self> {
        let checksum_calculated =
            checksum::calculate_with_length(header.packet_type, header.length, &payload);
        if checksum_calculated != checksum_received {
            tracing::debug!(
                packet_type = header.packet_type,
                length = header.length,
                payload = %hex::encode(&payload[..payload.len().min(16)]),
                "Checksum mismatch: calculated 0x{:04X}, received 0x{:04X}",
                checksum_calculated,
                checksum_received
            );
            return Err(Error::ChecksumMismatch {
                expected: checksum_calculated,
                received: checksum_received,
            });
        }

        let packet_type = PacketType::try_from(header.packet_type)?;
        if (header.length as usize) < Self::CHECKSUM_SIZE {
            return Err(Error::InvalidLength(header.length));
        }

        Ok(Self {
            address: header.address,
            packet_type,
            payload,
        })
    }

    /// Check if this is an acknowledgment
    pub fn is_ack(&self) -> bool {
        self.packet_type == PacketType::Ack
    }

    /// Check if this is a bulk transfer chunk
    pub fn is_data(&self) -> bool {
        self.packet_type.is_data()
    }

    /// Get total frame size
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len() + Self::CHECKSUM_SIZE
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("address", &format!("0x{:08X}", self.address))
            .field("packet_type", &self.packet_type)
            .field("checksum", &format!("0x{:04X}", self.checksum()))
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet[{}](address=0x{:08X}, len={})",
            self.packet_type,
            self.address,
            self.payload.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const ADDR: u32 = 0xFFFF_FFFF;

    #[test]
    fn test_packet_encode_known_frame() {
        // VfyPwd with password 0
        let packet = Packet::command(ADDR, vec![0x13, 0x00, 0x00, 0x00, 0x00]);
        let encoded = packet.encode();

        assert_eq!(
            &encoded[..],
            &[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x07, 0x13, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1B]
        );
    }

    #[test]
    fn test_packet_encode_decode() {
        let original = Packet::new(0x1234_5678, PacketType::Ack, vec![0x00, 0x01, 0x02]);

        let encoded = original.encode();
        let decoded = Packet::decode(encoded).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn test_packet_empty_payload() {
        let packet = Packet::new(ADDR, PacketType::EndData, Bytes::new());
        let encoded = packet.encode();

        assert_eq!(encoded.len(), Packet::HEADER_SIZE + Packet::CHECKSUM_SIZE);

        let decoded = Packet::decode(encoded).unwrap();
        assert_eq!(decoded.payload.len(), 0);
    }

    #[test]
    fn test_packet_checksum_verification() {
        let packet = Packet::new(ADDR, PacketType::Ack, vec![0x00]);
        let mut encoded = packet.encode();

        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;

        let result = Packet::decode(encoded);

        if let Err(Error::ChecksumMismatch { expected, received }) = result {
            assert_ne!(expected, received);
        } else {
            panic!("Expected ChecksumMismatch error");
        }
    }

    #[test]
    fn test_packet_bad_start_code() {
        let mut encoded = Packet::new(ADDR, PacketType::Ack, vec![0x00]).encode();
        encoded[0] = 0xEE;

        let result = Packet::decode(encoded);
        assert!(matches!(
            result,
            Err(Error::InvalidStartCode { expected: 0xEF01, actual: 0xEE01 })
        ));
    }

    #[test]
    fn test_packet_too_short() {
        let buf = BytesMut::from(&[0xEF, 0x01, 0xFF][..]);
        let result = Packet::decode(buf);

        assert!(matches!(result, Err(Error::PacketTooShort { .. })));
    }

    #[test]
    fn test_packet_truncated_body() {
        let mut encoded = Packet::new(ADDR, PacketType::Ack, vec![0x00, 0x05]).encode();
        encoded.truncate(encoded.len() - 1);

        let result = Packet::decode(encoded);
        assert!(matches!(result, Err(Error::PacketTooShort { expected: 13, actual: 12 })));
    }

    #[test]
    fn test_packet_corrupted_type_is_checksum_error() {
        let mut encoded = Packet::new(ADDR, PacketType::Ack, vec![0x00]).encode();
        encoded[6] = 0x05;

        let result = Packet::decode(encoded);
        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
        assert!(result.unwrap_err().is_checksum_error());
    }

    #[test]
    fn test_packet_unknown_type_with_valid_checksum() {
        // EF01 FFFFFFFF 05 0003 00 0008
        let frame = [0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x05, 0x00, 0x03, 0x00, 0x00, 0x08];

        let result = Packet::decode(BytesMut::from(&frame[..]));
        assert!(matches!(result, Err(Error::UnknownPacketType(0x05))));
    }

    #[test]
    fn test_header_short_length_still_reads_checksum() {
        let header = PacketHeader::parse(&[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x07, 0x00, 0x01]).unwrap();

        assert_eq!(header.packet_type, 0x07);
        assert_eq!(header.payload_len(), 0);
        assert_eq!(header.remaining_len(), Packet::CHECKSUM_SIZE);
        assert_eq!(header.frame_len(), 11);
    }

    #[test]
    fn test_packet_empty_payload_length_flip_is_checksum_error() {
        let mut encoded = Packet::new(ADDR, PacketType::Ack, Bytes::new()).encode();
        encoded[8] ^= 0x02;

        assert!(matches!(Packet::decode(encoded), Err(Error::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_packet_impossible_length_with_valid_checksum() {
        // Length 0 with a checksum computed over it: 07 + 00 + 00
        let frame = [0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x07, 0x00, 0x00, 0x00, 0x07];

        let result = Packet::decode(BytesMut::from(&frame[..]));
        assert!(matches!(result, Err(Error::InvalidLength(0))));
    }

    #[test]
    fn test_header_lengths() {
        let encoded = Packet::new(ADDR, PacketType::Data, vec![0xAB; 128]).encode();
        let header = PacketHeader::parse(&encoded[..Packet::HEADER_SIZE]).unwrap();

        assert_eq!(header.length, 130);
        assert_eq!(header.payload_len(), 128);
        assert_eq!(header.remaining_len(), 130);
        assert_eq!(header.frame_len(), encoded.len());
    }

    #[test]
    #[should_panic(expected = "exceeds the 16-bit length field")]
    fn test_packet_oversized_payload_panics() {
        let packet = Packet::new(ADDR, PacketType::Data, vec![0u8; Packet::MAX_PAYLOAD_SIZE + 1]);
        let _ = packet.encode();
    }

    #[test]
    fn test_packet_type_conversion() {
        assert_eq!(u8::from(PacketType::EndData), 0x08);
        assert_eq!(PacketType::try_from(0x07).unwrap(), PacketType::Ack);
        assert!(PacketType::Data.is_data());
        assert!(PacketType::EndData.is_data());
        assert!(!PacketType::Ack.is_data());
    }

    fn packet_type() -> impl Strategy<Value = PacketType> {
        prop_oneof![
            Just(PacketType::Command),
            Just(PacketType::Data),
            Just(PacketType::Ack),
            Just(PacketType::EndData),
        ]
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            address in any::<u32>(),
            packet_type in packet_type(),
            payload in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let packet = Packet::new(address, packet_type, payload);
            let decoded = Packet::decode(packet.encode()).unwrap();
            prop_assert_eq!(decoded, packet);
        }

        #[test]
        fn prop_single_bit_flip_in_payload_is_detected(
            payload in proptest::collection::vec(any::<u8>(), 1..256),
            index in any::<proptest::sample::Index>(),
            bit in 0u8..8,
        ) {
            let mut encoded = Packet::new(ADDR, PacketType::Data, payload).encode();
            let offset = Packet::HEADER_SIZE + index.index(encoded.len() - Packet::HEADER_SIZE - Packet::CHECKSUM_SIZE);
            encoded[offset] ^= 1 << bit;

            let checksum_mismatch = matches!(Packet::decode(encoded), Err(Error::ChecksumMismatch { .. }));
            prop_assert!(checksum_mismatch);
        }

        #[test]
        fn prop_single_bit_flip_in_length_is_detected(
            payload_len in 0usize..200,
            byte in 7usize..9,
            bit in 0u8..8,
        ) {
            // Flip a bit of either length byte and zero-pad or cut the frame
            // to the altered length, so decoding reaches the checksum
            let mut encoded = Packet::new(ADDR, PacketType::Data, vec![0u8; payload_len]).encode();
            encoded[byte] ^= 1 << bit;
            let frame_len = PacketHeader::parse(&encoded[..Packet::HEADER_SIZE]).unwrap().frame_len();
            encoded.resize(frame_len, 0);

            let checksum_mismatch = matches!(Packet::decode(encoded), Err(Error::ChecksumMismatch { .. }));
            prop_assert!(checksum_mismatch);
        }

        #[test]
        fn prop_single_bit_flip_in_type_is_detected(
            packet_type in packet_type(),
            payload in proptest::collection::vec(any::<u8>(), 0..64),
            bit in 0u8..8,
        ) {
            let mut encoded = Packet::new(ADDR, packet_type, payload).encode();
            encoded[6] ^= 1 << bit;

            let checksum_mismatch = matches!(Packet::decode(encoded), Err(Error::ChecksumMismatch { .. }));
            prop_assert!(checksum_mismatch);
        }
    }
}
