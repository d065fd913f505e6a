//! Bulk transfer reassembly and chunking
//!
//! Images and templates do not fit in a single frame. The module splits them
//! into data packets of the negotiated package size; the expected packet
//! count is known in advance, so the receiver counts packets instead of
//! waiting for the end-of-data marker.

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::{
    error::{Error, Result},
    packet::{Packet, PacketType},
};

/// Collects the payloads of a data packet sequence into one buffer
///
/// # Examples
///
/// ```
/// use zfmrust_core::{Packet, PacketType, Reassembler};
///
/// let mut reassembler = Reassembler::new(512, 128);
/// assert_eq!(reassembler.expected_packets(), 4);
///
/// for i in 0..4 {
///     let packet_type = if i == 3 { PacketType::EndData } else { PacketType::Data };
///     reassembler.push(Packet::new(0xFFFF_FFFF, packet_type, vec![i as u8; 128])).unwrap();
/// }
///
/// let buffer = reassembler.finish().unwrap();
/// assert_eq!(buffer.len(), 512);
/// ```
#[derive(Debug)]
pub struct Reassembler {
    expected_total: usize,
    expected_packets: usize,
    received: usize,
    buf: BytesMut,
}

impl Reassembler {
    /// Prepare to collect `expected_total` bytes sent in chunks of `package_size`
    ///
    /// # Panics
    ///
    /// Panics if `package_size` is zero.
    pub fn new(expected_total: usize, package_size: usize) -> Self {
        assert!(package_size > 0, "package size must be non-zero");

        Self {
            expected_total,
            expected_packets: expected_total.div_ceil(package_size),
            received: 0,
            buf: BytesMut::with_capacity(expected_total),
        }
    }

    /// Number of packets the transfer consists of
    pub fn expected_packets(&self) -> usize {
        self.expected_packets
    }

    /// Number of packets accepted so far
    pub fn received_packets(&self) -> usize {
        self.received
    }

    /// All expected packets have arrived
    pub fn is_complete(&self) -> bool {
        self.received >= self.expected_packets
    }

    /// Append the payload of the next packet
    ///
    /// # Errors
    ///
    /// - `UnexpectedPacketType` if the packet is not a data or end-of-data packet
    /// - `TransferLength` if the transfer is already complete
    pub fn push(&mut self, packet: Packet) -> Result<()> {
        if !packet.is_data() {
            return Err(Error::UnexpectedPacketType {
                expected: "DATA or END_DATA",
                actual: packet.packet_type,
            });
        }

        if self.is_complete() {
            return Err(Error::TransferLength {
                expected: self.expected_total,
                actual: self.buf.len() + packet.payload.len(),
            });
        }

        self.buf.extend_from_slice(&packet.payload);
        self.received += 1;

        trace!(
            packet = self.received,
            of = self.expected_packets,
            len = packet.payload.len(),
            "Collected data packet"
        );

        Ok(())
    }

    /// Return the reassembled buffer
    ///
    /// # Errors
    ///
    /// - `MissingPackets` if fewer packets than expected were pushed
    /// - `TransferLength` if the payloads do not add up to the expected size
    pub fn finish(self) -> Result<Bytes> {
        if !self.is_complete() {
            return Err(Error::MissingPackets {
                expected: self.expected_packets,
                received: self.received,
            });
        }

        if self.buf.len() != self.expected_total {
            return Err(Error::TransferLength {
                expected: self.expected_total,
                actual: self.buf.len(),
            });
        }

        Ok(self.buf.freeze())
    }
}

/// Split a buffer into data packets for a host-to-module transfer
///
/// Every packet carries `package_size` bytes except possibly the last, which
/// is typed end-of-data.
///
/// # Panics
///
/// Panics if `package_size` is zero.
pub fn split(address: u32, data: &Bytes, package_size: usize) -> Vec<Packet> {
    assert!(package_size > 0, "package size must be non-zero");

    let count = data.len().div_ceil(package_size);

    (0..count)
        .map(|i| {
            let start = i * package_size;
            let end = (start + package_size).min(data.len());
            let packet_type = if i + 1 == count {
                PacketType::EndData
            } else {
                PacketType::Data
            };
            Packet::new(address, packet_type, data.slice(start..end))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ADDR: u32 = 0xFFFF_FFFF;

    fn data(fill: u8, len: usize) -> Packet {
        Packet::new(ADDR, PacketType::Data, vec![fill; len])
    }

    #[test]
    fn test_image_transfer_packet_count() {
        let mut reassembler = Reassembler::new(288 * 128, 128);
        assert_eq!(reassembler.expected_packets(), 288);

        for i in 0..288 {
            assert!(!reassembler.is_complete());
            reassembler.push(data(i as u8, 128)).unwrap();
        }

        assert!(reassembler.is_complete());
        assert_eq!(reassembler.received_packets(), 288);

        let buffer = reassembler.finish().unwrap();
        assert_eq!(buffer.len(), 36_864);

        // Arrival order preserved
        for (i, chunk) in buffer.chunks(128).enumerate() {
            assert!(chunk.iter().all(|&b| b == i as u8));
        }
    }

    #[test]
    fn test_short_last_chunk() {
        let mut reassembler = Reassembler::new(300, 128);
        assert_eq!(reassembler.expected_packets(), 3);

        reassembler.push(data(1, 128)).unwrap();
        reassembler.push(data(2, 128)).unwrap();
        reassembler
            .push(Packet::new(ADDR, PacketType::EndData, vec![3; 44]))
            .unwrap();

        assert_eq!(reassembler.finish().unwrap().len(), 300);
    }

    #[test]
    fn test_rejects_non_data_packet() {
        let mut reassembler = Reassembler::new(512, 128);
        let result = reassembler.push(Packet::new(ADDR, PacketType::Ack, vec![0x00]));

        assert!(matches!(
            result,
            Err(Error::UnexpectedPacketType { actual: PacketType::Ack, .. })
        ));
    }

    #[test]
    fn test_missing_packets() {
        let mut reassembler = Reassembler::new(512, 128);
        reassembler.push(data(0, 128)).unwrap();

        assert!(matches!(
            reassembler.finish(),
            Err(Error::MissingPackets { expected: 4, received: 1 })
        ));
    }

    #[test]
    fn test_extra_packet_rejected() {
        let mut reassembler = Reassembler::new(128, 128);
        reassembler.push(data(0, 128)).unwrap();

        assert!(reassembler.push(data(0, 128)).is_err());
    }

    #[test]
    fn test_wrong_total_length() {
        let mut reassembler = Reassembler::new(256, 128);
        reassembler.push(data(0, 128)).unwrap();
        reassembler.push(data(0, 100)).unwrap();

        assert!(matches!(
            reassembler.finish(),
            Err(Error::TransferLength { expected: 256, actual: 228 })
        ));
    }

    #[test]
    fn test_split_marks_last_packet() {
        let buffer = Bytes::from(vec![7u8; 512]);
        let packets = split(ADDR, &buffer, 128);

        assert_eq!(packets.len(), 4);
        assert!(packets[..3].iter().all(|p| p.packet_type == PacketType::Data));
        assert_eq!(packets[3].packet_type, PacketType::EndData);
        assert!(packets.iter().all(|p| p.payload.len() == 128));
    }

    #[test]
    fn test_split_then_reassemble() {
        let buffer = Bytes::from((0..=255u8).cycle().take(1000).collect::<Vec<_>>());
        let packets = split(ADDR, &buffer, 64);

        let mut reassembler = Reassembler::new(buffer.len(), 64);
        for packet in packets {
            reassembler.push(packet).unwrap();
        }

        assert_eq!(reassembler.finish().unwrap(), buffer);
    }
}
