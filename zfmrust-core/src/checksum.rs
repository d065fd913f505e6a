//! Frame checksum
//!
//! The checksum covers the packet identifier, both length bytes and every
//! payload byte. The start code and the address are not included.
//! The sum is truncated to its low 16 bits.

use tracing::trace;

/// Calculate a frame checksum
///
/// # Algorithm
///
/// ```text
/// sum = packet_type + (length >> 8) + (length & 0xFF) + payload[0] + ... + payload[n-1]
/// checksum = sum mod 0x10000
/// ```
///
/// where `length = payload.len() + 2`.
///
/// # Examples
///
/// ```
/// use zfmrust_core::checksum;
///
/// // VfyPwd command: identifier 0x01, length 0x0007, payload 13 00 00 00 00
/// let checksum = checksum::calculate(0x01, &[0x13, 0, 0, 0, 0]);
/// assert_eq!(checksum, 0x001B);
/// ```
pub fn calculate(packet_type: u8, payload: &[u8]) -> u16 {
    calculate_with_length(packet_type, (payload.len() + 2) as u16, payload)
}

/// Calculate a checksum over a length field as transmitted
///
/// A receiver checks frames with this so that a corrupted length byte is
/// covered by the sum even when it no longer agrees with the payload size.
pub fn calculate_with_length(packet_type: u8, length: u16, payload: &[u8]) -> u16 {
    let [len_hi, len_lo] = length.to_be_bytes();

    let sum = payload
        .iter()
        .fold(
            packet_type as u32 + len_hi as u32 + len_lo as u32,
            |acc, &byte| acc.wrapping_add(byte as u32),
        );

    let checksum = (sum & 0xFFFF) as u16;

    trace!(
        packet_type = packet_type,
        length = length,
        payload_len = payload.len(),
        checksum = format!("0x{:04X}", checksum),
        "Calculated checksum"
    );

    checksum
}
