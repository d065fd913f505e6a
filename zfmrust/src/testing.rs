//! Scripted module replies for unit tests

use bytes::BytesMut;
use zfmrust_core::{Packet, PacketType};
use zfmrust_transport::MockTransport;

use crate::Device;

pub const ADDR: u32 = 0xFFFF_FFFF;

/// Parameter block at the head of the sample info page
pub const INFO_BLOCK: [u8; 16] = [
    0x00, 0x00, // status register
    0x00, 0x09, // system id
    0x03, 0xE8, // library size 1000
    0x00, 0x05, // security level
    0xFF, 0xFF, 0xFF, 0xFF, // address
    0x00, 0x02, // 128-byte packages
    0x00, 0x06, // 57600 baud
];

/// Acknowledgment frame carrying `status` and `data`
pub fn ack(status: u8, data: &[u8]) -> BytesMut {
    let mut payload = vec![status];
    payload.extend_from_slice(data);
    Packet::new(ADDR, PacketType::Ack, payload).encode()
}

/// The four data frames that follow a read-info-page acknowledgment
pub fn info_page_packets() -> Vec<BytesMut> {
    let mut first = vec![0u8; 128];
    first[..16].copy_from_slice(&INFO_BLOCK);
    first[28..36].copy_from_slice(b"ZFM-20\0\0");
    first[36..44].copy_from_slice(b"V1.4\0\0\0\0");
    first[44..52].copy_from_slice(b"ZhiAnTec");
    first[52..60].copy_from_slice(b"OPT2000 ");

    let mut packets = vec![Packet::new(ADDR, PacketType::Data, first).encode()];
    packets.push(Packet::new(ADDR, PacketType::Data, vec![0u8; 128]).encode());
    packets.push(Packet::new(ADDR, PacketType::Data, vec![0u8; 128]).encode());
    packets.push(Packet::new(ADDR, PacketType::EndData, vec![0u8; 128]).encode());
    packets
}

pub fn queue_info_page(mock: &MockTransport) {
    mock.queue(ack(0x00, &[]));
    for packet in info_page_packets() {
        mock.queue(packet);
    }
}

/// A connected device plus a handle on its transport, with the connect
/// traffic cleared
pub async fn connected_device() -> (Device<MockTransport>, MockTransport) {
    let mock = MockTransport::new();
    queue_info_page(&mock);

    let mut device = Device::new(mock.clone());
    device
        .connect()
        .await
        .expect("scripted connect succeeds");
    mock.clear_written();

    (device, mock)
}
