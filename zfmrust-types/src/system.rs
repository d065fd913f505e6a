//! System parameter block

use std::fmt;

use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder};
use zfmrust_core::constants::BAUD_RATE_UNIT;

use crate::error::{Error, Result};

bitflags! {
    /// Module status register
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct StatusRegister: u16 {
        /// Module is executing a command
        const BUSY = 1 << 0;
        /// Finger matched
        const PASS = 1 << 1;
        /// Handshake password verified
        const PASSWORD_VERIFIED = 1 << 2;
        /// Image buffer holds a valid image
        const IMAGE_BUFFER_VALID = 1 << 3;
    }
}

/// Data package size class
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PackageSize {
    Bytes32 = 0,
    Bytes64 = 1,
    #[default]
    Bytes128 = 2,
    Bytes256 = 3,
}

impl PackageSize {
    /// Decode the class code stored in the module
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Bytes32),
            1 => Some(Self::Bytes64),
            2 => Some(Self::Bytes128),
            3 => Some(Self::Bytes256),
            _ => None,
        }
    }

    /// Class code used by `SetSysPara`
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Payload bytes per data packet
    pub fn bytes(self) -> usize {
        32 << (self as usize)
    }
}

impl fmt::Display for PackageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.bytes())
    }
}

/// The 16-byte parameter block returned by `ReadSysPara` and at the head of
/// the hardware info page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemParameters {
    pub status: StatusRegister,
    pub system_id: u16,
    pub library_size: u16,
    pub security_level: u16,
    pub address: u32,
    pub package_size: PackageSize,
    pub baud_multiplier: u16,
}

impl SystemParameters {
    /// Encoded size of the block
    pub const SIZE: usize = 16;

    /// Parse the block from the start of `data`
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::Parse(format!(
                "system parameters need {} bytes, got {}",
                Self::SIZE,
                data.len()
            )));
        }

        let package_code = BigEndian::read_u16(&data[12..14]);
        let package_size = PackageSize::from_code(package_code)
            .ok_or_else(|| Error::Parse(format!("invalid package size class {}", package_code)))?;

        Ok(Self {
            status: StatusRegister::from_bits_retain(BigEndian::read_u16(&data[0..2])),
            system_id: BigEndian::read_u16(&data[2..4]),
            library_size: BigEndian::read_u16(&data[4..6]),
            security_level: BigEndian::read_u16(&data[6..8]),
            address: BigEndian::read_u32(&data[8..12]),
            package_size,
            baud_multiplier: BigEndian::read_u16(&data[14..16]),
        })
    }

    /// Serial speed in baud
    pub fn baud_rate(&self) -> u32 {
        u32::from(self.baud_multiplier) * BAUD_RATE_UNIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BLOCK: [u8; 16] = [
        0x00, 0x04, // status: password verified
        0x00, 0x09, // system id
        0x00, 0xA2, // library size 162
        0x00, 0x03, // security level
        0xFF, 0xFF, 0xFF, 0xFF, // address
        0x00, 0x02, // 128-byte packages
        0x00, 0x06, // 57600 baud
    ];

    #[test]
    fn test_parse_block() {
        let params = SystemParameters::parse(&BLOCK).unwrap();

        assert_eq!(params.status, StatusRegister::PASSWORD_VERIFIED);
        assert_eq!(params.system_id, 9);
        assert_eq!(params.library_size, 162);
        assert_eq!(params.security_level, 3);
        assert_eq!(params.address, 0xFFFF_FFFF);
        assert_eq!(params.package_size, PackageSize::Bytes128);
        assert_eq!(params.baud_rate(), 57_600);
    }

    #[test]
    fn test_parse_short_block() {
        assert!(matches!(SystemParameters::parse(&BLOCK[..15]), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_invalid_package_class() {
        let mut block = BLOCK;
        block[13] = 0x07;
        assert!(matches!(SystemParameters::parse(&block), Err(Error::Parse(_))));
    }

    #[test]
    fn test_status_register_keeps_unknown_bits() {
        let mut block = BLOCK;
        block[0] = 0x80;
        block[1] = 0x09;
        let params = SystemParameters::parse(&block).unwrap();

        assert!(params.status.contains(StatusRegister::BUSY));
        assert!(params.status.contains(StatusRegister::IMAGE_BUFFER_VALID));
        assert_eq!(params.status.bits(), 0x8009);
    }

    #[test]
    fn test_package_sizes() {
        let sizes: Vec<usize> = (0..4)
            .map(|code| PackageSize::from_code(code).unwrap().bytes())
            .collect();
        assert_eq!(sizes, vec![32, 64, 128, 256]);
        assert_eq!(PackageSize::from_code(4), None);
        assert_eq!(PackageSize::Bytes256.code(), 3);
        assert_eq!(PackageSize::default().bytes(), 128);
    }
}
