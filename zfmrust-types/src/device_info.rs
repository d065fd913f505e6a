//! Device capabilities read from the hardware info page

use std::fmt;

use crate::{
    error::{Error, Result},
    system::{PackageSize, SystemParameters},
};

/// Width of each identification string
const IDENT_LEN: usize = 8;

const PRODUCT_OFFSET: usize = 28;
const VERSION_OFFSET: usize = PRODUCT_OFFSET + IDENT_LEN;
const MANUFACTURER_OFFSET: usize = VERSION_OFFSET + IDENT_LEN;
const SENSOR_OFFSET: usize = MANUFACTURER_OFFSET + IDENT_LEN;

/// Static device description, fetched once when the session starts
///
/// The identification strings sit at fixed offsets of the first info page
/// packet. Those offsets hold for the ZFM-20 family firmware seen so far and
/// are treated as best effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Parameter block at the head of the info page
    pub parameters: SystemParameters,

    /// Product type
    pub product_type: String,

    /// Firmware version
    pub version: String,

    /// Manufacturer
    pub manufacturer: String,

    /// Sensor model
    pub sensor: String,
}

impl DeviceCapabilities {
    /// Minimum payload length of the first info page packet
    pub const MIN_SIZE: usize = SENSOR_OFFSET + IDENT_LEN;

    /// Parse the payload of the first info page data packet
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < Self::MIN_SIZE {
            return Err(Error::Parse(format!(
                "hardware info needs {} bytes, got {}",
                Self::MIN_SIZE,
                payload.len()
            )));
        }

        Ok(Self {
            parameters: SystemParameters::parse(payload)?,
            product_type: ident(payload, PRODUCT_OFFSET),
            version: ident(payload, VERSION_OFFSET),
            manufacturer: ident(payload, MANUFACTURER_OFFSET),
            sensor: ident(payload, SENSOR_OFFSET),
        })
    }

    /// Finger library capacity
    pub fn library_size(&self) -> u16 {
        self.parameters.library_size
    }

    pub fn security_level(&self) -> u16 {
        self.parameters.security_level
    }

    pub fn address(&self) -> u32 {
        self.parameters.address
    }

    pub fn package_size(&self) -> PackageSize {
        self.parameters.package_size
    }

    pub fn baud_multiplier(&self) -> u16 {
        self.parameters.baud_multiplier
    }

    pub fn baud_rate(&self) -> u32 {
        self.parameters.baud_rate()
    }
}

fn ident(payload: &[u8], offset: usize) -> String {
    String::from_utf8_lossy(&payload[offset..offset + IDENT_LEN])
        .trim_end_matches(['\0', ' '])
        .to_string()
}

impl fmt::Display for DeviceCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}, sensor {}), library {}",
            self.manufacturer,
            self.product_type,
            self.version,
            self.sensor,
            self.library_size()
        )
    }
}
