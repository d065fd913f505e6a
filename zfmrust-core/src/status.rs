//! Confirmation codes
//!
//! The first payload byte of every acknowledgment. `Ok` means the instruction
//! executed; every other value is an instruction-specific device condition
//! that is handed back to the caller as data.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Module confirmation code
///
/// Unknown codes are kept verbatim in [`Status::Other`], so converting back
/// to `u8` always yields the byte the module sent. Equality and hashing go
/// through the literal code: `Status::Other(0x02) == Status::NoFinger`.
#[derive(Debug, Copy, Clone)]
pub enum Status {
    Ok,
    PacketReceiveError,
    NoFinger,
    ImageFail,
    ImageMessy,
    FeatureFail,
    NoMatch,
    NotFound,
    EnrollMismatch,
    BadLocation,
    DatabaseReadFail,
    UploadFeatureFail,
    PacketResponseFail,
    UploadFail,
    DeleteFail,
    DatabaseClearFail,
    PasswordFail,
    InvalidImage,
    FlashError,
    NoDefinition,
    InvalidRegister,
    IncorrectConfiguration,
    WrongNotepadPage,
    PortOperationFail,
    AddressCode,
    PasswordVerify,
    SensorAbnormal,
    Other(u8),
}

impl Status {
    /// Check if the instruction executed
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Literal confirmation code
    pub fn code(self) -> u8 {
        self.into()
    }

    /// Human readable description
    pub fn description(self) -> &'static str {
        match Self::from(self.code()) {
            Self::Ok => "command execution complete",
            Self::PacketReceiveError => "error when receiving data package",
            Self::NoFinger => "no finger on the sensor",
            Self::ImageFail => "failed to enroll the finger",
            Self::ImageMessy => "image too disorderly to generate character file",
            Self::FeatureFail => "too few feature points to generate character file",
            Self::NoMatch => "finger does not match",
            Self::NotFound => "no matching finger in the library",
            Self::EnrollMismatch => "failed to combine the character files",
            Self::BadLocation => "page id beyond the finger library",
            Self::DatabaseReadFail => "error reading template from the library",
            Self::UploadFeatureFail => "error uploading template",
            Self::PacketResponseFail => "module cannot receive the following data packages",
            Self::UploadFail => "error uploading image",
            Self::DeleteFail => "failed to delete the template",
            Self::DatabaseClearFail => "failed to clear the finger library",
            Self::PasswordFail => "wrong password",
            Self::InvalidImage => "no valid primary image in the buffer",
            Self::FlashError => "error writing flash",
            Self::NoDefinition => "no definition error",
            Self::InvalidRegister => "invalid register number",
            Self::IncorrectConfiguration => "incorrect register configuration",
            Self::WrongNotepadPage => "wrong notepad page number",
            Self::PortOperationFail => "failed to operate the communication port",
            Self::AddressCode => "address code",
            Self::PasswordVerify => "password must be verified",
            Self::SensorAbnormal => "sensor abnormal",
            Self::Other(_) => "unknown confirmation code",
        }
    }
}

impl From<u8> for Status {
    fn from(code: u8) -> Self {
        match code {
            0x00 => Self::Ok,
            0x01 => Self::PacketReceiveError,
            0x02 => Self::NoFinger,
            0x03 => Self::ImageFail,
            0x06 => Self::ImageMessy,
            0x07 => Self::FeatureFail,
            0x08 => Self::NoMatch,
            0x09 => Self::NotFound,
            0x0A => Self::EnrollMismatch,
            0x0B => Self::BadLocation,
            0x0C => Self::DatabaseReadFail,
            0x0D => Self::UploadFeatureFail,
            0x0E => Self::PacketResponseFail,
            0x0F => Self::UploadFail,
            0x10 => Self::DeleteFail,
            0x11 => Self::DatabaseClearFail,
            0x13 => Self::PasswordFail,
            0x15 => Self::InvalidImage,
            0x18 => Self::FlashError,
            0x19 => Self::NoDefinition,
            0x1A => Self::InvalidRegister,
            0x1B => Self::IncorrectConfiguration,
            0x1C => Self::WrongNotepadPage,
            0x1D => Self::PortOperationFail,
            0x20 => Self::AddressCode,
            0x21 => Self::PasswordVerify,
            0x29 => Self::SensorAbnormal,
            other => Self::Other(other),
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> u8 {
        match status {
            Status::Ok => 0x00,
            Status::PacketReceiveError => 0x01,
            Status::NoFinger => 0x02,
            Status::ImageFail => 0x03,
            Status::ImageMessy => 0x06,
            Status::FeatureFail => 0x07,
            Status::NoMatch => 0x08,
            Status::NotFound => 0x09,
            Status::EnrollMismatch => 0x0A,
            Status::BadLocation => 0x0B,
            Status::DatabaseReadFail => 0x0C,
            Status::UploadFeatureFail => 0x0D,
            Status::PacketResponseFail => 0x0E,
            Status::UploadFail => 0x0F,
            Status::DeleteFail => 0x10,
            Status::DatabaseClearFail => 0x11,
            Status::PasswordFail => 0x13,
            Status::InvalidImage => 0x15,
            Status::FlashError => 0x18,
            Status::NoDefinition => 0x19,
            Status::InvalidRegister => 0x1A,
            Status::IncorrectConfiguration => 0x1B,
            Status::WrongNotepadPage => 0x1C,
            Status::PortOperationFail => 0x1D,
            Status::AddressCode => 0x20,
            Status::PasswordVerify => 0x21,
            Status::SensorAbnormal => 0x29,
            Status::Other(code) => code,
        }
    }
}

impl PartialEq for Status {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for Status {}

impl Hash for Status {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code().hash(state);
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X} ({})", self.code(), self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_survives_conversion() {
        for code in 0..=u8::MAX {
            assert_eq!(Status::from(code).code(), code);
        }
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(Status::from(0x00), Status::Ok);
        assert_eq!(Status::from(0x02), Status::NoFinger);
        assert_eq!(Status::from(0x09), Status::NotFound);
        assert_eq!(Status::from(0x13), Status::PasswordFail);
        assert_eq!(Status::from(0x42), Status::Other(0x42));
    }

    #[test]
    fn test_is_ok() {
        assert!(Status::Ok.is_ok());
        assert!(Status::Other(0x00).is_ok());
        assert!(!Status::NoFinger.is_ok());
    }

    #[test]
    fn test_equality_follows_code() {
        use std::collections::HashSet;

        assert_eq!(Status::Other(0x02), Status::NoFinger);
        assert_ne!(Status::Other(0x42), Status::Other(0x43));
        assert_eq!(Status::Other(0x02).description(), Status::NoFinger.description());

        let set: HashSet<Status> = [Status::NoFinger, Status::Other(0x02)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
