//! Protocol constants

/// Start marker at the head of every frame (high byte first)
pub const START_CODE: u16 = 0xEF01;

/// Factory default module address
pub const DEFAULT_ADDRESS: u32 = 0xFFFF_FFFF;

/// Factory default handshake password
pub const DEFAULT_PASSWORD: u32 = 0x0000_0000;

/// Factory default baud rate
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Baud rate unit; the module stores its baud rate as a multiple of this
pub const BAUD_RATE_UNIT: u32 = 9_600;

/// Size of the image buffer uploaded by `UpImage` (256 x 288 pixels, 4 bits each)
pub const IMAGE_BUFFER_SIZE: usize = 36_864;

/// Size of a character file / template buffer
pub const CHAR_BUFFER_SIZE: usize = 512;

/// Number of data packets that follow the read-info-page acknowledgment
pub const INFO_PAGE_PACKETS: usize = 4;

/// Number of notepad pages
pub const NOTEPAD_PAGES: u8 = 16;

/// Size of one notepad page
pub const NOTEPAD_PAGE_SIZE: usize = 32;

/// Search range used when the caller does not supply one
pub const DEFAULT_SEARCH_PAGES: u16 = 0x03E9;

/// System parameter numbers for `SetSysPara`
pub mod parameters {
    /// Baud rate control, value N gives 9600 * N
    pub const BAUD_RATE: u8 = 4;

    /// Security level, 1 (lowest) to 5 (highest)
    pub const SECURITY_LEVEL: u8 = 5;

    /// Data package size class, 0 to 3
    pub const PACKAGE_SIZE: u8 = 6;
}
