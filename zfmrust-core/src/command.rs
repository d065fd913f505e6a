//! Instruction table
//!
//! Every operation the module understands, the bytes it puts on the wire and
//! the reply it produces. Pure data: nothing here talks to a device.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::{CHAR_BUFFER_SIZE, IMAGE_BUFFER_SIZE, INFO_PAGE_PACKETS, NOTEPAD_PAGE_SIZE};

/// Instruction codes (first byte of every command payload)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Instruction {
    // Fingerprint processing
    GetImage = 0x01,
    ImageToChar = 0x02,
    Match = 0x03,
    Search = 0x04,
    RegModel = 0x05,

    // Template library
    Store = 0x06,
    LoadChar = 0x07,
    UpChar = 0x08,
    DownChar = 0x09,
    UpImage = 0x0A,
    DownImage = 0x0B,
    DeleteChar = 0x0C,
    Empty = 0x0D,

    // System
    SetSysPara = 0x0E,
    ReadSysPara = 0x0F,
    SetPassword = 0x12,
    VerifyPassword = 0x13,
    GetRandomCode = 0x14,
    SetAddress = 0x15,
    ReadInfoPage = 0x16,

    // Notepad
    WriteNotepad = 0x18,
    ReadNotepad = 0x19,

    HighSpeedSearch = 0x1B,
    TemplateCount = 0x1D,
}

impl Instruction {
    /// Get instruction name
    pub fn name(self) -> &'static str {
        match self {
            Self::GetImage => "GenImg",
            Self::ImageToChar => "Img2Tz",
            Self::Match => "Match",
            Self::Search => "Search",
            Self::RegModel => "RegModel",
            Self::Store => "Store",
            Self::LoadChar => "LoadChar",
            Self::UpChar => "UpChar",
            Self::DownChar => "DownChar",
            Self::UpImage => "UpImage",
            Self::DownImage => "DownImage",
            Self::DeleteChar => "DeleteChar",
            Self::Empty => "Empty",
            Self::SetSysPara => "SetSysPara",
            Self::ReadSysPara => "ReadSysPara",
            Self::SetPassword => "SetPwd",
            Self::VerifyPassword => "VfyPwd",
            Self::GetRandomCode => "GetRandomCode",
            Self::SetAddress => "SetAddr",
            Self::ReadInfoPage => "ReadInfPage",
            Self::WriteNotepad => "WriteNotepad",
            Self::ReadNotepad => "ReadNotepad",
            Self::HighSpeedSearch => "HighSpeedSearch",
            Self::TemplateCount => "TemplateNum",
        }
    }
}

impl From<Instruction> for u8 {
    fn from(instruction: Instruction) -> u8 {
        instruction as u8
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

/// Character buffer inside the module
///
/// Two scratch slots that hold a character file or template between
/// instructions. The module owns their content; the host only chooses which
/// one an instruction targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CharBuffer {
    One = 1,
    Two = 2,
}

impl From<CharBuffer> for u8 {
    fn from(buffer: CharBuffer) -> u8 {
        buffer as u8
    }
}

impl fmt::Display for CharBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CharBuffer{}", *self as u8)
    }
}

/// Template location: a character buffer and a flash page
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TemplateRef {
    pub buffer: CharBuffer,
    pub page: u16,
}

impl TemplateRef {
    pub fn new(buffer: CharBuffer, page: u16) -> Self {
        Self { buffer, page }
    }
}

/// Kind of bulk buffer moved by a multi-packet transfer
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BulkKind {
    /// Finger image buffer
    Image,

    /// Character file / template buffer
    Char,
}

impl BulkKind {
    /// Total transfer size in bytes
    pub fn size(self) -> usize {
        match self {
            Self::Image => IMAGE_BUFFER_SIZE,
            Self::Char => CHAR_BUFFER_SIZE,
        }
    }
}

/// Data packets that accompany a command
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transfer {
    /// Single acknowledgment
    None,

    /// Module sends a bulk buffer after a successful acknowledgment
    Upload(BulkKind),

    /// Host sends a bulk buffer after a successful acknowledgment
    Download(BulkKind),

    /// Module sends a fixed number of info page packets
    InfoPage,
}

impl Transfer {
    /// Data packets following a successful acknowledgment at the given
    /// package size
    pub fn packets(self, package_size: usize) -> usize {
        match self {
            Self::None => 0,
            Self::Upload(kind) | Self::Download(kind) => kind.size().div_ceil(package_size),
            Self::InfoPage => INFO_PAGE_PACKETS,
        }
    }
}

/// A command together with its parameters
///
/// # Examples
///
/// ```
/// use zfmrust_core::{Command, CharBuffer};
///
/// let command = Command::Search { buffer: CharBuffer::One, start_page: 0, page_count: 0x03E9 };
/// assert_eq!(&command.encode_payload()[..], &[0x04, 0x01, 0x00, 0x00, 0x03, 0xE9]);
/// assert_eq!(command.reply_len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    VerifyPassword { password: u32 },
    SetPassword { password: u32 },
    SetAddress { address: u32 },
    SetSystemParameter { parameter: u8, value: u8 },
    ReadSystemParameters,
    ReadInfoPage,
    TemplateCount,
    GetImage,
    UploadImage,
    DownloadImage,
    ImageToChar { buffer: CharBuffer },
    CreateModel,
    UploadChar { buffer: CharBuffer },
    DownloadChar { buffer: CharBuffer },
    Store { buffer: CharBuffer, page: u16 },
    LoadChar { buffer: CharBuffer, page: u16 },
    DeleteChar { page: u16, count: u16 },
    Empty,
    Match,
    Search { buffer: CharBuffer, start_page: u16, page_count: u16 },
    HighSpeedSearch { buffer: CharBuffer, start_page: u16, page_count: u16 },
    GetRandomCode,
    WriteNotepad { page: u8, data: [u8; NOTEPAD_PAGE_SIZE] },
    ReadNotepad { page: u8 },
}

impl Command {
    /// Instruction code
    pub fn instruction(&self) -> Instruction {
        match self {
            Self::VerifyPassword { .. } => Instruction::VerifyPassword,
            Self::SetPassword { .. } => Instruction::SetPassword,
            Self::SetAddress { .. } => Instruction::SetAddress,
            Self::SetSystemParameter { .. } => Instruction::SetSysPara,
            Self::ReadSystemParameters => Instruction::ReadSysPara,
            Self::ReadInfoPage => Instruction::ReadInfoPage,
            Self::TemplateCount => Instruction::TemplateCount,
            Self::GetImage => Instruction::GetImage,
            Self::UploadImage => Instruction::UpImage,
            Self::DownloadImage => Instruction::DownImage,
            Self::ImageToChar { .. } => Instruction::ImageToChar,
            Self::CreateModel => Instruction::RegModel,
            Self::UploadChar { .. } => Instruction::UpChar,
            Self::DownloadChar { .. } => Instruction::DownChar,
            Self::Store { .. } => Instruction::Store,
            Self::LoadChar { .. } => Instruction::LoadChar,
            Self::DeleteChar { .. } => Instruction::DeleteChar,
            Self::Empty => Instruction::Empty,
            Self::Match => Instruction::Match,
            Self::Search { .. } => Instruction::Search,
            Self::HighSpeedSearch { .. } => Instruction::HighSpeedSearch,
            Self::GetRandomCode => Instruction::GetRandomCode,
            Self::WriteNotepad { .. } => Instruction::WriteNotepad,
            Self::ReadNotepad { .. } => Instruction::ReadNotepad,
        }
    }

    /// Get command name
    pub fn name(&self) -> &'static str {
        self.instruction().name()
    }

    /// Command packet payload: instruction code followed by big-endian parameters
    pub fn encode_payload(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + self.param_len());
        buf.put_u8(self.instruction().into());

        match self {
            Self::VerifyPassword { password } | Self::SetPassword { password } => {
                buf.put_u32(*password);
            }
            Self::SetAddress { address } => buf.put_u32(*address),
            Self::SetSystemParameter { parameter, value } => {
                buf.put_u8(*parameter);
                buf.put_u8(*value);
            }
            // Info page selector
            Self::ReadInfoPage => buf.put_u8(0x00),
            Self::ImageToChar { buffer }
            | Self::UploadChar { buffer }
            | Self::DownloadChar { buffer } => buf.put_u8((*buffer).into()),
            Self::Store { buffer, page } | Self::LoadChar { buffer, page } => {
                buf.put_u8((*buffer).into());
                buf.put_u16(*page);
            }
            Self::DeleteChar { page, count } => {
                buf.put_u16(*page);
                buf.put_u16(*count);
            }
            Self::Search { buffer, start_page, page_count }
            | Self::HighSpeedSearch { buffer, start_page, page_count } => {
                buf.put_u8((*buffer).into());
                buf.put_u16(*start_page);
                buf.put_u16(*page_count);
            }
            Self::WriteNotepad { page, data } => {
                buf.put_u8(*page);
                buf.put_slice(data);
            }
            Self::ReadNotepad { page } => buf.put_u8(*page),
            Self::ReadSystemParameters
            | Self::TemplateCount
            | Self::GetImage
            | Self::UploadImage
            | Self::DownloadImage
            | Self::CreateModel
            | Self::Empty
            | Self::Match
            | Self::GetRandomCode => {}
        }

        buf.freeze()
    }

    /// Parameter bytes after the instruction code
    pub fn param_len(&self) -> usize {
        match self {
            Self::VerifyPassword { .. } | Self::SetPassword { .. } | Self::SetAddress { .. } => 4,
            Self::SetSystemParameter { .. } => 2,
            Self::ReadInfoPage => 1,
            Self::ImageToChar { .. } | Self::UploadChar { .. } | Self::DownloadChar { .. } => 1,
            Self::Store { .. } | Self::LoadChar { .. } => 3,
            Self::DeleteChar { .. } => 4,
            Self::Search { .. } | Self::HighSpeedSearch { .. } => 5,
            Self::WriteNotepad { .. } => 1 + NOTEPAD_PAGE_SIZE,
            Self::ReadNotepad { .. } => 1,
            _ => 0,
        }
    }

    /// Result bytes after the confirmation code in a successful reply
    pub fn reply_len(&self) -> usize {
        match self {
            Self::ReadSystemParameters => 16,
            Self::TemplateCount => 2,
            Self::Match => 2,
            Self::Search { .. } | Self::HighSpeedSearch { .. } => 4,
            Self::GetRandomCode => 4,
            Self::ReadNotepad { .. } => NOTEPAD_PAGE_SIZE,
            _ => 0,
        }
    }

    /// Data packets exchanged after the acknowledgment
    pub fn transfer(&self) -> Transfer {
        match self {
            Self::UploadImage => Transfer::Upload(BulkKind::Image),
            Self::DownloadImage => Transfer::Download(BulkKind::Image),
            Self::UploadChar { .. } => Transfer::Upload(BulkKind::Char),
            Self::DownloadChar { .. } => Transfer::Download(BulkKind::Char),
            Self::ReadInfoPage => Transfer::InfoPage,
            _ => Transfer::None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.instruction())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_instruction_conversion() {
        assert_eq!(u8::from(Instruction::HighSpeedSearch), 0x1B);
        assert_eq!(u8::from(Instruction::TemplateCount), 0x1D);
    }

    #[test]
    fn test_payload_starts_with_instruction() {
        let commands = [
            Command::GetImage,
            Command::CreateModel,
            Command::TemplateCount,
            Command::ImageToChar { buffer: CharBuffer::Two },
            Command::DeleteChar { page: 3, count: 1 },
        ];

        for command in commands {
            let payload = command.encode_payload();
            assert_eq!(payload[0], u8::from(command.instruction()));
            assert_eq!(payload.len(), 1 + command.param_len());
        }
    }

    #[test]
    fn test_password_is_big_endian() {
        let payload = Command::VerifyPassword { password: 0x1234_5678 }.encode_payload();
        assert_eq!(&payload[..], &[0x13, 0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn test_store_layout() {
        let payload = Command::Store { buffer: CharBuffer::One, page: 0x0102 }.encode_payload();
        assert_eq!(&payload[..], &[0x06, 0x01, 0x01, 0x02]);
    }

    #[test]
    fn test_high_speed_search_layout() {
        let command = Command::HighSpeedSearch {
            buffer: CharBuffer::One,
            start_page: 0,
            page_count: 0x03E9,
        };
        assert_eq!(&command.encode_payload()[..], &[0x1B, 0x01, 0x00, 0x00, 0x03, 0xE9]);
    }

    #[test]
    fn test_write_notepad_layout() {
        let mut data = [0u8; NOTEPAD_PAGE_SIZE];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = i as u8;
        }
        let payload = Command::WriteNotepad { page: 2, data }.encode_payload();

        assert_eq!(payload.len(), 34);
        assert_eq!(payload[0], 0x18);
        assert_eq!(payload[1], 2);
        assert_eq!(&payload[2..], &data[..]);
    }

    #[test]
    fn test_read_info_page_layout() {
        assert_eq!(&Command::ReadInfoPage.encode_payload()[..], &[0x16, 0x00]);
        assert_eq!(Command::ReadInfoPage.transfer(), Transfer::InfoPage);
        assert_eq!(Command::ReadInfoPage.transfer().packets(128), 4);
    }

    #[test]
    fn test_transfers() {
        assert_eq!(Command::UploadImage.transfer(), Transfer::Upload(BulkKind::Image));
        assert_eq!(
            Command::DownloadChar { buffer: CharBuffer::One }.transfer(),
            Transfer::Download(BulkKind::Char)
        );
        assert_eq!(Command::GetImage.transfer(), Transfer::None);
        assert_eq!(BulkKind::Image.size(), 36_864);
        assert_eq!(BulkKind::Char.size(), 512);
    }

    #[test]
    fn test_transfer_packet_counts() {
        assert_eq!(Command::UploadImage.transfer().packets(128), 288);
        assert_eq!(Command::UploadImage.transfer().packets(256), 144);
        assert_eq!(Command::UploadChar { buffer: CharBuffer::One }.transfer().packets(128), 4);
        assert_eq!(Command::DownloadChar { buffer: CharBuffer::Two }.transfer().packets(32), 16);
        assert_eq!(Command::Match.transfer().packets(128), 0);
    }
}
