//! Finger images and bitmap encoding

use std::fmt;
use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use zfmrust_core::constants::IMAGE_BUFFER_SIZE;

use crate::error::{Error, Result};

const FILE_HEADER_SIZE: usize = 14;
const INFO_HEADER_SIZE: usize = 40;
const HEADER_SIZE: usize = FILE_HEADER_SIZE + INFO_HEADER_SIZE;
const PALETTE_COLORS: u32 = 16;
const BITS_PER_PIXEL: u16 = 4;

/// A raw sensor image: 4-bit grey levels, two pixels per byte, high nibble
/// first, rows top to bottom
#[derive(Clone, PartialEq, Eq)]
pub struct FingerImage {
    data: Bytes,
}

impl FingerImage {
    pub const WIDTH: usize = 256;
    pub const HEIGHT: usize = 288;
    pub const ROW_BYTES: usize = Self::WIDTH / 2;

    pub fn new(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() != IMAGE_BUFFER_SIZE {
            return Err(Error::Validation(format!(
                "image must be {} bytes, got {}",
                IMAGE_BUFFER_SIZE,
                data.len()
            )));
        }
        Ok(Self { data })
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Packed rows, top first
    pub fn rows(&self) -> impl DoubleEndedIterator<Item = &[u8]> {
        self.data.chunks_exact(Self::ROW_BYTES)
    }

    /// Grey level (0-15) at column `x`, row `y`
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= Self::WIDTH || y >= Self::HEIGHT {
            return None;
        }
        let byte = self.data[y * Self::ROW_BYTES + x / 2];
        Some(if x % 2 == 0 { byte >> 4 } else { byte & 0x0F })
    }

    /// Encode as a 16-level greyscale BMP
    pub fn to_bmp(&self) -> Vec<u8> {
        let row_stride = Self::ROW_BYTES.next_multiple_of(4);
        let pixel_bytes = row_stride * Self::HEIGHT;
        let offset = HEADER_SIZE + PALETTE_COLORS as usize * 4;

        let mut out = Vec::with_capacity(offset + pixel_bytes);
        out.extend_from_slice(&bmp_header(offset, pixel_bytes));

        for level in 0..PALETTE_COLORS as u8 {
            let grey = level * 0x11;
            out.extend_from_slice(&[grey, grey, grey, 0x00]);
        }

        // BMP stores rows bottom-up
        for row in self.rows().rev() {
            out.extend_from_slice(row);
            out.resize(out.len() + row_stride - row.len(), 0);
        }

        out
    }

    /// Write the image as a BMP file, returning the written path
    pub fn write_bmp(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref().to_path_buf();
        std::fs::write(&path, self.to_bmp())?;
        Ok(path)
    }
}

fn bmp_header(offset: usize, pixel_bytes: usize) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];

    header[0..2].copy_from_slice(b"BM");
    LittleEndian::write_u32(&mut header[2..6], (offset + pixel_bytes) as u32);
    LittleEndian::write_u32(&mut header[10..14], offset as u32);

    LittleEndian::write_u32(&mut header[14..18], INFO_HEADER_SIZE as u32);
    LittleEndian::write_i32(&mut header[18..22], FingerImage::WIDTH as i32);
    LittleEndian::write_i32(&mut header[22..26], FingerImage::HEIGHT as i32);
    LittleEndian::write_u16(&mut header[26..28], 1);
    LittleEndian::write_u16(&mut header[28..30], BITS_PER_PIXEL);
    LittleEndian::write_u32(&mut header[34..38], pixel_bytes as u32);
    LittleEndian::write_u32(&mut header[46..50], PALETTE_COLORS);

    header
}

impl fmt::Debug for FingerImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FingerImage({}x{})", Self::WIDTH, Self::HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn gradient() -> FingerImage {
        let data: Vec<u8> = (0..FingerImage::HEIGHT)
            .flat_map(|row| std::iter::repeat_n((row % 16) as u8 * 0x11, FingerImage::ROW_BYTES))
            .collect();
        FingerImage::new(data).unwrap()
    }

    #[test]
    fn test_image_size_validation() {
        assert!(FingerImage::new(vec![0u8; 36_864]).is_ok());
        assert!(matches!(FingerImage::new(vec![0u8; 100]), Err(Error::Validation(_))));
    }

    #[test]
    fn test_pixels_unpack_nibbles() {
        let mut data = vec![0u8; 36_864];
        data[0] = 0xA5;
        data[FingerImage::ROW_BYTES] = 0x30;
        let image = FingerImage::new(data).unwrap();

        assert_eq!(image.pixel(0, 0), Some(0x0A));
        assert_eq!(image.pixel(1, 0), Some(0x05));
        assert_eq!(image.pixel(0, 1), Some(0x03));
        assert_eq!(image.pixel(256, 0), None);
        assert_eq!(image.pixel(0, 288), None);
        assert_eq!(image.rows().count(), 288);
    }

    #[test]
    fn test_bmp_layout() {
        let bmp = gradient().to_bmp();

        assert_eq!(&bmp[0..2], b"BM");
        assert_eq!(bmp.len(), 118 + 36_864);
        assert_eq!(u32::from_le_bytes(bmp[2..6].try_into().unwrap()), bmp.len() as u32);
        assert_eq!(u32::from_le_bytes(bmp[10..14].try_into().unwrap()), 118);
        assert_eq!(i32::from_le_bytes(bmp[18..22].try_into().unwrap()), 256);
        assert_eq!(i32::from_le_bytes(bmp[22..26].try_into().unwrap()), 288);
        assert_eq!(u16::from_le_bytes(bmp[28..30].try_into().unwrap()), 4);

        // palette entry 15 is white
        assert_eq!(&bmp[54 + 15 * 4..54 + 16 * 4], &[0xFF, 0xFF, 0xFF, 0x00]);

        // first stored row is the bottom image row (287 % 16 = 15)
        assert_eq!(bmp[118], 0xFF);
        assert_eq!(*bmp.last().unwrap(), 0x00);
    }

    #[test]
    fn test_write_bmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = gradient().write_bmp(dir.path().join("finger.bmp")).unwrap();

        assert_eq!(path, dir.path().join("finger.bmp"));
        assert_eq!(std::fs::read(&path).unwrap().len(), 118 + 36_864);
    }
}
