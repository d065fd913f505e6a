//! Character files and search results

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use zfmrust_core::constants::CHAR_BUFFER_SIZE;

use crate::error::{Error, Result};

/// Contents of a character buffer: a feature file or a merged model
#[derive(Clone, PartialEq, Eq)]
pub struct Template(Bytes);

impl Template {
    pub const SIZE: usize = CHAR_BUFFER_SIZE;

    pub fn new(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() != Self::SIZE {
            return Err(Error::Validation(format!(
                "template must be {} bytes, got {}",
                Self::SIZE,
                data.len()
            )));
        }
        Ok(Self(data))
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl AsRef<[u8]> for Template {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Template").field(&self.0.len()).finish()
    }
}

/// A library hit from `Search` or `HighSpeedSearch`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// Flash page holding the matched template
    pub page: u16,

    /// Match score
    pub score: u16,
}

impl SearchMatch {
    /// Parse the 4-byte result fields of a search reply
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(Error::Parse(format!("search result needs 4 bytes, got {}", data.len())));
        }
        Ok(Self {
            page: BigEndian::read_u16(&data[0..2]),
            score: BigEndian::read_u16(&data[2..4]),
        })
    }
}

impl fmt::Display for SearchMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} (score {})", self.page, self.score)
    }
}
