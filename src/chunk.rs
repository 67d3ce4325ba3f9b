use crate::error::Error;
use core::convert::TryInto;

/// Size of the outer `RIFF....WAVE` header
pub const RIFF_HEADER_SIZE: usize = 12;
/// Size of a sub-chunk header (tag + length)
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Sub-chunk identifiers the reader cares about
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ChunkTag {
    /// `fmt ` chunk
    Fmt,
    /// `data` chunk
    Data,
    /// Anything else, skipped during the chunk walk
    Unknown([u8; 4]),
}

impl ChunkTag {
    /// Identify a chunk from its four tag bytes
    pub fn from_bytes(bytes: &[u8; 4]) -> Self {
        match bytes {
            b"fmt " => ChunkTag::Fmt,
            b"data" => ChunkTag::Data,
            _ => ChunkTag::Unknown(*bytes),
        }
    }
}

/// Header preceding every sub-chunk
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ChunkHeader {
    /// chunk identifier
    pub tag: ChunkTag,
    /// declared payload length, excluding the header and pad byte
    pub len: u32,
}

impl ChunkHeader {
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let tag: [u8; 4] = bytes
            .get(0..4)
            .and_then(|b| b.try_into().ok())
            .ok_or(Error::CantParseSliceInto)?;
        let len = bytes
            .get(4..8)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
            .ok_or(Error::CantParseSliceInto)?;

        Ok(ChunkHeader {
            tag: ChunkTag::from_bytes(&tag),
            len,
        })
    }

    /// Bytes between the end of this header and the next header.
    ///
    /// RIFF pads odd-sized chunks to an even length.
    pub fn skip_len(&self) -> u64 {
        self.len as u64 + (self.len & 1) as u64
    }
}

/// Validate the outer `RIFF` header
pub(crate) fn check_riff_header(bytes: &[u8; RIFF_HEADER_SIZE]) -> Result<(), Error> {
    if &bytes[0..4] != b"RIFF" {
        return Err(Error::NoRiffChunkFound);
    }
    if &bytes[8..12] != b"WAVE" {
        return Err(Error::NoWaveTagFound);
    }
    Ok(())
}
