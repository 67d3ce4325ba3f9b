use crate::error::Error;
use core::convert::TryInto;

/// Bytes of the `fmt ` chunk the reader consumes; extension bytes are skipped
pub const FMT_CHUNK_SIZE: usize = 16;

/// Audio format types the streaming engine can play
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum AudioFormat {
    /// PCM (Pulse Code Modulation) - integer samples
    Pcm = 1,
}

impl AudioFormat {
    fn from_u16(value: u16) -> Result<Self, Error> {
        match value {
            1 => Ok(AudioFormat::Pcm),
            _ => Err(Error::UnsupportedFormat(value)),
        }
    }
}

/// Struct representing the `fmt_` section of a WAV file
///
/// for more information see [`here`]
///
/// [`here`]: http://soundfile.sapp.org/doc/WaveFormat/
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Fmt {
    /// audio format, only PCM is streamed
    pub audio_format: AudioFormat,
    /// sample rate, typical values are `22_050`, `44_100` or `48_000`
    pub sample_rate: u32,
    /// number of audio channels in the sample data, channels are interleaved
    pub num_channels: u16,
    /// bytes per interleaved frame
    pub block_align: u16,
    /// bit depth for each sample
    pub bit_depth: u16,
}

fn le_u16(bytes: &[u8], at: usize) -> Result<u16, Error> {
    bytes
        .get(at..at + 2)
        .and_then(|b| b.try_into().ok())
        .map(u16::from_le_bytes)
        .ok_or(Error::CantParseSliceInto)
}

fn le_u32(bytes: &[u8], at: usize) -> Result<u32, Error> {
    bytes
        .get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(Error::CantParseSliceInto)
}

impl Fmt {
    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let audio_format = AudioFormat::from_u16(le_u16(bytes, 0)?)?;

        Ok(Fmt {
            audio_format,
            num_channels: le_u16(bytes, 2)?,
            sample_rate: le_u32(bytes, 4)?,
            block_align: le_u16(bytes, 12)?,
            bit_depth: le_u16(bytes, 14)?,
        })
    }

    /// Reject anything but interleaved 16-bit stereo.
    pub(crate) fn check_streamable(&self) -> Result<(), Error> {
        if self.num_channels != 2 {
            return Err(Error::UnsupportedChannelCount(self.num_channels));
        }
        if self.bit_depth != 16 {
            return Err(Error::UnsupportedBitDepth(self.bit_depth));
        }
        Ok(())
    }
}
