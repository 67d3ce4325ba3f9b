use crate::chunk::{ChunkHeader, ChunkTag, CHUNK_HEADER_SIZE, RIFF_HEADER_SIZE, check_riff_header};
use crate::error::{Error, ReadError};
use crate::fmt::{Fmt, FMT_CHUNK_SIZE};
use crate::source::Source;
use embedded_io::{ReadExactError, SeekFrom};

/// Bytes per interleaved 16-bit stereo frame
pub const FRAME_SIZE: usize = 4;

/// Stream parameters of one WAV file, fixed for the whole playback session
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct StreamDescriptor {
    /// sample rate in frames per second
    pub sample_rate: u32,
    /// always `2`, other layouts are rejected while parsing
    pub channel_count: u16,
    /// declared length of the `data` chunk in bytes
    pub payload_byte_length: u32,
    /// absolute offset of the first PCM byte
    pub payload_byte_offset: u32,
}

impl StreamDescriptor {
    fn new(fmt: &Fmt, data_len: u32, offset: u64) -> Self {
        StreamDescriptor {
            sample_rate: fmt.sample_rate,
            channel_count: fmt.num_channels,
            payload_byte_length: data_len,
            payload_byte_offset: offset as u32,
        }
    }

    /// Number of whole frames in the payload. A trailing partial frame is dropped.
    pub fn frame_count(&self) -> usize {
        self.payload_byte_length as usize / FRAME_SIZE
    }
}

fn eof_as<E>(e: ReadExactError<E>, err: Error) -> ReadError<E> {
    match e {
        ReadExactError::UnexpectedEof => ReadError::Parser(err),
        ReadExactError::Other(e) => ReadError::Reader(e),
    }
}

/// Parse the container headers of `source` and leave it positioned at the
/// first PCM byte.
///
/// Sub-chunks are walked in order: `fmt ` must appear before `data`, anything
/// else is skipped. Only 16-bit stereo PCM is accepted.
///
/// ```
/// use wavpump::{read_stream_descriptor, SliceSource, Source};
///
/// let bytes: [u8; 52] = [
///     0x52, 0x49, 0x46, 0x46, // RIFF
///     0x2c, 0x00, 0x00, 0x00, // chunk size
///     0x57, 0x41, 0x56, 0x45, // WAVE
///     0x66, 0x6d, 0x74, 0x20, // fmt_
///     0x10, 0x00, 0x00, 0x00, // chunk size
///     0x01, 0x00, // audio format
///     0x02, 0x00, // num channels
///     0x80, 0xbb, 0x00, 0x00, // sample rate
///     0x00, 0xee, 0x02, 0x00, // byte rate
///     0x04, 0x00, // block align
///     0x10, 0x00, // bits per sample
///     0x64, 0x61, 0x74, 0x61, // data
///     0x08, 0x00, 0x00, 0x00, // chunk size
///     0x01, 0x00, 0x02, 0x00, // frame 1 L+R
///     0x03, 0x00, 0xff, 0xff, // frame 2 L+R
/// ];
///
/// let mut source = SliceSource::new(&bytes);
/// let descriptor = read_stream_descriptor(&mut source).unwrap();
///
/// assert_eq!(descriptor.sample_rate, 48_000);
/// assert_eq!(descriptor.frame_count(), 2);
/// assert_eq!(descriptor.payload_byte_offset, 44);
/// assert_eq!(source.available(), 8);
/// ```
pub fn read_stream_descriptor<S: Source>(
    source: &mut S,
) -> Result<StreamDescriptor, ReadError<S::Error>> {
    if source.available() == 0 {
        return Err(ReadError::Parser(Error::EmptySource));
    }

    let mut riff = [0u8; RIFF_HEADER_SIZE];
    source
        .read_exact(&mut riff)
        .map_err(|e| eof_as(e, Error::NoRiffChunkFound))?;
    check_riff_header(&riff)?;

    let mut fmt = None;
    let mut header = [0u8; CHUNK_HEADER_SIZE];

    loop {
        let missing = if fmt.is_none() {
            Error::NoFmtChunkFound
        } else {
            Error::NoDataChunkFound
        };
        source
            .read_exact(&mut header)
            .map_err(|e| eof_as(e, missing))?;
        let chunk = ChunkHeader::from_bytes(&header)?;

        match chunk.tag {
            ChunkTag::Fmt => {
                if (chunk.len as usize) < FMT_CHUNK_SIZE {
                    return Err(ReadError::Parser(Error::CantParseSliceInto));
                }
                let mut body = [0u8; FMT_CHUNK_SIZE];
                source.read_exact(&mut body)?;
                let parsed = Fmt::from_bytes(&body)?;
                parsed.check_streamable()?;
                fmt = Some(parsed);

                // Skip extension bytes of WAVE_FORMAT_EXTENSIBLE style headers
                let rest = chunk.skip_len() - FMT_CHUNK_SIZE as u64;
                if rest > 0 {
                    source
                        .seek(SeekFrom::Current(rest as i64))
                        .map_err(ReadError::Reader)?;
                }
            }
            ChunkTag::Data => {
                let fmt = fmt.ok_or(Error::NoFmtChunkFound)?;
                let offset = source.stream_position().map_err(ReadError::Reader)?;
                return Ok(StreamDescriptor::new(&fmt, chunk.len, offset));
            }
            ChunkTag::Unknown(_) => {
                source
                    .seek(SeekFrom::Current(chunk.skip_len() as i64))
                    .map_err(ReadError::Reader)?;
            }
        }
    }
}

//-----------------------------------
// MARK: Async

/// Container parsing for async storage stacks
pub mod asynch {
    use super::*;
    use embedded_io_async::{Read, Seek};

    /// Async version of [`read_stream_descriptor`](super::read_stream_descriptor).
    ///
    /// Async readers cannot report available bytes, so an empty source shows up
    /// as [`Error::NoRiffChunkFound`] instead of [`Error::EmptySource`].
    pub async fn read_stream_descriptor<R>(
        reader: &mut R,
    ) -> Result<StreamDescriptor, ReadError<R::Error>>
    where
        R: Read + Seek,
    {
        let mut riff = [0u8; RIFF_HEADER_SIZE];
        reader
            .read_exact(&mut riff)
            .await
            .map_err(|e| eof_as(e, Error::NoRiffChunkFound))?;
        check_riff_header(&riff)?;

        let mut fmt = None;
        let mut header = [0u8; CHUNK_HEADER_SIZE];

        loop {
            let missing = if fmt.is_none() {
                Error::NoFmtChunkFound
            } else {
                Error::NoDataChunkFound
            };
            reader
                .read_exact(&mut header)
                .await
                .map_err(|e| eof_as(e, missing))?;
            let chunk = ChunkHeader::from_bytes(&header)?;

            match chunk.tag {
                ChunkTag::Fmt => {
                    if (chunk.len as usize) < FMT_CHUNK_SIZE {
                        return Err(ReadError::Parser(Error::CantParseSliceInto));
                    }
                    let mut body = [0u8; FMT_CHUNK_SIZE];
                    reader.read_exact(&mut body).await?;
                    let parsed = Fmt::from_bytes(&body)?;
                    parsed.check_streamable()?;
                    fmt = Some(parsed);

                    let rest = chunk.skip_len() - FMT_CHUNK_SIZE as u64;
                    if rest > 0 {
                        reader
                            .seek(SeekFrom::Current(rest as i64))
                            .await
                            .map_err(ReadError::Reader)?;
                    }
                }
                ChunkTag::Data => {
                    let fmt = fmt.ok_or(Error::NoFmtChunkFound)?;
                    let offset = reader.stream_position().await.map_err(ReadError::Reader)?;
                    return Ok(StreamDescriptor::new(&fmt, chunk.len, offset));
                }
                ChunkTag::Unknown(_) => {
                    reader
                        .seek(SeekFrom::Current(chunk.skip_len() as i64))
                        .await
                        .map_err(ReadError::Reader)?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;
    use crate::test_util::{WavBuilder, stereo_ramp};
    use alloc::vec;

    #[test]
    fn parse_minimal_stereo_file() {
        let bytes = WavBuilder::new(22_050).frames(&stereo_ramp(4)).build();
        let mut source = SliceSource::new(&bytes);

        let descriptor = read_stream_descriptor(&mut source).unwrap();

        assert_eq!(descriptor.sample_rate, 22_050);
        assert_eq!(descriptor.channel_count, 2);
        assert_eq!(descriptor.payload_byte_length, 16);
        assert_eq!(descriptor.payload_byte_offset, 44);
        assert_eq!(descriptor.frame_count(), 4);
        assert_eq!(source.position(), 44);
    }

    #[test]
    fn empty_source_is_reported() {
        let mut source = SliceSource::new(&[]);
        assert_eq!(
            read_stream_descriptor(&mut source),
            Err(ReadError::Parser(Error::EmptySource))
        );
    }

    #[test]
    fn truncated_riff_header() {
        let mut source = SliceSource::new(b"RIFF\x00\x00");
        assert_eq!(
            read_stream_descriptor(&mut source),
            Err(ReadError::Parser(Error::NoRiffChunkFound))
        );
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = WavBuilder::new(44_100).frames(&stereo_ramp(1)).build();
        bytes[8..12].copy_from_slice(b"AVI ");
        let mut source = SliceSource::new(&bytes);
        assert_eq!(
            read_stream_descriptor(&mut source),
            Err(ReadError::Parser(Error::NoWaveTagFound))
        );
    }

    #[test]
    fn unknown_chunks_are_skipped() {
        // An odd-sized LIST chunk before fmt and a fact chunk before data
        let bytes = WavBuilder::new(44_100)
            .chunk_before_fmt(*b"LIST", &[1, 2, 3])
            .chunk_before_data(*b"fact", &[0, 0, 0, 0])
            .frames(&stereo_ramp(3))
            .build();
        let mut source = SliceSource::new(&bytes);

        let descriptor = read_stream_descriptor(&mut source).unwrap();

        // 12 + (8 + 3 + 1 pad) + 24 + (8 + 4) + 8
        assert_eq!(descriptor.payload_byte_offset, 68);
        assert_eq!(descriptor.frame_count(), 3);
        assert_eq!(source.available(), 12);
    }

    #[test]
    fn extended_fmt_chunk_is_skipped() {
        let bytes = WavBuilder::new(48_000)
            .fmt_extension(&[0x00, 0x00])
            .frames(&stereo_ramp(2))
            .build();
        let mut source = SliceSource::new(&bytes);

        let descriptor = read_stream_descriptor(&mut source).unwrap();

        assert_eq!(descriptor.payload_byte_offset, 46);
        assert_eq!(descriptor.frame_count(), 2);
    }

    #[test]
    fn missing_data_chunk() {
        let mut bytes = WavBuilder::new(48_000).build();
        // Drop the data header entirely
        bytes.truncate(36);
        let mut source = SliceSource::new(&bytes);
        assert_eq!(
            read_stream_descriptor(&mut source),
            Err(ReadError::Parser(Error::NoDataChunkFound))
        );
    }

    #[test]
    fn data_before_fmt() {
        let bytes = vec![
            0x52, 0x49, 0x46, 0x46, // RIFF
            0x0c, 0x00, 0x00, 0x00, // chunk size
            0x57, 0x41, 0x56, 0x45, // WAVE
            0x64, 0x61, 0x74, 0x61, // data
            0x00, 0x00, 0x00, 0x00, // chunk size
        ];
        let mut source = SliceSource::new(&bytes);
        assert_eq!(
            read_stream_descriptor(&mut source),
            Err(ReadError::Parser(Error::NoFmtChunkFound))
        );
    }

    #[test]
    fn mono_is_rejected() {
        let bytes = WavBuilder::new(48_000).channels(1).frames(&stereo_ramp(2)).build();
        let mut source = SliceSource::new(&bytes);
        assert_eq!(
            read_stream_descriptor(&mut source),
            Err(ReadError::Parser(Error::UnsupportedChannelCount(1)))
        );
    }

    #[test]
    fn misaligned_payload_truncates_to_whole_frames() {
        let bytes = WavBuilder::new(48_000)
            .frames(&stereo_ramp(3))
            .declared_len(11)
            .build();
        let mut source = SliceSource::new(&bytes);

        let descriptor = read_stream_descriptor(&mut source).unwrap();

        assert_eq!(descriptor.payload_byte_length, 11);
        assert_eq!(descriptor.frame_count(), 2);
    }

    mod async_tests {
        use super::*;

        // Simple async reader wrapper for testing
        struct AsyncSliceReader<'a> {
            data: &'a [u8],
            pos: usize,
        }

        impl<'a> AsyncSliceReader<'a> {
            fn new(data: &'a [u8]) -> Self {
                Self { data, pos: 0 }
            }
        }

        impl embedded_io_async::ErrorType for AsyncSliceReader<'_> {
            type Error = core::convert::Infallible;
        }

        impl embedded_io_async::Read for AsyncSliceReader<'_> {
            async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
                let n = (self.data.len() - self.pos).min(buf.len());
                buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
                self.pos += n;
                Ok(n)
            }
        }

        impl embedded_io_async::Seek for AsyncSliceReader<'_> {
            async fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
                let target = match pos {
                    SeekFrom::Start(n) => n as i64,
                    SeekFrom::End(n) => self.data.len() as i64 + n,
                    SeekFrom::Current(n) => self.pos as i64 + n,
                };
                self.pos = (target.max(0) as usize).min(self.data.len());
                Ok(self.pos as u64)
            }
        }

        #[tokio::test]
        async fn test_async_descriptor() {
            let bytes = WavBuilder::new(44_100)
                .chunk_before_data(*b"LIST", &[9, 9])
                .frames(&stereo_ramp(5))
                .build();
            let mut reader = AsyncSliceReader::new(&bytes);

            let descriptor = asynch::read_stream_descriptor(&mut reader).await.unwrap();

            assert_eq!(descriptor.sample_rate, 44_100);
            assert_eq!(descriptor.frame_count(), 5);
            assert_eq!(descriptor.payload_byte_offset, 54);
            assert_eq!(reader.pos, 54);
        }

        #[tokio::test]
        async fn test_async_empty_reader() {
            let mut reader = AsyncSliceReader::new(&[]);
            assert_eq!(
                asynch::read_stream_descriptor(&mut reader).await,
                Err(ReadError::Parser(Error::NoRiffChunkFound))
            );
        }
    }
}
