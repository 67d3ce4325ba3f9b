use embedded_io::{ErrorKind, ErrorType, Read, Seek, SeekFrom};

/// Seekable byte stream holding a WAV file
///
/// On top of `embedded_io` reads and seeks, the engine needs to know how many
/// bytes are left so it can cap refills, and a way to release the handle once
/// a session ends.
pub trait Source: Read + Seek {
    /// Bytes left between the read cursor and the end of the file
    fn available(&mut self) -> usize;

    /// Release the underlying handle. Called once when a session stops.
    fn close(&mut self) {}
}

impl<T: Source + ?Sized> Source for &mut T {
    fn available(&mut self) -> usize {
        T::available(self)
    }

    fn close(&mut self) {
        T::close(self)
    }
}

/// In-memory [`Source`] over a byte slice
pub struct SliceSource<'a> {
    bytes: &'a [u8],
    pos: usize,
    closed: bool,
}

impl<'a> SliceSource<'a> {
    /// Wrap a complete file image
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            closed: false,
        }
    }

    /// Whether [`Source::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Current read position
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// Seek target before the start of the slice
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct InvalidSeek;

impl embedded_io::Error for InvalidSeek {
    fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

impl ErrorType for SliceSource<'_> {
    type Error = InvalidSeek;
}

impl Read for SliceSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let rest = &self.bytes[self.pos..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Seek for SliceSource<'_> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        let target = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::End(n) => self.bytes.len() as i64 + n,
            SeekFrom::Current(n) => self.pos as i64 + n,
        };
        if target < 0 {
            return Err(InvalidSeek);
        }
        // Seeking past the end parks the cursor at EOF
        self.pos = (target as usize).min(self.bytes.len());
        Ok(self.pos as u64)
    }
}

impl Source for SliceSource<'_> {
    fn available(&mut self) -> usize {
        self.bytes.len() - self.pos
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(feature = "std")]
mod file_wrapper {
    use super::Source;
    use std::fs;
    use std::io::{Read, Seek, SeekFrom};

    /// Wrapper for std::fs::File so host builds can stream from disk
    pub struct File(pub fs::File);

    impl File {
        /// Open a file for playback
        pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, FileError> {
            fs::File::open(path).map(File).map_err(FileError)
        }
    }

    #[doc(hidden)]
    #[derive(Debug)]
    pub struct FileError(pub std::io::Error);

    impl embedded_io::Error for FileError {
        fn kind(&self) -> embedded_io::ErrorKind {
            embedded_io::ErrorKind::Other
        }
    }

    impl embedded_io::ErrorType for File {
        type Error = FileError;
    }

    impl embedded_io::Read for File {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            self.0.read(buf).map_err(FileError)
        }
    }

    impl embedded_io::Seek for File {
        fn seek(&mut self, pos: embedded_io::SeekFrom) -> Result<u64, Self::Error> {
            let pos = match pos {
                embedded_io::SeekFrom::Start(n) => SeekFrom::Start(n),
                embedded_io::SeekFrom::End(n) => SeekFrom::End(n),
                embedded_io::SeekFrom::Current(n) => SeekFrom::Current(n),
            };
            self.0.seek(pos).map_err(FileError)
        }
    }

    impl Source for File {
        fn available(&mut self) -> usize {
            let len = match self.0.metadata() {
                Ok(meta) => meta.len(),
                Err(_) => return 0,
            };
            let pos = self.0.stream_position().unwrap_or(len);
            len.saturating_sub(pos) as usize
        }
    }
}

#[cfg(feature = "std")]
pub use file_wrapper::{File, FileError};
