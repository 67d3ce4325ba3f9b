use core::fmt;

/// Error type for parsing and session failures
#[derive(Debug, PartialEq)]
pub enum Error {
    /// The source reported no bytes available when a session was prepared
    EmptySource,
    /// No riff chunk found
    NoRiffChunkFound,
    /// No WAVE tag found
    NoWaveTagFound,
    /// No fmt/header chunk found
    NoFmtChunkFound,
    /// No data chunk found
    NoDataChunkFound,
    /// The source ended in the middle of a header
    UnexpectedEof,
    /// Unsupported format
    UnsupportedFormat(u16),
    /// Unsupported bit depth
    UnsupportedBitDepth(u16),
    /// Unsupported number of channels
    UnsupportedChannelCount(u16),
    /// Failed parsing slice into specific bytes
    CantParseSliceInto,
    /// Playback was requested without a prepared session
    NotPrepared,
    /// A session is still playing or draining
    SessionActive,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptySource => write!(f, "empty or unreadable source"),
            Error::NoRiffChunkFound => write!(f, "no RIFF chunk found"),
            Error::NoWaveTagFound => write!(f, "no WAVE tag found"),
            Error::NoFmtChunkFound => write!(f, "no fmt chunk found"),
            Error::NoDataChunkFound => write!(f, "no data chunk found"),
            Error::UnexpectedEof => write!(f, "unexpected end of source"),
            Error::UnsupportedFormat(format) => write!(f, "unsupported audio format {format}"),
            Error::UnsupportedBitDepth(depth) => write!(f, "unsupported bit depth {depth}"),
            Error::UnsupportedChannelCount(n) => write!(f, "unsupported channel count {n}"),
            Error::CantParseSliceInto => write!(f, "malformed header field"),
            Error::NotPrepared => write!(f, "no prepared session"),
            Error::SessionActive => write!(f, "a session is already active"),
        }
    }
}

/// Error returned by operations that touch the storage source
#[derive(Debug, PartialEq)]
pub enum ReadError<E> {
    /// Error from the underlying reader
    Reader(E),
    /// Error from the parser or the session state machine
    Parser(Error),
}

impl<E> From<Error> for ReadError<E> {
    fn from(e: Error) -> Self {
        ReadError::Parser(e)
    }
}

impl<E> From<embedded_io::ReadExactError<E>> for ReadError<E> {
    fn from(e: embedded_io::ReadExactError<E>) -> Self {
        match e {
            embedded_io::ReadExactError::UnexpectedEof => ReadError::Parser(Error::UnexpectedEof),
            embedded_io::ReadExactError::Other(e) => ReadError::Reader(e),
        }
    }
}

impl<E: fmt::Debug> fmt::Display for ReadError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Reader(e) => write!(f, "source error: {e:?}"),
            ReadError::Parser(e) => write!(f, "{e}"),
        }
    }
}
