//! Double-buffer streaming engines.
//!
//! Both engines follow the same session lifecycle:
//!
//! ```text
//! Uninitialized ─prepare─▶ Prepared ─start─▶ Playing ─▶ Draining ─▶ Stopped
//!                                                        (pending == 0)
//! ```
//!
//! `play` is `start` followed by busy-polling until `Stopped`. `end` jumps
//! straight to `Stopped` from any state.

/// Progress text through `log`, evaluated only when debugging is on
macro_rules! progress {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            log::debug!($($arg)+);
        }
    };
}

mod block;
mod sample;

pub use block::BlockEngine;
pub use sample::SampleEngine;

use crate::error::{Error, ReadError};
use crate::source::Source;
use crate::wav::{FRAME_SIZE, StreamDescriptor, read_stream_descriptor};

/// Session lifecycle state
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
    /// No session has been prepared yet
    Uninitialized,
    /// Headers parsed and the first buffer filled
    Prepared,
    /// Refilling halves as the sink consumes them
    Playing,
    /// Source exhausted, waiting for buffered frames to play out
    Draining,
    /// Sink disabled and source released
    Stopped,
}

/// Per-session storage state, owned by the foreground
pub(crate) struct Session<S> {
    pub(crate) source: S,
    /// Frames still in the file and not yet written to the buffer
    pub(crate) pending: usize,
}

impl<S: Source> Session<S> {
    /// Parse `source` and set up the pending count.
    ///
    /// The source is closed if parsing fails.
    pub(crate) fn open(
        mut source: S,
        debug: bool,
    ) -> Result<(Self, StreamDescriptor), ReadError<S::Error>> {
        progress!(debug, "available: {} bytes", source.available());

        let descriptor = match read_stream_descriptor(&mut source) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                source.close();
                return Err(e);
            }
        };
        progress!(
            debug,
            "frames to play: {} at {} Hz",
            descriptor.frame_count(),
            descriptor.sample_rate
        );

        let pending = descriptor.frame_count();
        Ok((Session { source, pending }, descriptor))
    }

    /// Frames the next refill may read: at most `want`, the pending count
    /// and what the source has available right now.
    ///
    /// A source with nothing available while frames are still pending has
    /// ended early; pending is dropped to zero so the engine drains.
    pub(crate) fn budget(&mut self, want: usize, debug: bool) -> usize {
        if self.pending == 0 {
            return 0;
        }
        let available = self.source.available() / FRAME_SIZE;
        if available == 0 {
            progress!(debug, "source ended with {} frames pending", self.pending);
            self.pending = 0;
            return 0;
        }
        want.min(self.pending).min(available)
    }
}

/// A new session may only be prepared while nothing is playing
pub(crate) fn check_idle(state: State) -> Result<(), Error> {
    match state {
        State::Playing | State::Draining => Err(Error::SessionActive),
        _ => Ok(()),
    }
}
