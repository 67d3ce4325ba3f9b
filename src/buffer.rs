//! Sample buffer shared between the foreground refill loop and the
//! transmitter's interrupt context.
//!
//! # Memory Ordering
//!
//! - Frames are plain `Relaxed` atomic words; they carry no ordering.
//! - The foreground publishes written frames with a `Release` store of `head`
//!   (or a `Release` fence before a block is queued).
//! - The interrupt context publishes progress with a `Release` store of
//!   `cursor`; the foreground reads it with `Acquire` before reusing slots.
//! - Each counter has exactly one writer, so only loads and stores are needed.

use crate::error::ReadError;
use crate::format::FrameFormat;
use crate::source::Source;
use crate::wav::FRAME_SIZE;
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

/// Frames staged on the stack per source read
const STAGING_FRAMES: usize = 64;

/// Contiguous range of frame slots inside the sample buffer
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Region {
    /// first slot
    pub start: usize,
    /// number of frames
    pub len: usize,
}

impl Region {
    /// Region of `len` frames starting at `start`
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// One past the last slot
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    /// Whether the region holds no frames
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether two regions share at least one slot
    pub const fn overlaps(&self, other: &Region) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end() && other.start < self.end()
    }
}

/// State reachable from both execution contexts
pub(crate) struct Shared {
    pub(crate) frames: Box<[AtomicU32]>,
    pub(crate) mask: usize,
    /// Free-running consumer count. Written only by the interrupt context
    /// while a session is live.
    pub(crate) cursor: AtomicUsize,
    /// Free-running count of published frames. Written only by the foreground.
    pub(crate) head: AtomicUsize,
    /// Consumer may emit samples
    pub(crate) active: AtomicBool,
}

impl Shared {
    #[inline]
    pub(crate) fn frame(&self, slot: usize) -> u32 {
        self.frames[slot & self.mask].load(Ordering::Relaxed)
    }
}

/// Fixed-capacity stereo frame buffer, split into two equal halves
pub(crate) struct SampleBuffer {
    shared: Arc<Shared>,
}

impl SampleBuffer {
    /// `capacity` must be a power of two
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        let frames: Vec<AtomicU32> = (0..capacity).map(|_| AtomicU32::new(0)).collect();

        Self {
            shared: Arc::new(Shared {
                frames: frames.into_boxed_slice(),
                mask: capacity - 1,
                cursor: AtomicUsize::new(0),
                head: AtomicUsize::new(0),
                active: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.shared.frames.len()
    }

    pub(crate) fn half(&self) -> usize {
        self.capacity() / 2
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Rewind both counters for a new session.
    ///
    /// Only valid while the transmitter is not consuming, which is the case
    /// between sessions.
    pub(crate) fn reset(&self) {
        self.shared.active.store(false, Ordering::Release);
        self.shared.cursor.store(0, Ordering::Release);
        self.shared.head.store(0, Ordering::Release);
    }

    /// Read up to `region.len` frames from `source` into `region`, adapting
    /// them with `format` before they land in the buffer.
    ///
    /// Short reads are retried while the source still reports bytes
    /// available; a partial frame is carried into the next read. Returns the
    /// number of frames stored. A short count means the source ended early.
    /// The region must not be visible to the consumer.
    pub(crate) fn fill<S, F>(
        &self,
        source: &mut S,
        region: Region,
        format: &F,
    ) -> Result<usize, ReadError<S::Error>>
    where
        S: Source,
        F: FrameFormat,
    {
        debug_assert!(region.end() <= self.capacity());

        let total = region.len * FRAME_SIZE;
        let mut bytes = [0u8; STAGING_FRAMES * FRAME_SIZE];
        let mut words = [0u32; STAGING_FRAMES];
        // Bytes of an incomplete frame at the front of `bytes`
        let mut carry = 0;
        let mut consumed = 0;
        let mut stored = 0;

        while consumed < total {
            let room = (total - consumed).min(bytes.len() - carry);
            let n = source
                .read(&mut bytes[carry..carry + room])
                .map_err(ReadError::Reader)?;
            if n == 0 {
                if source.available() == 0 {
                    break;
                }
                continue;
            }
            consumed += n;

            let have = carry + n;
            let whole = have / FRAME_SIZE;
            for (word, raw) in words[..whole].iter_mut().zip(bytes.chunks_exact(FRAME_SIZE)) {
                *word = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            }
            format.adapt(&mut words[..whole]);

            let base = region.start + stored;
            for (i, word) in words[..whole].iter().enumerate() {
                self.shared.frames[base + i].store(*word, Ordering::Relaxed);
            }
            stored += whole;

            carry = have % FRAME_SIZE;
            bytes.copy_within(whole * FRAME_SIZE..have, 0);
        }

        Ok(stored)
    }
}
