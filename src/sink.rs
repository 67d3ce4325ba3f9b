//! Hardware audio sink contracts and the interrupt-side handles the engines
//! hand to them.
//!
//! The handles are plain data over the shared buffer state. They never block,
//! never allocate and never log, so they are safe to call from a transmitter
//! interrupt.

use crate::buffer::{Region, Shared};
use crate::format::{FrameFormat, split};
use alloc::sync::Arc;
use core::sync::atomic::Ordering;

/// Transmitter that plays whole regions handed to it, DMA style
pub trait BlockSink {
    /// Set up clocks and framing for `sample_rate`
    fn configure(&mut self, sample_rate: u32);

    /// Register the handle to signal from the transmit-complete interrupt
    fn on_block_complete(&mut self, link: BlockLink);

    /// Whether another block fits in the transmit queue
    fn can_accept_block(&self) -> bool;

    /// Queue `region` for transmission.
    ///
    /// Frames are read through the [`BlockLink`]; hardware DMA can take
    /// [`BlockLink::dma_address`]. [`BlockLink::complete`] must be called once
    /// the region has been fully transmitted.
    fn enqueue_block(&mut self, region: Region);

    /// Enable output before the first block is queued
    fn start(&mut self) {}

    /// Disable output
    fn end(&mut self);
}

/// Transmitter that pulls one sample per interrupt
pub trait SampleSink<F: FrameFormat> {
    /// Set up clocks for `sample_rate` and take the pump its interrupt
    /// handler pulls from
    fn configure_with_callback(&mut self, sample_rate: u32, pump: SamplePump<F>);

    /// Write one word to the transmit register.
    ///
    /// The engines never call this. The implementor's interrupt handler calls
    /// it with the word returned by [`SamplePump::pull`].
    fn emit(&mut self, word: u16);

    /// Enable transmit interrupts
    fn start(&mut self);

    /// Disable transmit interrupts
    fn stop(&mut self);
}

/// Completion handle for block-queued transmitters
#[derive(Clone)]
pub struct BlockLink {
    shared: Arc<Shared>,
}

impl BlockLink {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Signal that the oldest queued block has been transmitted.
    ///
    /// This flips the playback cursor to the other half-buffer.
    #[inline]
    pub fn complete(&self) {
        let done = self.shared.cursor.load(Ordering::Relaxed);
        self.shared.cursor.store(done.wrapping_add(1), Ordering::Release);
    }

    /// Frames of a queued region, in transmit order
    pub fn frames(&self, region: Region) -> impl Iterator<Item = u32> + '_ {
        (region.start..region.end()).map(move |slot| self.shared.frame(slot))
    }

    /// Address of the first frame of `region`, for DMA descriptors.
    ///
    /// Valid while the engine that issued the region is alive.
    pub fn dma_address(&self, region: Region) -> *const u32 {
        self.shared.frames[region.start..].as_ptr() as *const u32
    }
}

/// Transmit slot of an interleaved stereo frame
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Channel {
    /// first slot of a frame
    Left,
    /// second slot; advances the cursor
    Right,
}

/// Per-sample pull handle, owned by the sink's interrupt handler
pub struct SamplePump<F: FrameFormat> {
    shared: Arc<Shared>,
    format: F,
    callback: Option<fn()>,
    every: u32,
    countdown: u32,
    /// Left half of the frame under the cursor went out
    left_sent: bool,
}

impl<F: FrameFormat> SamplePump<F> {
    pub(crate) fn new(shared: Arc<Shared>, format: F, callback: Option<fn()>, every: u32) -> Self {
        Self {
            shared,
            format,
            callback: if every == 0 { None } else { callback },
            every,
            countdown: 0,
            left_sent: false,
        }
    }

    /// Word to transmit in the slot for `channel`.
    ///
    /// Returns the idle word when playback is not active or the cursor has
    /// caught up with the last published frame. A right slot only carries data
    /// if the left slot before it did, so frames are never split.
    #[inline]
    pub fn pull(&mut self, channel: Channel) -> u16 {
        let shared = &*self.shared;
        let cursor = shared.cursor.load(Ordering::Relaxed);

        match channel {
            Channel::Left => {
                self.left_sent = shared.active.load(Ordering::Acquire)
                    && cursor != shared.head.load(Ordering::Acquire);
                if !self.left_sent {
                    return self.format.idle();
                }
                self.format.emit(split(shared.frame(cursor)).0)
            }
            Channel::Right => {
                if !core::mem::take(&mut self.left_sent) {
                    return self.format.idle();
                }
                let right = split(shared.frame(cursor)).1;
                shared.cursor.store(cursor.wrapping_add(1), Ordering::Release);
                self.frame_done();
                self.format.emit(right)
            }
        }
    }

    fn frame_done(&mut self) {
        if let Some(callback) = self.callback {
            if self.countdown == 0 {
                callback();
                self.countdown = self.every;
            }
            self.countdown -= 1;
        }
    }
}
