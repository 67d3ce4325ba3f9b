use super::{Session, State, check_idle};
use crate::buffer::{Region, SampleBuffer};
use crate::config::EngineConfig;
use crate::error::{Error, ReadError};
use crate::format::FrameFormat;
use crate::sink::{BlockLink, BlockSink};
use crate::source::Source;
use crate::wav::StreamDescriptor;
use core::sync::atomic::{Ordering, fence};

/// Streams a WAV source into a block-queued transmitter.
///
/// Blocks alternate between the two half-buffers. Block `n` lives in half
/// `n % 2`; the sink's completion interrupt counts finished blocks, and a half
/// is refilled only once the block that last used it has completed.
pub struct BlockEngine<K, F, S> {
    sink: K,
    format: F,
    config: EngineConfig,
    buffer: SampleBuffer,
    state: State,
    session: Option<Session<S>>,
    descriptor: Option<StreamDescriptor>,
    /// Frames held by each half for its current block
    lens: [usize; 2],
    /// Blocks written into the buffer this session
    filled: usize,
    /// Blocks handed to the sink this session
    queued: usize,
}

impl<K, F, S> BlockEngine<K, F, S>
where
    K: BlockSink,
    F: FrameFormat,
    S: Source,
{
    /// Allocate the sample buffer. It is reused by every session.
    pub fn new(sink: K, format: F, config: EngineConfig) -> Self {
        let buffer = SampleBuffer::new(config.capacity());
        progress!(config.debug, "allocated buffer size: {} frames", buffer.capacity());

        Self {
            sink,
            format,
            config,
            buffer,
            state: State::Uninitialized,
            session: None,
            descriptor: None,
            lens: [0; 2],
            filled: 0,
            queued: 0,
        }
    }

    /// Parse `source`, fill the buffer as far as possible and hook the sink
    /// up to this engine.
    ///
    /// Fails with [`Error::EmptySource`] if the source has no bytes.
    pub fn prepare(&mut self, source: S) -> Result<StreamDescriptor, ReadError<S::Error>> {
        check_idle(self.state)?;
        self.release_source();
        // The old session is gone even if the new one fails to open
        if self.state == State::Prepared {
            self.state = State::Stopped;
        }
        self.descriptor = None;

        let debug = self.config.debug;
        let (mut session, descriptor) = Session::open(source, debug)?;

        self.buffer.reset();
        let want = session.budget(self.buffer.capacity(), debug);
        progress!(debug, "reading samples N={}", want);
        let read = match self.buffer.fill(&mut session.source, Region::new(0, want), &self.format) {
            Ok(read) => read,
            Err(e) => {
                session.source.close();
                return Err(e);
            }
        };
        session.pending -= read;

        let half = self.buffer.half();
        self.lens = [read.min(half), read.saturating_sub(half)];
        self.filled = self.lens.iter().filter(|&&len| len > 0).count();
        self.queued = 0;

        self.sink.configure(descriptor.sample_rate);
        self.sink
            .on_block_complete(BlockLink::new(self.buffer.shared().clone()));

        self.state = if read == 0 && session.pending == 0 {
            State::Draining
        } else {
            State::Prepared
        };
        self.session = Some(session);
        self.descriptor = Some(descriptor);

        Ok(descriptor)
    }

    /// Enable the sink. Blocks are queued by [`poll`](Self::poll).
    pub fn start(&mut self) -> Result<(), Error> {
        match self.state {
            State::Prepared => {
                self.buffer.shared().active.store(true, Ordering::Release);
                self.sink.start();
                self.state = State::Playing;
                Ok(())
            }
            State::Draining if self.session.is_some() => Ok(()),
            _ => Err(Error::NotPrepared),
        }
    }

    /// One pass of the refill loop. Never blocks.
    ///
    /// Refills the half freed by the last completed block, queues the oldest
    /// unqueued block if the sink has room, and stops the session once every
    /// block has been transmitted.
    pub fn poll(&mut self) -> Result<State, ReadError<S::Error>> {
        if !matches!(self.state, State::Playing | State::Draining) {
            return Ok(self.state);
        }
        let debug = self.config.debug;
        let completed = self.buffer.shared().cursor.load(Ordering::Acquire);
        let half = self.filled % 2;
        let half_free = self.filled.wrapping_sub(completed) < 2;
        let target = Region::new(half * self.buffer.half(), self.buffer.half());
        debug_assert!(
            !half_free || self.in_flight(completed).all(|live| !live.overlaps(&target)),
            "refill half is still queued"
        );
        let session = self.session.as_mut().ok_or(Error::NotPrepared)?;

        if session.pending > 0 && half_free {
            let want = session.budget(self.buffer.half(), debug);
            if want > 0 {
                let region = Region::new(half * self.buffer.half(), want);
                progress!(debug, "reading {} to {}", want, region.start);
                let read = self.buffer.fill(&mut session.source, region, &self.format)?;
                session.pending -= read;
                if read > 0 {
                    self.lens[half] = read;
                    self.filled = self.filled.wrapping_add(1);
                }
                progress!(debug, "samples left to play: {}", session.pending);
            }
        }

        if self.queued != self.filled && self.sink.can_accept_block() {
            let half = self.queued % 2;
            let region = Region::new(half * self.buffer.half(), self.lens[half]);
            // Frame stores must land before the transmitter can see the block
            fence(Ordering::Release);
            progress!(debug, "queue half {} N={}", half, region.len);
            self.sink.enqueue_block(region);
            self.queued = self.queued.wrapping_add(1);
        }

        if self.state == State::Playing && session.pending == 0 {
            progress!(debug, "source exhausted, draining");
            self.state = State::Draining;
        }

        if self.state == State::Draining && completed == self.queued && self.queued == self.filled {
            progress!(debug, "done!");
            self.finish();
        }

        Ok(self.state)
    }

    /// Play the prepared session to the end, spinning on the completion
    /// cursor between refills.
    pub fn play(&mut self) -> Result<(), ReadError<S::Error>> {
        self.start()?;
        progress!(self.config.debug, "waiting for blocks");
        while self.poll()? != State::Stopped {
            core::hint::spin_loop();
        }
        Ok(())
    }

    /// Stop immediately: disable the sink and release the source.
    pub fn end(&mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        self.buffer.shared().active.store(false, Ordering::Release);
        self.sink.end();
        self.release_source();
        self.state = State::Stopped;
    }

    fn release_source(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.source.close();
        }
    }

    /// Regions queued to the sink and not yet completed
    fn in_flight(&self, completed: usize) -> impl Iterator<Item = Region> + '_ {
        (0..self.queued.wrapping_sub(completed)).map(move |k| {
            let half = completed.wrapping_add(k) % 2;
            Region::new(half * self.buffer.half(), self.lens[half])
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// Parameters of the last prepared stream
    pub fn descriptor(&self) -> Option<StreamDescriptor> {
        self.descriptor
    }

    /// Frames still to be read from the source
    pub fn pending_frames(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.pending)
    }

    /// Anchor of the half-buffer the sink is playing or will play next
    pub fn cursor(&self) -> usize {
        let completed = self.buffer.shared().cursor.load(Ordering::Acquire);
        (completed % 2) * self.buffer.half()
    }

    /// Slot one past the last frame of the final block, once the source is
    /// exhausted
    pub fn stop_index(&self) -> Option<usize> {
        if !matches!(self.state, State::Draining | State::Stopped) {
            return None;
        }
        Some(match self.filled.checked_sub(1) {
            Some(last) => {
                let half = last % 2;
                (half * self.buffer.half() + self.lens[half]) & (self.buffer.capacity() - 1)
            }
            None => 0,
        })
    }

    /// Buffer capacity in frames
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// The driven sink
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// The driven sink, mutably
    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }
}
