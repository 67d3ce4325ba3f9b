use super::{Session, State, check_idle};
use crate::buffer::{Region, SampleBuffer};
use crate::config::EngineConfig;
use crate::error::{Error, ReadError};
use crate::format::FrameFormat;
use crate::sink::{SamplePump, SampleSink};
use crate::source::Source;
use crate::wav::StreamDescriptor;
use core::sync::atomic::Ordering;

/// Streams a WAV source into a transmitter that pulls one sample per
/// interrupt.
///
/// The interrupt side advances a free-running cursor through the buffer; the
/// foreground refills every slot the cursor has left behind and publishes the
/// new head. When the source runs dry the head stays put and becomes the stop
/// index: the transmitter idles there instead of replaying stale frames.
pub struct SampleEngine<K, F, S> {
    sink: K,
    format: F,
    config: EngineConfig,
    buffer: SampleBuffer,
    state: State,
    session: Option<Session<S>>,
    descriptor: Option<StreamDescriptor>,
    /// Frames published this session; foreground copy of the shared head
    head: usize,
    callback: Option<fn()>,
    callback_every: u32,
}

impl<K, F, S> SampleEngine<K, F, S>
where
    K: SampleSink<F>,
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
            head: 0,
            callback: None,
            callback_every: 0,
        }
    }

    /// Call `func` from the interrupt context once every `every_frames`
    /// transmitted frames. `0` disables the callback.
    ///
    /// Takes effect from the next [`prepare`](Self::prepare).
    pub fn set_callback(&mut self, func: fn(), every_frames: u32) {
        self.callback = Some(func);
        self.callback_every = every_frames;
    }

    /// Parse `source`, fill the buffer as far as possible and hand the sink
    /// its pump.
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
        self.head = read;
        self.buffer.shared().head.store(read, Ordering::Release);

        let pump = SamplePump::new(
            self.buffer.shared().clone(),
            self.format,
            self.callback,
            self.callback_every,
        );
        self.sink.configure_with_callback(descriptor.sample_rate, pump);

        self.state = if read == 0 && session.pending == 0 {
            State::Draining
        } else {
            State::Prepared
        };
        self.session = Some(session);
        self.descriptor = Some(descriptor);

        Ok(descriptor)
    }

    /// Let the pump emit frames and enable transmit interrupts.
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
    /// Reads as many frames as the cursor has freed since the last pass,
    /// bounded by what the source has available, and stops the session once
    /// the cursor reaches the stop index.
    pub fn poll(&mut self) -> Result<State, ReadError<S::Error>> {
        if !matches!(self.state, State::Playing | State::Draining) {
            return Ok(self.state);
        }
        let debug = self.config.debug;
        let capacity = self.buffer.capacity();
        let cursor = self.buffer.shared().cursor.load(Ordering::Acquire);
        let session = self.session.as_mut().ok_or(Error::NotPrepared)?;

        let queued = self.head.wrapping_sub(cursor);
        debug_assert!(queued <= capacity, "cursor overran the stop index");
        let free = capacity - queued;

        if session.pending > 0 && free > 0 {
            let want = session.budget(free, debug);
            if want > 0 {
                let live = slots(cursor, self.head, capacity);
                let [first, second] = slots(self.head, self.head.wrapping_add(want), capacity);
                debug_assert!(
                    live.iter().all(|l| !l.overlaps(&first) && !l.overlaps(&second)),
                    "refill overlaps frames the pump can still reach"
                );

                let mut read = self.buffer.fill(&mut session.source, first, &self.format)?;
                if read == first.len && !second.is_empty() {
                    read += self.buffer.fill(&mut session.source, second, &self.format)?;
                }
                session.pending -= read;
                self.head = self.head.wrapping_add(read);
                self.buffer.shared().head.store(self.head, Ordering::Release);
                progress!(debug, "read {} at {}, {} left", read, first.start, session.pending);
            }
        }

        if self.state == State::Playing && session.pending == 0 {
            progress!(debug, "waiting for last samples");
            self.state = State::Draining;
        }

        if self.state == State::Draining && cursor == self.head {
            progress!(debug, "done!");
            self.finish();
        }

        Ok(self.state)
    }

    /// Play the prepared session to the end, spinning on the cursor between
    /// refills.
    pub fn play(&mut self) -> Result<(), ReadError<S::Error>> {
        self.start()?;
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
        self.sink.stop();
        self.release_source();
        self.state = State::Stopped;
    }

    fn release_source(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.source.close();
        }
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

    /// Slot of the next frame the transmitter will emit
    pub fn cursor(&self) -> usize {
        self.buffer.shared().cursor.load(Ordering::Acquire) & (self.buffer.capacity() - 1)
    }

    /// Slot where the transmitter will idle, once the source is exhausted
    pub fn stop_index(&self) -> Option<usize> {
        match self.state {
            State::Draining | State::Stopped => Some(self.head & (self.buffer.capacity() - 1)),
            _ => None,
        }
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

/// Buffer slots holding the frames counted by `[from, to)`, split at the wrap
fn slots(from: usize, to: usize, capacity: usize) -> [Region; 2] {
    let start = from & (capacity - 1);
    let len = to.wrapping_sub(from);
    let first = len.min(capacity - start);
    [Region::new(start, first), Region::new(0, len - first)]
}
