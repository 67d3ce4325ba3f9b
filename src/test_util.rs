//! Shared doubles for unit tests: synthetic WAV files, sources and sinks.

use crate::buffer::Region;
use crate::format::FrameFormat;
use crate::sink::{BlockLink, BlockSink, Channel, SamplePump, SampleSink};
use crate::source::{InvalidSeek, SliceSource, Source};
use alloc::vec;
use alloc::vec::Vec;
use embedded_io::{ErrorType, Read, Seek, SeekFrom};

/// `n` frames whose left/right values encode their position
pub fn stereo_ramp(n: usize) -> Vec<(i16, i16)> {
    (0..n)
        .map(|i| (i as i16, -(i as i16) - 1))
        .collect()
}

/// Pack a stereo pair the way it sits in the file and in the buffer
pub fn pack(frame: (i16, i16)) -> u32 {
    (frame.0 as u16 as u32) | ((frame.1 as u16 as u32) << 16)
}

/// Builds in-memory WAV images
pub struct WavBuilder {
    sample_rate: u32,
    channels: u16,
    frames: Vec<(i16, i16)>,
    declared_len: Option<u32>,
    fmt_extension: Vec<u8>,
    before_fmt: Vec<u8>,
    before_data: Vec<u8>,
}

fn push_chunk(out: &mut Vec<u8>, tag: [u8; 4], body: &[u8]) {
    out.extend_from_slice(&tag);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 == 1 {
        out.push(0);
    }
}

impl WavBuilder {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 2,
            frames: vec![],
            declared_len: None,
            fmt_extension: vec![],
            before_fmt: vec![],
            before_data: vec![],
        }
    }

    pub fn channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn frames(mut self, frames: &[(i16, i16)]) -> Self {
        self.frames = frames.to_vec();
        self
    }

    /// Override the `data` length field without changing the payload
    pub fn declared_len(mut self, len: u32) -> Self {
        self.declared_len = Some(len);
        self
    }

    pub fn fmt_extension(mut self, bytes: &[u8]) -> Self {
        self.fmt_extension = bytes.to_vec();
        self
    }

    pub fn chunk_before_fmt(mut self, tag: [u8; 4], body: &[u8]) -> Self {
        push_chunk(&mut self.before_fmt, tag, body);
        self
    }

    pub fn chunk_before_data(mut self, tag: [u8; 4], body: &[u8]) -> Self {
        push_chunk(&mut self.before_data, tag, body);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = vec![
            0x52, 0x49, 0x46, 0x46, // RIFF
            0x00, 0x00, 0x00, 0x00, // chunk size (patched below)
            0x57, 0x41, 0x56, 0x45, // WAVE
        ];
        bytes.extend_from_slice(&self.before_fmt);

        let block_align = self.channels * 2;
        let mut fmt = vec![];
        fmt.extend_from_slice(&1u16.to_le_bytes());
        fmt.extend_from_slice(&self.channels.to_le_bytes());
        fmt.extend_from_slice(&self.sample_rate.to_le_bytes());
        fmt.extend_from_slice(&(self.sample_rate * block_align as u32).to_le_bytes());
        fmt.extend_from_slice(&block_align.to_le_bytes());
        fmt.extend_from_slice(&16u16.to_le_bytes());
        fmt.extend_from_slice(&self.fmt_extension);
        push_chunk(&mut bytes, *b"fmt ", &fmt);

        bytes.extend_from_slice(&self.before_data);

        let payload: Vec<u8> = self
            .frames
            .iter()
            .flat_map(|&f| pack(f).to_le_bytes())
            .collect();
        let len = self.declared_len.unwrap_or(payload.len() as u32);
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&payload);

        let riff_len = (bytes.len() as u32 - 8).to_le_bytes();
        bytes[4..8].copy_from_slice(&riff_len);
        bytes
    }
}

/// Source that reports at most `limit` bytes available per call while
/// still holding the whole file
pub struct StarvedSource<'a> {
    pub inner: SliceSource<'a>,
    pub limit: usize,
    pub reads: usize,
}

impl<'a> StarvedSource<'a> {
    pub fn new(bytes: &'a [u8], limit: usize) -> Self {
        Self {
            inner: SliceSource::new(bytes),
            limit,
            reads: 0,
        }
    }
}

impl ErrorType for StarvedSource<'_> {
    type Error = InvalidSeek;
}

impl Read for StarvedSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.reads += 1;
        self.inner.read(buf)
    }
}

impl Seek for StarvedSource<'_> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        self.inner.seek(pos)
    }
}

impl Source for StarvedSource<'_> {
    fn available(&mut self) -> usize {
        self.inner.available().min(self.limit)
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// Source whose reads return at most `chunk` bytes and come back empty on
/// every `stall_every`th call, while `available` stays truthful
pub struct ChoppySource<'a> {
    pub inner: SliceSource<'a>,
    pub chunk: usize,
    pub stall_every: usize,
    pub reads: usize,
}

impl<'a> ChoppySource<'a> {
    pub fn new(bytes: &'a [u8], chunk: usize, stall_every: usize) -> Self {
        Self {
            inner: SliceSource::new(bytes),
            chunk,
            stall_every,
            reads: 0,
        }
    }
}

impl ErrorType for ChoppySource<'_> {
    type Error = InvalidSeek;
}

impl Read for ChoppySource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.reads += 1;
        if self.reads % self.stall_every == 0 {
            return Ok(0);
        }
        let n = buf.len().min(self.chunk);
        self.inner.read(&mut buf[..n])
    }
}

impl Seek for ChoppySource<'_> {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        self.inner.seek(pos)
    }
}

impl Source for ChoppySource<'_> {
    fn available(&mut self) -> usize {
        self.inner.available()
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// Block sink that records queued regions and completes them on request
pub struct RecordingBlockSink {
    pub sample_rate: Option<u32>,
    pub link: Option<BlockLink>,
    pub queue: Vec<Region>,
    pub depth: usize,
    pub enqueued: Vec<Region>,
    pub emitted: Vec<u32>,
    pub ended: bool,
}

impl RecordingBlockSink {
    pub fn new(depth: usize) -> Self {
        Self {
            sample_rate: None,
            link: None,
            queue: vec![],
            depth,
            enqueued: vec![],
            emitted: vec![],
            ended: false,
        }
    }

    /// Play out the oldest queued block and raise the completion
    pub fn finish_block(&mut self) -> bool {
        if self.queue.is_empty() {
            return false;
        }
        let region = self.queue.remove(0);
        if let Some(link) = &self.link {
            self.emitted.extend(link.frames(region));
            link.complete();
        }
        true
    }
}

impl BlockSink for RecordingBlockSink {
    fn configure(&mut self, sample_rate: u32) {
        self.sample_rate = Some(sample_rate);
        self.ended = false;
    }

    fn on_block_complete(&mut self, link: BlockLink) {
        self.link = Some(link);
    }

    fn can_accept_block(&self) -> bool {
        self.queue.len() < self.depth
    }

    fn enqueue_block(&mut self, region: Region) {
        self.queue.push(region);
        self.enqueued.push(region);
    }

    fn end(&mut self) {
        self.ended = true;
    }
}

/// Per-sample sink that is driven by explicit interrupt ticks
pub struct RecordingSampleSink<F: FrameFormat> {
    pub sample_rate: Option<u32>,
    pub pump: Option<SamplePump<F>>,
    pub running: bool,
    pub words: Vec<u16>,
    pub ended: bool,
}

impl<F: FrameFormat> Default for RecordingSampleSink<F> {
    fn default() -> Self {
        Self {
            sample_rate: None,
            pump: None,
            running: false,
            words: vec![],
            ended: false,
        }
    }
}

impl<F: FrameFormat> RecordingSampleSink<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate `frames` left/right transmit interrupts
    pub fn tick(&mut self, frames: usize) {
        for _ in 0..frames {
            for channel in [Channel::Left, Channel::Right] {
                let word = match self.pump.as_mut() {
                    Some(pump) if self.running => pump.pull(channel),
                    _ => continue,
                };
                self.emit(word);
            }
        }
    }
}

impl<F: FrameFormat> SampleSink<F> for RecordingSampleSink<F> {
    fn configure_with_callback(&mut self, sample_rate: u32, pump: SamplePump<F>) {
        self.sample_rate = Some(sample_rate);
        self.pump = Some(pump);
        self.ended = false;
    }

    fn emit(&mut self, word: u16) {
        self.words.push(word);
    }

    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
        self.ended = true;
    }
}
