//! `no_std` streaming of 16-bit stereo WAV files into DAC and I2S transmitters.
//!
//! A file is parsed once into a [`StreamDescriptor`], then its PCM payload is
//! streamed through a fixed double buffer: the transmitter's interrupt drains
//! one half while the foreground refills the other from storage.
//!
//! Two engines share the buffer and the session lifecycle:
//!
//! - [`BlockEngine`] hands whole half-buffers to a DMA-style [`BlockSink`] and
//!   refills a half when its block completes.
//! - [`SampleEngine`] hands a [`SamplePump`] to a [`SampleSink`] whose interrupt
//!   pulls one sample at a time; the foreground refills every slot the pump
//!   has left behind.
//!
//! Playing a file on a block-queued DAC:
//! ```
//! use wavpump::{BlockEngine, BlockLink, BlockSink, EngineConfig, Region, SliceSource, State, TaggedDac};
//!
//! /// Plays every block the moment it is queued
//! struct InstantDac {
//!     link: Option<BlockLink>,
//!     played: usize,
//! }
//!
//! impl BlockSink for InstantDac {
//!     fn configure(&mut self, _sample_rate: u32) {}
//!
//!     fn on_block_complete(&mut self, link: BlockLink) {
//!         self.link = Some(link);
//!     }
//!
//!     fn can_accept_block(&self) -> bool {
//!         true
//!     }
//!
//!     fn enqueue_block(&mut self, region: Region) {
//!         if let Some(link) = &self.link {
//!             self.played += link.frames(region).count();
//!             link.complete();
//!         }
//!     }
//!
//!     fn end(&mut self) {}
//! }
//!
//! // 2000 frames of silence at 44.1 kHz
//! let payload = vec![0u8; 2000 * 4];
//! let mut wav = Vec::new();
//! wav.extend_from_slice(b"RIFF");
//! wav.extend_from_slice(&(36 + payload.len() as u32).to_le_bytes());
//! wav.extend_from_slice(b"WAVEfmt ");
//! wav.extend_from_slice(&16u32.to_le_bytes());
//! wav.extend_from_slice(&[1, 0, 2, 0]);
//! wav.extend_from_slice(&44_100u32.to_le_bytes());
//! wav.extend_from_slice(&(44_100u32 * 4).to_le_bytes());
//! wav.extend_from_slice(&[4, 0, 16, 0]);
//! wav.extend_from_slice(b"data");
//! wav.extend_from_slice(&(payload.len() as u32).to_le_bytes());
//! wav.extend_from_slice(&payload);
//!
//! let dac = InstantDac { link: None, played: 0 };
//! let mut engine = BlockEngine::new(dac, TaggedDac::default(), EngineConfig::default());
//!
//! let descriptor = engine.prepare(SliceSource::new(&wav)).unwrap();
//! assert_eq!(descriptor.sample_rate, 44_100);
//!
//! engine.play().unwrap();
//! assert_eq!(engine.state(), State::Stopped);
//! assert_eq!(engine.sink().played, 2000);
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]

extern crate alloc;

mod buffer;
mod chunk;
mod config;
mod engine;
mod error;
mod fmt;
mod format;
mod sink;
mod source;
mod wav;

#[cfg(test)]
mod test_util;

pub use buffer::Region;
pub use chunk::{CHUNK_HEADER_SIZE, ChunkHeader, ChunkTag, RIFF_HEADER_SIZE};
pub use config::{EngineConfig, MIN_BUFFER_FRAMES};
pub use engine::{BlockEngine, SampleEngine, State};
pub use error::{Error, ReadError};
pub use fmt::{AudioFormat, FMT_CHUNK_SIZE, Fmt};
pub use format::{DAC_CHANNEL_TAG, FrameFormat, NEUTRAL_OFFSET, Passthrough, TaggedDac, join, split};
pub use sink::{BlockLink, BlockSink, Channel, SampleSink, SamplePump};
pub use source::{InvalidSeek, SliceSource, Source};
pub use wav::{FRAME_SIZE, StreamDescriptor, asynch, read_stream_descriptor};

#[cfg(feature = "std")]
pub use source::{File, FileError};
