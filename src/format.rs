//! Sample format adapters.
//!
//! Frames are stored as one `u32` word per interleaved stereo pair, the left
//! sample in the low half-word and the right sample in the high half-word,
//! exactly as they sit in a little-endian WAV payload.

/// Offset that moves a signed 16-bit sample to unsigned mid-scale
pub const NEUTRAL_OFFSET: i32 = 0x8000;

/// Channel-select tag recognised by tagged 12-bit DAC framing
pub const DAC_CHANNEL_TAG: u16 = 0x1000;

/// Converts stored PCM into the bit layout the transmitter expects
pub trait FrameFormat: Copy + Send + 'static {
    /// Rewrite freshly read frames in place before they are published.
    ///
    /// The transform is destructive: it must run exactly once per region.
    fn adapt(&self, frames: &mut [u32]);

    /// Word handed to a per-sample transmitter for one channel of a published frame
    fn emit(&self, half: u16) -> u16;

    /// Word handed to a per-sample transmitter while there is nothing to play
    fn idle(&self) -> u16;
}

/// Split a frame word into its left and right half-words
#[inline]
pub fn split(frame: u32) -> (u16, u16) {
    (frame as u16, (frame >> 16) as u16)
}

/// Join left and right half-words into a frame word
#[inline]
pub fn join(left: u16, right: u16) -> u32 {
    left as u32 | (right as u32) << 16
}

/// Offset-binary, right-shifted and tagged encoding for block-queued DACs.
///
/// Each half-word is biased to unsigned, shifted down to the DAC's bit depth,
/// and the high half-word gets `tag` OR-ed into its top bits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaggedDac {
    /// bits dropped to fit the converter width
    pub shift: u32,
    /// control bits OR-ed into the high half-word
    pub tag: u16,
}

impl Default for TaggedDac {
    fn default() -> Self {
        Self {
            shift: 4,
            tag: DAC_CHANNEL_TAG,
        }
    }
}

impl TaggedDac {
    #[inline]
    fn scale(&self, half: u16) -> u16 {
        ((half as i16 as i32 + NEUTRAL_OFFSET) >> self.shift) as u16
    }
}

impl FrameFormat for TaggedDac {
    fn adapt(&self, frames: &mut [u32]) {
        for frame in frames.iter_mut() {
            let (lo, hi) = split(*frame);
            *frame = join(self.scale(lo), self.scale(hi) | self.tag);
        }
    }

    fn emit(&self, half: u16) -> u16 {
        half
    }

    fn idle(&self) -> u16 {
        (NEUTRAL_OFFSET >> self.shift) as u16
    }
}

/// Native 16-bit PCM, biased only when handed to the transmitter
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Passthrough {
    /// added to every sample at hand-off
    pub neutral: i16,
    /// written while idle
    pub idle: u16,
}

impl FrameFormat for Passthrough {
    fn adapt(&self, _frames: &mut [u32]) {}

    fn emit(&self, half: u16) -> u16 {
        (half as i16).wrapping_add(self.neutral) as u16
    }

    fn idle(&self) -> u16 {
        self.idle
    }
}
