/// Smallest buffer the engines will allocate, in frames
pub const MIN_BUFFER_FRAMES: usize = 1024;

/// Engine settings fixed at construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// requested buffer capacity in stereo frames
    pub buffer_frames: usize,
    /// emit progress text through the `log` facade
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_frames: MIN_BUFFER_FRAMES,
            debug: false,
        }
    }
}

impl EngineConfig {
    /// Request a buffer capacity
    pub fn with_buffer_frames(mut self, frames: usize) -> Self {
        self.buffer_frames = frames;
        self
    }

    /// Toggle progress logging
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Capacity actually allocated: at least [`MIN_BUFFER_FRAMES`], rounded up
    /// to a power of two so cursor counters can be masked into slots.
    pub fn capacity(&self) -> usize {
        self.buffer_frames.max(MIN_BUFFER_FRAMES).next_power_of_two()
    }
}
