//! Engine-wide constants and the context descriptor.
//!
//! The sample rate and block size are fixed at compile time so that every
//! buffer in the engine can be sized statically and the audio thread never
//! has to renegotiate timing.

/// Sample rate of the engine, in Hz. Device output is opened at this rate.
pub const SR: u32 = 44100;

/// Number of frames processed per block. 256 frames is ~172 blocks per
/// second, fast enough for parameter updates to feel immediate.
pub const BLOCK_SIZE: usize = 256;

/// The maximum number of channels any piece of the engine can ever output.
pub const MAX_CHANNELS: usize = 16;

/// Length of the internal crossfades (HRTF coefficient changes, etc.), in
/// samples. Must be less than `BLOCK_SIZE`.
pub const CROSSFADE_SAMPLES: usize = 64;

/// Maximum interaural time delay, in samples. Derived from the Woodworth
/// formula's maximum for a 0.15 m head radius at 44.1 kHz, rounded up to a
/// power of two.
pub const HRTF_MAX_ITD: usize = 64;

/// Number of lanes each panner in the bank services.
pub const PANNER_MAX_LANES: usize = 4;

/// Size in bytes of one buffer page. Power of two; the trade-off is speed at
/// page boundaries, not fragmentation.
pub const BUFFER_CHUNK_SIZE: usize = 1 << 14;

/// Capacity of the property ring. Writes past this fall back to the command
/// path.
pub const PROPERTY_RING_CAPACITY: usize = 1024;

/// Maximum number of commands the audio thread will run in one block.
/// Overflow commands wait in the queue for subsequent blocks.
pub const COMMAND_BUDGET: usize = 1024;

/// Capacity of the per-context event queue. Events emitted while the queue
/// is full are dropped.
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Descriptor for a new context.
#[derive(Debug, Clone)]
pub struct SkylarkDesc {
    /// Output channel count for headless contexts. Device contexts negotiate
    /// their channel count at device open, capped at [`MAX_CHANNELS`].
    pub channels: u16,
}

impl Default for SkylarkDesc {
    fn default() -> Self {
        Self { channels: 2 }
    }
}

impl SkylarkDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }
}
