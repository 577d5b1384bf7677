//! Fixed audio parameters
//!
//! These are the defaults the configuration falls back to. The queue capacity
//! is a const generic of [`nether_edgeq`] and cannot be changed at runtime.

pub use nether_edgeq::FIFO_SIZE;

/// Sound channel carrying the PC speaker
pub const CHANNEL_PCSPEAKER: u8 = 0;

/// Reference clock of the emulated machine (4.77 MHz)
pub const PC_CLOCK_HZ: u32 = 4_770_000;

/// Output sample rate
pub const SAMPLE_RATE: u32 = 16_384;

/// Samples in one playback buffer
pub const SAMPLES_PER_FRAME: usize = 256;

/// Both playback buffers together
pub const BUFFER_SIZE: usize = SAMPLES_PER_FRAME * 2;

/// Whole reference-clock cycles per output sample (291)
pub const CLOCKS_PER_SAMPLE: u32 = PC_CLOCK_HZ / SAMPLE_RATE;

/// PCM code for a centred (silent) signal
pub const PCM_CENTER: u8 = 128;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_constants() {
        assert_eq!(CLOCKS_PER_SAMPLE, 291);
        assert_eq!(BUFFER_SIZE, 512);
        assert_eq!(FIFO_SIZE, 512);
    }
}
