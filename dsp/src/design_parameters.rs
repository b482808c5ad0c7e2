//! Shared compile-time constants for the DDS/waveform synthesis path.
//!
//! Named and organized the way the teacher firmware keeps its own
//! `hardware::design_parameters` module: a single place that both the
//! synthesis core and the control core can agree on without duplicating
//! magic numbers.

/// PWM carrier frequency driving the DDS sample clock, in Hz.
pub const PWM_FREQUENCY_HZ: u32 = 50_000;

/// Number of 32-bit DMA words synthesized per refill (one DDS buffer half).
pub const DDS_BUFFER_SIZE: usize = 256;
pub const DDS_BUFFER_SIZE_LOG2: u32 = 8;

/// PWM compare value range. Samples are clamped to this after the +512 DC offset.
pub const PWM_COMPARE_MAX: i32 = 1023;
pub const PWM_COMPARE_MIDPOINT: i32 = 512;

/// Number of independently phase-shiftable synthesis channels.
pub const DDS_CHANNEL_COUNT: usize = 4;

/// Number of FIR taps per channel filter.
pub const FIR_TAPS: usize = 8;

#[cfg(feature = "lut16384")]
pub const LUT_SIZE: usize = 16384;
#[cfg(feature = "lut8192")]
pub const LUT_SIZE: usize = 8192;
#[cfg(all(feature = "lut4096", not(feature = "lut8192"), not(feature = "lut16384")))]
pub const LUT_SIZE: usize = 4096;
#[cfg(all(
    feature = "lut2048",
    not(feature = "lut4096"),
    not(feature = "lut8192"),
    not(feature = "lut16384")
))]
pub const LUT_SIZE: usize = 2048;
#[cfg(all(
    feature = "lut1024",
    not(feature = "lut2048"),
    not(feature = "lut4096"),
    not(feature = "lut8192"),
    not(feature = "lut16384")
))]
pub const LUT_SIZE: usize = 1024;

pub const LUT_SIZE_LOG2: u32 = LUT_SIZE.trailing_zeros();

/// Bits of the 32-bit phase accumulator consumed by the linear-interpolation
/// fraction between a LUT sample and its successor.
pub const LUT_INTERP_BITS: u32 = 10;

const _: () = assert!(LUT_SIZE.is_power_of_two());
const _: () = assert!(LUT_SIZE_LOG2 + LUT_INTERP_BITS <= 32);
