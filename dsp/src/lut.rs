//! Waveform look-up table (C1).
//!
//! A single period of a sine wave, precomputed once at startup and probed
//! with the high bits of a 32-bit phase accumulator. The amplitude scalar
//! is applied by the caller *after* interpolation, so the table itself
//! stays amplitude-free -- matching the teacher's own separation between
//! `cossin`'s fixed-point trig core and the IIR/gain stages that use it.
use crate::design_parameters::{LUT_INTERP_BITS, LUT_SIZE, LUT_SIZE_LOG2};

/// Peak magnitude of a table sample. Samples span `[-511, 511]`, matching
/// the 10-bit-range requirement in the component design.
pub const LUT_AMPLITUDE: i32 = 511;

/// A precomputed one-period sine table with phase-accumulator indexing.
pub struct Lut {
    table: [i16; LUT_SIZE],
}

impl Lut {
    /// Generate the table from `sin(2*pi*i/N)` scaled to `±LUT_AMPLITUDE`.
    ///
    /// This is the one allocation-free, `O(N)` setup cost paid once at
    /// boot; the synthesis core never recomputes table entries.
    pub fn generate() -> Self {
        let mut table = [0i16; LUT_SIZE];
        for (i, slot) in table.iter_mut().enumerate() {
            let angle = 2.0 * core::f32::consts::PI * (i as f32) / (LUT_SIZE as f32);
            *slot = (libm::sinf(angle) * LUT_AMPLITUDE as f32).round() as i16;
        }
        Self { table }
    }

    /// Sample the table at a 32-bit fractional-turn phase, linearly
    /// interpolating between the indexed sample and its successor (the
    /// table wraps at its end).
    ///
    /// The high `log2(LUT_SIZE)` bits of `phase` select the table index;
    /// the next `LUT_INTERP_BITS` bits form the interpolation fraction.
    pub fn interpolate(&self, phase: u32) -> i32 {
        let index_bits = LUT_SIZE_LOG2;
        let index = (phase >> (32 - index_bits)) as usize;
        let frac_mask = (1u32 << LUT_INTERP_BITS) - 1;
        let frac = (phase >> (32 - index_bits - LUT_INTERP_BITS)) & frac_mask;

        let a = self.table[index] as i32;
        let b = self.table[(index + 1) % LUT_SIZE] as i32;

        let frac_scale = 1i32 << LUT_INTERP_BITS;
        a + ((b - a) * frac as i32) / frac_scale
    }

    #[cfg(test)]
    pub fn raw(&self, index: usize) -> i16 {
        self.table[index]
    }
}
