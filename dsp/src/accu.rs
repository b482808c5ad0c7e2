//! Phase accumulator driving direct digital synthesis.
//!
//! Mirrors the teacher's `Accu` helper (see `dsp/benches/micro.rs`'s use of
//! `dsp::{atan2, cossin}` style fixed-point phase machinery): a 32-bit
//! counter that advances by a constant increment every tick and wraps.
use crate::design_parameters::PWM_FREQUENCY_HZ;

/// A free-running 32-bit phase accumulator.
#[derive(Clone, Copy, Debug, Default)]
pub struct Accu {
    phase: u32,
}

impl Accu {
    pub const fn new() -> Self {
        Self { phase: 0 }
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }

    /// Advance the accumulator by `increment` ticks, honoring `reverse` to
    /// support the pulse-brake phase-sequence reversal (REDESIGN FLAGS (b)).
    pub fn advance(&mut self, increment: u32, reverse: bool) -> u32 {
        self.phase = if reverse {
            self.phase.wrapping_sub(increment)
        } else {
            self.phase.wrapping_add(increment)
        };
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = 0;
    }
}

/// Compute a 32-bit phase increment for `frequency_hz` at the DDS sample
/// rate `PWM_FREQUENCY_HZ`.
///
/// `phase_increment = round(frequency_hz * 2^32 / f_PWM)`. The sign of
/// `frequency_hz` is not encoded here -- callers track direction via
/// [`Accu::advance`]'s `reverse` flag so the magnitude always fits a `u32`.
pub fn phase_increment(frequency_hz: f32) -> u32 {
    let magnitude = libm::fabsf(frequency_hz);
    let scale = (1u64 << 32) as f32 / PWM_FREQUENCY_HZ as f32;
    libm::roundf(magnitude * scale) as u32
}
