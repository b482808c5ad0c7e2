//! 8-tap FIR smoothing filter for DDS channel output, with three
//! build-time coefficient profiles of increasing stopband aggressiveness.
use crate::design_parameters::FIR_TAPS;

/// Selects one of the fixed coefficient vectors baked in at build time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum FirProfile {
    #[default]
    Gentle,
    Medium,
    Aggressive,
}

impl FirProfile {
    pub fn coefficients(self) -> &'static [f32; FIR_TAPS] {
        match self {
            // Near-unity passband, shallow rolloff -- a lightly windowed moving average.
            FirProfile::Gentle => &GENTLE,
            // Moderate rolloff, Hamming-windowed lowpass.
            FirProfile::Medium => &MEDIUM,
            // Steep rolloff, Blackman-windowed lowpass for maximum stopband rejection.
            FirProfile::Aggressive => &AGGRESSIVE,
        }
    }
}

const GENTLE: [f32; FIR_TAPS] = [
    0.06, 0.10, 0.14, 0.20, 0.20, 0.14, 0.10, 0.06,
];

const MEDIUM: [f32; FIR_TAPS] = [
    0.02, 0.08, 0.16, 0.24, 0.24, 0.16, 0.08, 0.02,
];

const AGGRESSIVE: [f32; FIR_TAPS] = [
    0.01, 0.04, 0.15, 0.30, 0.30, 0.15, 0.04, 0.01,
];

/// A direct-form 8-tap convolution filter with a per-channel ring buffer.
#[derive(Clone, Copy, Debug)]
pub struct FirFilter {
    profile: FirProfile,
    history: [f32; FIR_TAPS],
    write_index: usize,
}

impl FirFilter {
    pub fn new(profile: FirProfile) -> Self {
        Self {
            profile,
            history: [0.0; FIR_TAPS],
            write_index: 0,
        }
    }

    pub fn set_profile(&mut self, profile: FirProfile) {
        self.profile = profile;
    }

    pub fn update(&mut self, x: f32) -> f32 {
        self.history[self.write_index] = x;
        let coeffs = self.profile.coefficients();

        let mut acc = 0.0f32;
        for tap in 0..FIR_TAPS {
            // history[write_index] is the newest sample; walk backwards through the ring.
            let sample_index = (self.write_index + FIR_TAPS - tap) % FIR_TAPS;
            acc += coeffs[tap] * self.history[sample_index];
        }

        self.write_index = (self.write_index + 1) % FIR_TAPS;
        acc
    }

    pub fn reset(&mut self) {
        self.history = [0.0; FIR_TAPS];
        self.write_index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficients_sum_to_unity_gain() {
        for profile in [FirProfile::Gentle, FirProfile::Medium, FirProfile::Aggressive] {
            let sum: f32 = profile.coefficients().iter().sum();
            assert!((sum - 1.0).abs() < 1e-6, "{:?} sums to {}", profile, sum);
        }
    }

    #[test]
    fn constant_input_settles_to_same_constant() {
        for profile in [FirProfile::Gentle, FirProfile::Medium, FirProfile::Aggressive] {
            let mut f = FirFilter::new(profile);
            let mut last = 0.0;
            for _ in 0..16 {
                last = f.update(5.0);
            }
            assert!((last - 5.0).abs() < 1e-4);
        }
    }

    #[test]
    fn reset_clears_ring_buffer() {
        let mut f = FirFilter::new(FirProfile::Medium);
        for _ in 0..8 {
            f.update(10.0);
        }
        f.reset();
        assert_eq!(f.update(0.0), 0.0);
    }
}
