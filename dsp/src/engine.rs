//! DDS synthesis engine (C2): advances the shared phase accumulator,
//! samples up to four phase-offset channels through the waveform LUT,
//! runs each through its own filter history, and packs the result into
//! DMA-ready 32-bit PWM compare words.
//!
//! Deliberately free of any peripheral access -- the refill task in the
//! firmware binary owns the DMA buffers and ISR signalling; this module
//! only computes what goes into them, so it is host-testable the same way
//! `lut`/`accu`/`filter` are.
use crate::accu::{phase_increment, Accu};
use crate::design_parameters::{
    DDS_BUFFER_SIZE, DDS_CHANNEL_COUNT, PWM_COMPARE_MAX, PWM_COMPARE_MIDPOINT,
};
use crate::filter::{ChannelFilter, FilterKind};
use crate::fir::FirProfile;
use crate::lut::{Lut, LUT_AMPLITUDE};

/// The parameter block the synthesis engine consumes for one buffer
/// refill. Field-for-field identical to the firmware's cross-core
/// `DDSState` (§4.2/§4.3) -- kept as a separate type here so this crate
/// never depends on the root binary crate.
#[derive(Clone, Copy, Debug)]
pub struct SynthesisParams {
    /// Signed output frequency in Hz; negative reverses phase-increment
    /// direction (pulse-brake phase-sequence reversal, REDESIGN FLAGS (b)).
    pub frequency_hz: f32,
    /// Per-channel phase offset as a fraction of a full turn, scaled to
    /// `turns * 2^32`.
    pub phase_offset_turns: [u32; DDS_CHANNEL_COUNT],
    pub amplitude: f32,
    pub filter_kind: FilterKind,
    pub iir_alpha: f32,
    pub fir_profile: FirProfile,
    /// Leading channel count that synthesizes non-zero samples (REDESIGN
    /// FLAGS (c): phase mode is applied at synthesis time).
    pub phase_mode: u8,
    pub enabled: bool,
}

impl SynthesisParams {
    pub const fn silent() -> Self {
        Self {
            frequency_hz: 0.0,
            phase_offset_turns: [0; DDS_CHANNEL_COUNT],
            amplitude: 0.0,
            filter_kind: FilterKind::None,
            iir_alpha: 0.1,
            fir_profile: FirProfile::Gentle,
            phase_mode: DDS_CHANNEL_COUNT as u8,
            enabled: false,
        }
    }
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self::silent()
    }
}

/// One DMA half's worth of packed PWM compare words for a two-channel
/// slice: the low 16 bits hold the first channel's compare value, the
/// high 16 bits the second's, matching how an RP2040 PWM slice's CC
/// register packs its A/B sub-channels into one 32-bit write.
pub type SliceBuffer = [u32; DDS_BUFFER_SIZE];

/// Owns the master phase accumulator and the four independent per-channel
/// filter histories. The LUT is read-only and shared, so it is borrowed
/// rather than owned.
pub struct DdsEngine<'lut> {
    lut: &'lut Lut,
    master_phase: Accu,
    filters: [ChannelFilter; DDS_CHANNEL_COUNT],
}

impl<'lut> DdsEngine<'lut> {
    pub fn new(lut: &'lut Lut) -> Self {
        Self {
            lut,
            master_phase: Accu::new(),
            filters: [ChannelFilter::default(); DDS_CHANNEL_COUNT],
        }
    }

    /// Reconfigure every channel's filter. Per-channel history resets only
    /// when `kind` changes (§4.2 "Filter state is reset when the filter
    /// kind changes"); `ChannelFilter::reconfigure` already implements that
    /// rule, so the same call is safe to make every buffer.
    fn sync_filters(&mut self, kind: FilterKind, alpha: f32, profile: FirProfile) {
        for filter in &mut self.filters {
            filter.reconfigure(kind, alpha, profile);
        }
    }

    /// Synthesize one buffer's worth of samples from `params`, writing
    /// packed slice-A (channels 0,1) and slice-B (channels 2,3) DMA words.
    ///
    /// `params` is read once at the start of the buffer (the refill
    /// protocol's step 2 already promoted pending to active before this is
    /// called), so the whole buffer is synthesized from one consistent
    /// parameter set -- no publish can tear a buffer in two (§4.2
    /// "Frequency-change semantics").
    pub fn refill(
        &mut self,
        params: &SynthesisParams,
        slice_a: &mut SliceBuffer,
        slice_b: &mut SliceBuffer,
    ) {
        self.sync_filters(params.filter_kind, params.iir_alpha, params.fir_profile);

        if !params.enabled {
            // §4.2 "Disabled state": centre-code words, phase frozen,
            // filter histories retained for a glitch-free re-enable.
            let silent_word = pack(PWM_COMPARE_MIDPOINT as u16, PWM_COMPARE_MIDPOINT as u16);
            slice_a.fill(silent_word);
            slice_b.fill(silent_word);
            return;
        }

        let reverse = params.frequency_hz < 0.0;
        let increment = phase_increment(params.frequency_hz);
        let phase_mode = (params.phase_mode as usize).min(DDS_CHANNEL_COUNT);

        for tick in 0..DDS_BUFFER_SIZE {
            let mut compare = [PWM_COMPARE_MIDPOINT as u16; DDS_CHANNEL_COUNT];
            for (channel, slot) in compare.iter_mut().enumerate() {
                if channel >= phase_mode {
                    continue;
                }
                let phase = self
                    .master_phase
                    .phase()
                    .wrapping_add(params.phase_offset_turns[channel]);
                let raw = self.lut.interpolate(phase) as f32 * params.amplitude;
                let filtered = self.filters[channel].update(raw);
                *slot = to_compare(filtered);
            }
            self.master_phase.advance(increment, reverse);

            slice_a[tick] = pack(compare[0], compare[1]);
            slice_b[tick] = pack(compare[2], compare[3]);
        }
    }
}

/// Apply the +512 DC offset and clamp into `[0, PWM_COMPARE_MAX]` (§4.2 (c)).
fn to_compare(sample: f32) -> u16 {
    let code = sample.round() as i32 + PWM_COMPARE_MIDPOINT;
    code.clamp(0, PWM_COMPARE_MAX) as u16
}

fn pack(low: u16, high: u16) -> u32 {
    (low as u32) | ((high as u32) << 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unpack(word: u32) -> (u16, u16) {
        ((word & 0xFFFF) as u16, (word >> 16) as u16)
    }

    #[test]
    fn disabled_engine_emits_centre_code_and_freezes_phase() {
        let lut = Lut::generate();
        let mut engine = DdsEngine::new(&lut);
        let mut a = [0u32; DDS_BUFFER_SIZE];
        let mut b = [0u32; DDS_BUFFER_SIZE];
        let params = SynthesisParams::silent();
        engine.refill(&params, &mut a, &mut b);
        for word in a.iter().chain(b.iter()) {
            let (lo, hi) = unpack(*word);
            assert_eq!(lo, PWM_COMPARE_MIDPOINT as u16);
            assert_eq!(hi, PWM_COMPARE_MIDPOINT as u16);
        }
        assert_eq!(engine.master_phase.phase(), 0);
    }

    #[test]
    fn enabled_engine_advances_master_phase_by_k_increments() {
        let lut = Lut::generate();
        let mut engine = DdsEngine::new(&lut);
        let mut a = [0u32; DDS_BUFFER_SIZE];
        let mut b = [0u32; DDS_BUFFER_SIZE];
        let mut params = SynthesisParams::silent();
        params.enabled = true;
        params.amplitude = 1.0;
        params.frequency_hz = 440.0;
        engine.refill(&params, &mut a, &mut b);

        let expected = phase_increment(440.0).wrapping_mul(DDS_BUFFER_SIZE as u32);
        assert_eq!(engine.master_phase.phase(), expected);
    }

    #[test]
    fn samples_stay_within_compare_bounds() {
        let lut = Lut::generate();
        let mut engine = DdsEngine::new(&lut);
        let mut a = [0u32; DDS_BUFFER_SIZE];
        let mut b = [0u32; DDS_BUFFER_SIZE];
        let mut params = SynthesisParams::silent();
        params.enabled = true;
        params.amplitude = 1.0;
        params.frequency_hz = 1000.0;
        engine.refill(&params, &mut a, &mut b);

        for word in a.iter().chain(b.iter()) {
            let (lo, hi) = unpack(*word);
            assert!(lo as i32 <= PWM_COMPARE_MAX);
            assert!(hi as i32 <= PWM_COMPARE_MAX);
        }
    }

    #[test]
    fn channel_1_leads_channel_0_by_its_configured_phase_offset() {
        let lut = Lut::generate();
        let mut engine = DdsEngine::new(&lut);
        let mut a = [0u32; DDS_BUFFER_SIZE];
        let mut b = [0u32; DDS_BUFFER_SIZE];
        let mut params = SynthesisParams::silent();
        params.enabled = true;
        params.amplitude = 1.0;
        params.frequency_hz = 100.0;
        // Quarter-turn offset on channel 1.
        params.phase_offset_turns[1] = 1u32 << 30;
        engine.refill(&params, &mut a, &mut b);

        // With a quarter-turn offset and amplitude 1, the two channels'
        // first-sample codes should differ (distinct LUT phase).
        let (ch0, ch1) = unpack(a[0]);
        assert_ne!(ch0, ch1);
    }

    #[test]
    fn phase_mode_zeroes_channels_at_or_above_the_configured_count() {
        let lut = Lut::generate();
        let mut engine = DdsEngine::new(&lut);
        let mut a = [0u32; DDS_BUFFER_SIZE];
        let mut b = [0u32; DDS_BUFFER_SIZE];
        let mut params = SynthesisParams::silent();
        params.enabled = true;
        params.amplitude = 1.0;
        params.frequency_hz = 100.0;
        params.phase_mode = 2;
        engine.refill(&params, &mut a, &mut b);

        for word in b.iter() {
            let (lo, hi) = unpack(*word);
            assert_eq!(lo, PWM_COMPARE_MIDPOINT as u16);
            assert_eq!(hi, PWM_COMPARE_MIDPOINT as u16);
        }
    }

    #[test]
    fn reversed_frequency_advances_phase_backwards() {
        let lut = Lut::generate();
        let mut forward = DdsEngine::new(&lut);
        let mut reverse = DdsEngine::new(&lut);
        let mut a1 = [0u32; DDS_BUFFER_SIZE];
        let mut b1 = [0u32; DDS_BUFFER_SIZE];
        let mut a2 = [0u32; DDS_BUFFER_SIZE];
        let mut b2 = [0u32; DDS_BUFFER_SIZE];

        let mut forward_params = SynthesisParams::silent();
        forward_params.enabled = true;
        forward_params.amplitude = 1.0;
        forward_params.frequency_hz = 50.0;
        let mut reverse_params = forward_params;
        reverse_params.frequency_hz = -50.0;

        forward.refill(&forward_params, &mut a1, &mut b1);
        reverse.refill(&reverse_params, &mut a2, &mut b2);

        assert_eq!(
            forward.master_phase.phase(),
            reverse.master_phase.phase().wrapping_neg()
        );
    }

    #[test]
    fn sample_magnitude_respects_amplitude_scaling() {
        let lut = Lut::generate();
        let mut engine = DdsEngine::new(&lut);
        let mut a = [0u32; DDS_BUFFER_SIZE];
        let mut b = [0u32; DDS_BUFFER_SIZE];
        let mut params = SynthesisParams::silent();
        params.enabled = true;
        params.amplitude = 0.5;
        params.frequency_hz = 50.0;
        engine.refill(&params, &mut a, &mut b);

        for word in a.iter() {
            let (lo, _) = unpack(*word);
            let signed = lo as i32 - PWM_COMPARE_MIDPOINT;
            assert!(signed.abs() <= (LUT_AMPLITUDE as f32 * 0.5) as i32 + 2);
        }
    }
}
