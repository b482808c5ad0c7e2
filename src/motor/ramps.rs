//! Pure time-domain ramp math for the Starting/Running phases (§4.4):
//! soft-start amplitude curves, the startup kick profile,
//! frequency-dependent amplitude scaling, and linear ramps for smooth
//! speed switching. Kept free of any state-machine bookkeeping so it can
//! be unit tested against closed-form values.
use core::f32::consts::PI;

use crate::config::SoftStartCurve;

/// Fraction of `target` reached at elapsed time `t` (seconds) into a ramp
/// of total duration `duration_s`. Saturates to `target` at/after
/// `duration_s`, and to `0.0` for `duration_s <= 0`.
pub fn soft_start_amplitude(curve: SoftStartCurve, target: f32, t_s: f32, duration_s: f32) -> f32 {
    if duration_s <= 0.0 {
        return target;
    }
    let frac = (t_s / duration_s).clamp(0.0, 1.0);
    let shaped = match curve {
        SoftStartCurve::Linear => frac,
        SoftStartCurve::SCurve => 0.5 * (1.0 - libm::cosf(PI * frac)),
    };
    target * shaped
}

/// Frequency during the kick phase: held at `target_freq * kick_mult`
/// until `kick_hold_duration_s`, then linearly ramped down to
/// `target_freq` over `kick_ramp_duration_s` (or an immediate jump if that
/// duration is zero). Returns `(frequency_hz, kick_phase_done)`.
pub fn kick_frequency(
    target_freq: f32,
    kick_mult: u8,
    kick_hold_duration_s: f32,
    kick_ramp_duration_s: f32,
    t_s: f32,
) -> (f32, bool) {
    if kick_mult <= 1 {
        return (target_freq, true);
    }
    let kick_freq = target_freq * kick_mult as f32;
    if t_s < kick_hold_duration_s {
        return (kick_freq, false);
    }
    let ramp_t = t_s - kick_hold_duration_s;
    if kick_ramp_duration_s <= 0.0 || ramp_t >= kick_ramp_duration_s {
        return (target_freq, true);
    }
    let frac = ramp_t / kick_ramp_duration_s;
    (kick_freq + (target_freq - kick_freq) * frac, false)
}

/// Frequency-Dependent Amplitude scale factor (§4.4 step 5), applied to an
/// already soft-start-ramped amplitude. `fda_percent` in `[0, 100]`.
/// `current_freq`/`target_freq` in Hz; `target_freq` must be nonzero.
pub fn fda_scale(fda_percent: f32, current_freq: f32, target_freq: f32) -> f32 {
    let r = (fda_percent / 100.0).clamp(0.0, 1.0);
    let q = if target_freq.abs() < f32::EPSILON {
        1.0
    } else {
        (current_freq / target_freq).clamp(0.0, 1.0)
    };
    r + (1.0 - r) * q
}

/// A linear ramp from `from` to `to` over `duration_s`, evaluated at `t_s`.
/// Used for smooth speed switching and the Ramp-mode brake frequency sweep.
pub fn linear_ramp(from: f32, to: f32, t_s: f32, duration_s: f32) -> (f32, bool) {
    if duration_s <= 0.0 {
        return (to, true);
    }
    let frac = (t_s / duration_s).clamp(0.0, 1.0);
    (from + (to - from) * frac, frac >= 1.0)
}
