//! Stopping-phase braking modes (§4.4 "Stopping phase"): Off (amplitude
//! ramp-down only), Ramp (frequency sweep + amplitude ramp-down), and
//! Pulse (reversed-phase torque pulses). Each mode's `evaluate` is a pure
//! function of elapsed time so the controller can call it every tick
//! without retaining mode-specific state beyond `t_s`.
use crate::config::{BrakeMode, GlobalConfig};
use crate::motor::ramps::linear_ramp;

/// What the DDS should be driven with, and whether the brake has finished
/// (at which point the controller mutes relays and transitions to Stopped).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrakeOutput {
    pub frequency_hz: f32,
    pub amplitude: f32,
    pub done: bool,
}

/// Evaluate the configured brake mode at elapsed time `t_s` since Stopping
/// began. `target_freq`/`target_amp` are the values the drive was running
/// at when Stopping was entered.
pub fn evaluate(
    config: &GlobalConfig,
    target_freq: f32,
    target_amp: f32,
    t_s: f32,
) -> BrakeOutput {
    match config.brake_mode {
        BrakeMode::Off => {
            let (amp, done) = linear_ramp(target_amp, 0.0, t_s, config.brake_duration_s);
            BrakeOutput {
                frequency_hz: target_freq,
                amplitude: amp,
                done,
            }
        }
        BrakeMode::Ramp => {
            let (freq, freq_done) = linear_ramp(
                config.brake_ramp_start_freq_hz,
                config.brake_ramp_stop_freq_hz,
                t_s,
                config.brake_duration_s,
            );
            let (amp, amp_done) = linear_ramp(target_amp, 0.0, t_s, config.brake_duration_s);
            BrakeOutput {
                frequency_hz: freq,
                amplitude: amp,
                done: freq_done && amp_done,
            }
        }
        BrakeMode::Pulse => {
            let done = t_s >= config.brake_duration_s;
            let gap = config.brake_pulse_gap_s.max(0.001);
            let cycle = t_s.rem_euclid(2.0 * gap);
            let amplitude = if cycle < gap { target_amp } else { 0.0 };
            BrakeOutput {
                frequency_hz: -target_freq,
                amplitude,
                done,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_mode_ramps_amplitude_to_zero_and_keeps_frequency() {
        let mut config = GlobalConfig::default();
        config.brake_mode = BrakeMode::Off;
        config.brake_duration_s = 2.0;
        let out = evaluate(&config, 50.0, 0.8, 2.0);
        assert_eq!(out.frequency_hz, 50.0);
        assert!((out.amplitude).abs() < 1e-6);
        assert!(out.done);
    }

    #[test]
    fn ramp_mode_sweeps_frequency_between_configured_bounds() {
        let mut config = GlobalConfig::default();
        config.brake_mode = BrakeMode::Ramp;
        config.brake_duration_s = 2.0;
        config.brake_ramp_start_freq_hz = 60.0;
        config.brake_ramp_stop_freq_hz = 10.0;
        let out = evaluate(&config, 50.0, 0.8, 0.0);
        assert!((out.frequency_hz - 60.0).abs() < 1e-6);
        let out = evaluate(&config, 50.0, 0.8, 2.0);
        assert!((out.frequency_hz - 10.0).abs() < 1e-6);
        assert!(out.done);
    }

    #[test]
    fn pulse_mode_reverses_frequency_and_toggles_amplitude() {
        let mut config = GlobalConfig::default();
        config.brake_mode = BrakeMode::Pulse;
        config.brake_duration_s = 1.0;
        config.brake_pulse_gap_s = 0.25;
        let out = evaluate(&config, 50.0, 0.8, 0.1);
        assert_eq!(out.frequency_hz, -50.0);
        assert_eq!(out.amplitude, 0.8);
        let out = evaluate(&config, 50.0, 0.8, 0.3);
        assert_eq!(out.amplitude, 0.0);
        assert!(!out.done);
        let out = evaluate(&config, 50.0, 0.8, 1.0);
        assert!(out.done);
    }
}
