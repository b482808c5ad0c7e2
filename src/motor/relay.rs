//! Staggered relay sequencing (§4.4 "Relay sequencing"). Owned exclusively
//! by the control core (§5): nothing else ever asserts these lines.
use crate::config::GlobalConfig;
use crate::external::pins::PHASE_MUTE;

/// Milliseconds between successive per-phase mute-line releases on unmute.
pub const UNMUTE_STAGGER_MS: u32 = 100;

/// Sink for the physical relay outputs. A real board implements this over
/// GPIO; tests use a recording fake.
pub trait RelayOutput {
    fn set_standby_relay(&mut self, active: bool);
    /// `channel` indexes `PHASE_MUTE`; `muted` true means the mute line is
    /// asserted (phase silenced), independent of `active_high` polarity --
    /// the implementation applies polarity, this trait speaks in logical
    /// terms.
    fn set_phase_mute(&mut self, channel: usize, muted: bool);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SequenceState {
    Idle,
    /// Unmuting: releasing channels one at a time. Holds the index of the
    /// next channel to release and the deadline (ms) for it.
    Unmuting { next_channel: usize, next_at_ms: u32 },
}

/// Drives the staggered unmute staircase and the power-on grace period.
/// Muting itself is immediate (§4.4: "on mute, assert all mute lines
/// simultaneously") and does not need sequencing state.
pub struct RelaySequencer {
    state: SequenceState,
    boot_ms: u32,
}

impl RelaySequencer {
    pub fn new(boot_ms: u32) -> Self {
        Self {
            state: SequenceState::Idle,
            boot_ms,
        }
    }

    /// True while still inside the power-on mute grace period; callers
    /// must force all mute lines asserted regardless of command (§4.4).
    pub fn in_power_on_grace(&self, now_ms: u32, config: &GlobalConfig) -> bool {
        let grace_ms = (config.power_on_mute_delay_s * 1000.0) as u32;
        now_ms.saturating_sub(self.boot_ms) < grace_ms
    }

    /// Assert all mute lines simultaneously and cancel any in-flight
    /// staircase.
    pub fn mute_all(&mut self, output: &mut impl RelayOutput) {
        for channel in 0..PHASE_MUTE.len() {
            output.set_phase_mute(channel, true);
        }
        self.state = SequenceState::Idle;
    }

    /// Begin releasing mute lines one at a time, 100 ms apart, up to
    /// `phase_mode` channels.
    pub fn begin_unmute(&mut self, now_ms: u32) {
        self.state = SequenceState::Unmuting {
            next_channel: 0,
            next_at_ms: now_ms,
        };
    }

    /// Advance the staircase; call every control-core tick.
    pub fn update(&mut self, now_ms: u32, phase_mode: u8, output: &mut impl RelayOutput) {
        while let SequenceState::Unmuting {
            next_channel,
            next_at_ms,
        } = self.state
        {
            if next_channel >= phase_mode as usize || next_channel >= PHASE_MUTE.len() {
                self.state = SequenceState::Idle;
                break;
            }
            if now_ms < next_at_ms {
                break;
            }
            output.set_phase_mute(next_channel, false);
            self.state = SequenceState::Unmuting {
                next_channel: next_channel + 1,
                next_at_ms: next_at_ms + UNMUTE_STAGGER_MS,
            };
        }
    }

    pub fn is_sequencing(&self) -> bool {
        matches!(self.state, SequenceState::Unmuting { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingOutput {
        standby: bool,
        mute: [bool; 4],
    }

    impl RelayOutput for RecordingOutput {
        fn set_standby_relay(&mut self, active: bool) {
            self.standby = active;
        }
        fn set_phase_mute(&mut self, channel: usize, muted: bool) {
            self.mute[channel] = muted;
        }
    }

    #[test]
    fn mute_all_asserts_every_channel_immediately() {
        let mut output = RecordingOutput::default();
        let mut seq = RelaySequencer::new(0);
        seq.begin_unmute(0);
        seq.mute_all(&mut output);
        assert_eq!(output.mute, [true; 4]);
        assert!(!seq.is_sequencing());
    }

    #[test]
    fn unmute_releases_one_channel_per_stagger_interval() {
        let mut output = RecordingOutput::default();
        output.mute = [true; 4];
        let mut seq = RelaySequencer::new(0);
        seq.begin_unmute(1_000);

        seq.update(1_000, 4, &mut output);
        assert_eq!(output.mute, [false, true, true, true]);

        seq.update(1_050, 4, &mut output);
        assert_eq!(output.mute, [false, true, true, true]);

        seq.update(1_100, 4, &mut output);
        assert_eq!(output.mute, [false, false, true, true]);

        seq.update(1_300, 4, &mut output);
        assert_eq!(output.mute, [false, false, false, false]);
        assert!(!seq.is_sequencing());
    }

    #[test]
    fn unmute_stops_at_phase_mode_channel_count() {
        let mut output = RecordingOutput::default();
        output.mute = [true; 4];
        let mut seq = RelaySequencer::new(0);
        seq.begin_unmute(0);
        seq.update(1_000, 2, &mut output);
        assert_eq!(output.mute, [false, false, true, true]);
        assert!(!seq.is_sequencing());
    }

    #[test]
    fn power_on_grace_expires_after_configured_delay() {
        let mut config = GlobalConfig::default();
        config.power_on_mute_delay_s = 1.0;
        let seq = RelaySequencer::new(500);
        assert!(seq.in_power_on_grace(1_000, &config));
        assert!(!seq.in_power_on_grace(1_600, &config));
    }
}
