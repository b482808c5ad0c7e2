//! Motor state machine (C4, §4.4): the five-state lifecycle, startup
//! kick, soft-start ramps, frequency-dependent amplitude, smooth speed
//! switching, braking and relay staggering, all driven from one `tick`
//! call per control-core loop iteration.
use dsp::SynthesisParams;

use crate::config::{GlobalConfig, SpeedProfile, SpeedSlot};
use crate::exchange::{DDSState, ParameterExchange};
use crate::motor::braking;
use crate::motor::pitch::{clamp_pitch, target_frequency_hz};
use crate::motor::ramps::{fda_scale, kick_frequency, linear_ramp, soft_start_amplitude};
use crate::motor::relay::{RelayOutput, RelaySequencer};
use crate::motor::state::MotorState;
use crate::status::StatusBus;

/// A speed-switch ramp in progress while Running (§4.4 "Speed switching").
#[derive(Clone, Copy, Debug)]
struct SwitchRamp {
    from_hz: f32,
    to_hz: f32,
    started_ms: u32,
    duration_s: f32,
}

/// Owns every piece of runtime state the five-state lifecycle needs beyond
/// what lives in `GlobalConfig`/`SpeedProfile` (which the control core
/// mutates only via menu commits, CLI `set`, or a speed change -- never
/// this type). One `MotorController` per board; it is Core 0-exclusive
/// (§5 "Ownership").
pub struct MotorController {
    state: MotorState,
    speed_slot: SpeedSlot,
    pitch_pct: f32,
    phase_entered_ms: u32,
    /// Frozen target frequency/amplitude for the phase currently in
    /// progress (the operating point Stopping brakes from, and the value
    /// Starting ramps towards).
    target_freq_hz: f32,
    target_amp: f32,
    /// Frequency/amplitude actually being synthesized right now; tracked
    /// every tick so `stop()` always has a real operating point to brake
    /// from, even mid-kick or mid-ramp.
    current_freq_hz: f32,
    current_amp: f32,
    kick_phase_done: bool,
    amp_reduction_epoch_ms: Option<u32>,
    amp_reduced_latched: bool,
    switch_ramp: Option<SwitchRamp>,
    session_seconds: u32,
    total_seconds: u32,
    last_second_mark_ms: u32,
    relay: RelaySequencer,
    standby_relay_active: bool,
}

impl MotorController {
    /// §4.4 "Initial state: Standby unless `auto_boot = true`, then
    /// Stopped; if additionally `auto_start = true`, immediately
    /// transition to Starting."
    pub fn new(boot_ms: u32, auto_boot: bool, auto_start: bool) -> Self {
        let mut state = MotorState::initial(auto_boot);
        if auto_boot && auto_start {
            state = MotorState::Starting;
        }
        let phase_entered_ms = boot_ms;
        Self {
            state,
            speed_slot: SpeedSlot::Speed33,
            pitch_pct: 0.0,
            phase_entered_ms,
            target_freq_hz: 0.0,
            target_amp: 0.0,
            current_freq_hz: 0.0,
            current_amp: 0.0,
            kick_phase_done: true,
            amp_reduction_epoch_ms: None,
            amp_reduced_latched: false,
            switch_ramp: None,
            session_seconds: 0,
            total_seconds: 0,
            last_second_mark_ms: boot_ms,
            relay: RelaySequencer::new(boot_ms),
            standby_relay_active: false,
        }
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn speed_slot(&self) -> SpeedSlot {
        self.speed_slot
    }

    pub fn pitch_pct(&self) -> f32 {
        self.pitch_pct
    }

    /// §4.4 states table: `start` only fires from `Stopped`.
    pub fn start(&mut self, now_ms: u32) {
        if self.state != MotorState::Stopped {
            return;
        }
        self.state = MotorState::Starting;
        self.phase_entered_ms = now_ms;
        self.kick_phase_done = true;
        self.amp_reduced_latched = false;
        self.amp_reduction_epoch_ms = None;
        self.relay.begin_unmute(now_ms);
    }

    /// §4.4 states table: `stop` fires from `Running` or `Starting`.
    pub fn stop(&mut self, now_ms: u32) {
        if !matches!(self.state, MotorState::Running | MotorState::Starting) {
            return;
        }
        self.state = MotorState::Stopping;
        self.phase_entered_ms = now_ms;
        // Brake from wherever the drive actually is, not some idealized
        // target -- a stop mid-kick or mid-ramp must not snap the motor.
        self.target_freq_hz = self.current_freq_hz;
        self.target_amp = self.current_amp;
    }

    /// Wake from Standby, or request Standby from Stopped. Any other
    /// state ignores the call (§4.4 "Failure behaviour": no transition is
    /// retried, the controller never blocks).
    pub fn toggle_standby(&mut self, now_ms: u32) {
        match self.state {
            MotorState::Standby => {
                self.state = MotorState::Stopped;
                self.phase_entered_ms = now_ms;
            }
            MotorState::Stopped => {
                self.state = MotorState::Standby;
                self.phase_entered_ms = now_ms;
                self.standby_relay_active = false;
            }
            _ => {}
        }
    }

    /// §4.4 "Speed switching": cycling speed while Running starts a smooth
    /// ramp (if enabled) without leaving Running; otherwise it only takes
    /// effect the next time Starting begins.
    pub fn cycle_speed(&mut self, now_ms: u32, config: &GlobalConfig) {
        self.speed_slot = self.speed_slot.next();
        if self.state != MotorState::Running {
            return;
        }
        let new_target = target_frequency_hz(config.speed(self.speed_slot), self.pitch_pct);
        if config.smooth_switch_enable {
            self.switch_ramp = Some(SwitchRamp {
                from_hz: self.current_freq_hz,
                to_hz: new_target,
                started_ms: now_ms,
                duration_s: config.smooth_switch_ramp_s,
            });
        } else {
            self.switch_ramp = None;
            self.current_freq_hz = new_target;
        }
        self.target_freq_hz = new_target;
    }

    /// §4.4 "Pitch control"; CLI `p` resets pitch to 0 by calling this with
    /// `0.0`.
    pub fn set_pitch(&mut self, requested_pct: f32, range_pct: u8) {
        self.pitch_pct = clamp_pitch(requested_pct, range_pct);
    }

    /// Advance the state machine by one control-core tick. Publishes the
    /// resulting `DDSState`, updates the status bus and runtime counters,
    /// and drives the relay outputs. Must be called at least once per
    /// watchdog period (§4.4 "Failure behaviour").
    pub fn tick(
        &mut self,
        now_ms: u32,
        config: &GlobalConfig,
        exchange: &ParameterExchange,
        status: &StatusBus,
        relay_output: &mut impl RelayOutput,
    ) {
        if self.relay.in_power_on_grace(now_ms, config) {
            self.relay.mute_all(relay_output);
        } else {
            self.relay.update(now_ms, config.phase_mode, relay_output);
        }
        relay_output.set_standby_relay(standby_relay_level(self.standby_relay_active, config));

        let dds = match self.state {
            MotorState::Standby | MotorState::Stopped => self.tick_idle(),
            MotorState::Starting => self.tick_starting(now_ms, config),
            MotorState::Running => self.tick_running(now_ms, config),
            MotorState::Stopping => self.tick_stopping(now_ms, config, relay_output),
        };

        self.advance_counters(now_ms);

        exchange.publish(to_synthesis_params(config, self.speed_slot, &dds));
        status.set_motor_state(self.state);
        status.set_current_frequency(self.current_freq_hz);
        status.set_current_pitch(self.pitch_pct);
        status.set_runtime_counters(self.session_seconds, self.total_seconds);
    }

    fn tick_idle(&mut self) -> RawDds {
        self.current_freq_hz = 0.0;
        self.current_amp = 0.0;
        RawDds::silent()
    }

    fn tick_starting(&mut self, now_ms: u32, config: &GlobalConfig) -> RawDds {
        let speed = config.speed(self.speed_slot);
        let target_freq = target_frequency_hz(speed, self.pitch_pct);
        let target_amp = (config.max_amplitude_pct / 100.0).clamp(0.0, 1.0);
        self.target_freq_hz = target_freq;
        self.target_amp = target_amp;

        let t_s = elapsed_s(self.phase_entered_ms, now_ms);
        let (freq, kick_done) = kick_frequency(
            target_freq,
            speed.kick_mult,
            speed.kick_hold_duration_s,
            speed.kick_ramp_duration_s,
            t_s,
        );
        self.kick_phase_done = kick_done;

        let ramped_amp = soft_start_amplitude(config.soft_start_curve, target_amp, t_s, speed.soft_start_duration_s);
        let ramp_done = t_s >= speed.soft_start_duration_s;

        let scale = fda_scale(config.fda_percent, freq, target_freq);
        let effective_amp = (ramped_amp * scale).clamp(0.0, 1.0);

        self.current_freq_hz = freq;
        self.current_amp = effective_amp;

        if kick_done && ramp_done {
            self.state = MotorState::Running;
            self.phase_entered_ms = now_ms;
            self.amp_reduction_epoch_ms = Some(now_ms);
            self.amp_reduced_latched = false;
            self.current_freq_hz = target_freq;
            self.current_amp = target_amp;
        }

        RawDds {
            frequency_hz: self.current_freq_hz,
            amplitude: self.current_amp,
            enabled: true,
        }
    }

    fn tick_running(&mut self, now_ms: u32, config: &GlobalConfig) -> RawDds {
        let speed = config.speed(self.speed_slot);
        let pitch_target = target_frequency_hz(speed, self.pitch_pct);

        let freq = if let Some(ramp) = self.switch_ramp {
            let t_s = elapsed_s(ramp.started_ms, now_ms);
            let (freq, done) = linear_ramp(ramp.from_hz, ramp.to_hz, t_s, ramp.duration_s);
            if done {
                self.switch_ramp = None;
            }
            freq
        } else {
            self.target_freq_hz = pitch_target;
            pitch_target
        };

        let mut amp = self.target_amp;
        if let Some(epoch_ms) = self.amp_reduction_epoch_ms {
            let since_epoch_s = elapsed_s(epoch_ms, now_ms);
            if !self.amp_reduced_latched && since_epoch_s >= speed.reduced_amplitude_delay_s {
                self.amp_reduced_latched = true;
            }
        }
        if self.amp_reduced_latched {
            amp = (speed.reduced_amplitude_pct / 100.0) * self.target_amp;
        }

        self.current_freq_hz = freq;
        self.current_amp = amp;

        if !self.standby_relay_active && config.relay_linked_to_start_stop {
            self.standby_relay_active = true;
        }

        RawDds {
            frequency_hz: freq,
            amplitude: amp,
            enabled: true,
        }
    }

    fn tick_stopping(
        &mut self,
        now_ms: u32,
        config: &GlobalConfig,
        relay_output: &mut impl RelayOutput,
    ) -> RawDds {
        let t_s = elapsed_s(self.phase_entered_ms, now_ms);
        let out = braking::evaluate(config, self.target_freq_hz, self.target_amp, t_s);
        self.current_freq_hz = out.frequency_hz;
        self.current_amp = out.amplitude;

        if out.done {
            self.state = MotorState::Stopped;
            self.phase_entered_ms = now_ms;
            self.current_freq_hz = libm::fabsf(self.target_freq_hz);
            self.current_amp = 0.0;
            if config.relay_linked_to_start_stop {
                self.relay.mute_all(relay_output);
                self.standby_relay_active = false;
            }
            return RawDds::silent();
        }

        RawDds {
            frequency_hz: out.frequency_hz,
            amplitude: out.amplitude,
            enabled: true,
        }
    }

    fn advance_counters(&mut self, now_ms: u32) {
        while now_ms.saturating_sub(self.last_second_mark_ms) >= 1000 {
            self.last_second_mark_ms += 1000;
            self.total_seconds = self.total_seconds.saturating_add(1);
            if self.state == MotorState::Running {
                self.session_seconds = self.session_seconds.saturating_add(1);
            } else {
                self.session_seconds = 0;
            }
        }
    }

    /// A critical fault (§7 "Fatal / safety"): drive all mute relays
    /// inactive immediately, regardless of state-machine position. The
    /// state machine itself is not forced out of its current state.
    pub fn force_mute_for_critical_fault(&mut self, relay_output: &mut impl RelayOutput) {
        self.relay.mute_all(relay_output);
        self.standby_relay_active = false;
    }
}

/// Frequency/amplitude/enabled computed by a phase handler, before it is
/// combined with the active speed's phase offsets and filter config into
/// a publishable `DDSState`.
struct RawDds {
    frequency_hz: f32,
    amplitude: f32,
    enabled: bool,
}

impl RawDds {
    fn silent() -> Self {
        Self {
            frequency_hz: 0.0,
            amplitude: 0.0,
            enabled: false,
        }
    }
}

fn to_synthesis_params(config: &GlobalConfig, slot: SpeedSlot, raw: &RawDds) -> DDSState {
    let speed: &SpeedProfile = config.speed(slot);
    let mut offsets = [0u32; 4];
    for (i, offset) in offsets.iter_mut().enumerate() {
        *offset = degrees_to_turns(speed.phase_offsets_deg[i]);
    }
    SynthesisParams {
        frequency_hz: raw.frequency_hz,
        phase_offset_turns: offsets,
        amplitude: raw.amplitude,
        filter_kind: speed.filter_kind,
        iir_alpha: speed.iir_alpha,
        fir_profile: speed.fir_profile,
        phase_mode: config.phase_mode,
        enabled: raw.enabled,
    }
}

/// Scale a `[0, 360)` degree offset into `turns * 2^32`.
fn degrees_to_turns(deg: f32) -> u32 {
    let turns = deg / 360.0;
    (turns * (1u64 << 32) as f32) as u32
}

fn elapsed_s(start_ms: u32, now_ms: u32) -> f32 {
    now_ms.saturating_sub(start_ms) as f32 / 1000.0
}

fn standby_relay_level(active: bool, config: &GlobalConfig) -> bool {
    active == config.relay_active_high
}
