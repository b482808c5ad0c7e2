//! Turntable motor drive core (§1-§9): DDS-synthesized multi-phase PWM
//! output, the five-state motor lifecycle, lock-free dual-core parameter
//! handoff, and the external contracts (persistence, input, UI, timebase)
//! those two own. Everything in this crate is hardware-agnostic except
//! `hardware`, which binds the contracts to the RP2040 peripherals named
//! in §6; `dsp` and `console` are separate workspace members so their
//! logic stays host-testable without a target chip attached.
#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod exchange;
pub mod external;
pub mod hardware;
pub mod motor;
pub mod persistence;
pub mod status;

pub use config::GlobalConfig;
pub use error::{Error, ErrorHandler, ErrorKind, ErrorReport};
pub use exchange::{DDSState, ParameterExchange};
pub use motor::{MotorController, MotorState};
pub use status::StatusBus;

use external::{InputProvider, Timebase};
use motor::RelayOutput;

/// Watchdog period the control core must feed within (§4.4 "Failure
/// behaviour", §5 "Cancellation & timeouts"). A hardware watchdog outside
/// this crate resets the MCU if it is not fed in time; nothing here
/// implements retries around it.
pub const WATCHDOG_TIMEOUT_MS: u32 = 2_000;

/// Every piece of Core-0-owned state (§5 "Ownership"): config, the motor
/// lifecycle, the error sink and the handles to the cross-core/UI-facing
/// shared objects. One instance lives for the process lifetime, built in
/// `main` the way Design Note §9 re-architects the teacher's file-scope
/// globals (`settings`, `motor`, `errorHandler`, ...) into owned fields of
/// a single top-level value. Core 1 never sees this type -- it is handed
/// only a `'static` reference to `exchange` (see `hardware::spawn_synthesis_core`).
pub struct App {
    pub config: GlobalConfig,
    pub controller: MotorController,
    pub errors: ErrorHandler,
}

impl App {
    /// Boot per §4.4 "Initial state": Standby unless `config.auto_boot`
    /// (not itself a persisted field -- boards without an auto-boot jumper
    /// always pass `false`), falling through to Stopped/Starting as
    /// configured.
    pub fn new(config: GlobalConfig, boot_ms: u32, auto_boot: bool, auto_start: bool) -> Self {
        Self {
            config,
            controller: MotorController::new(boot_ms, auto_boot, auto_start),
            errors: ErrorHandler::default(),
        }
    }

    /// One control-core loop iteration: poll input, advance the state
    /// machine, publish the resulting `DDSState`, and update the status
    /// bus. Must run at least once per [`WATCHDOG_TIMEOUT_MS`].
    pub fn tick(
        &mut self,
        now_ms: u32,
        input: &mut impl InputProvider,
        exchange: &ParameterExchange,
        status: &StatusBus,
        relay_output: &mut impl RelayOutput,
    ) {
        self.dispatch_input(now_ms, input);
        self.controller
            .tick(now_ms, &self.config, exchange, status, relay_output);
        status.set_has_critical_error(self.errors.has_critical_error());
    }

    fn dispatch_input(&mut self, now_ms: u32, input: &mut impl InputProvider) {
        while let Some(event) = input.poll_event() {
            match event {
                external::InputEvent::Select => self.toggle_start_stop(now_ms),
                external::InputEvent::DoubleClick => self.controller.cycle_speed(now_ms, &self.config),
                external::InputEvent::Back => self.controller.toggle_standby(now_ms),
                _ => {}
            }
        }
        let delta = input.take_encoder_delta();
        if delta != 0 {
            let step = 1.0;
            let requested = self.controller.pitch_pct() + delta as f32 * step;
            self.controller.set_pitch(requested, self.config.pitch_range_pct);
        }
    }

    fn toggle_start_stop(&mut self, now_ms: u32) {
        match self.controller.state() {
            MotorState::Stopped => self.controller.start(now_ms),
            MotorState::Running | MotorState::Starting => self.controller.stop(now_ms),
            _ => {}
        }
    }

    /// A fault report (§7): applies the local-recovery/surfaced/fatal
    /// policy. The fatal "mute all relays now" step is performed by the
    /// caller on the next `tick` via [`MotorController::force_mute_for_critical_fault`]
    /// once it observes `errors.has_critical_error()`, since only the
    /// caller holds the relay output handle at report time.
    pub fn report_error(&mut self, report: ErrorReport) {
        self.errors.report(report);
    }

    pub fn acknowledge_error(&mut self) {
        self.errors.acknowledge();
    }
}

/// Re-reads persisted settings or falls back to defaults (§7
/// "SettingsCorrupt -> reset to defaults, continue booting").
pub fn load_config_or_default(persistence: &mut impl persistence::PersistenceProvider) -> GlobalConfig {
    let mut config = GlobalConfig::default();
    if persistence.load_config(&mut config) {
        config.validate();
    } else {
        config = GlobalConfig::default();
    }
    config
}

/// A timebase-driven helper for the watchdog feed cadence: true once
/// `WATCHDOG_TIMEOUT_MS / 2` has elapsed since `last_fed_ms`, leaving
/// headroom under the hard deadline.
pub fn should_feed_watchdog(last_fed_ms: u32, now_ms: u32) -> bool {
    now_ms.saturating_sub(last_fed_ms) >= WATCHDOG_TIMEOUT_MS / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use external::{FakeTimebase, InjectedInput};

    #[derive(Default)]
    struct RecordingRelay {
        mute: [bool; 4],
    }

    impl RelayOutput for RecordingRelay {
        fn set_standby_relay(&mut self, _active: bool) {}
        fn set_phase_mute(&mut self, channel: usize, muted: bool) {
            self.mute[channel] = muted;
        }
    }

    #[test]
    fn select_event_starts_then_stops() {
        let config = GlobalConfig::default();
        let mut app = App::new(config, 0, true, false);
        assert_eq!(app.controller.state(), MotorState::Stopped);

        let exchange = ParameterExchange::new();
        let status = StatusBus::new();
        let mut relay = RecordingRelay::default();
        let mut input = InjectedInput::new();

        input.inject_event(external::InputEvent::Select);
        app.tick(0, &mut input, &exchange, &status, &mut relay);
        assert_eq!(app.controller.state(), MotorState::Starting);
    }

    #[test]
    fn critical_error_sets_status_bus_flag() {
        let config = GlobalConfig::default();
        let mut app = App::new(config, 0, false, false);
        let exchange = ParameterExchange::new();
        let status = StatusBus::new();
        let mut relay = RecordingRelay::default();
        let mut input = InjectedInput::new();

        app.report_error(ErrorReport::new(ErrorKind::MotorStall, "stall", true, 0));
        app.tick(0, &mut input, &exchange, &status, &mut relay);
        assert!(status.has_critical_error());
    }

    #[test]
    fn encoder_delta_adjusts_pitch() {
        let config = GlobalConfig::default();
        let mut app = App::new(config, 0, false, false);
        let exchange = ParameterExchange::new();
        let status = StatusBus::new();
        let mut relay = RecordingRelay::default();
        let mut input = InjectedInput::new();

        input.inject_encoder_delta(5);
        app.tick(0, &mut input, &exchange, &status, &mut relay);
        assert!((app.controller.pitch_pct() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn watchdog_feed_cadence_is_half_the_timeout() {
        assert!(!should_feed_watchdog(0, 500));
        assert!(should_feed_watchdog(0, 1_000));
    }

    #[test]
    fn fake_timebase_starts_at_zero() {
        let tb = FakeTimebase::new();
        assert_eq!(tb.millis(), 0);
    }
}
