//! Shared Status Bus (C5): single-writer/multi-reader scalars the UI and
//! CLI read. §5 requires 32-bit aligned writes and allows readers to
//! tolerate at-most-one-tick-old values but never a torn enum -- so the
//! enum uses its own byte-sized atomic while the floats are reinterpreted
//! through `AtomicU32::{to,from}_bits`, as called out in §9's
//! "re-architect as explicit atomics with declared memory ordering"
//! design note.
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::motor::state::MotorState;

pub struct StatusBus {
    motor_state: AtomicU8,
    current_frequency_bits: AtomicU32,
    current_pitch_bits: AtomicU32,
    system_initialised: AtomicBool,
    has_critical_error: AtomicBool,
    session_seconds: AtomicU32,
    total_seconds: AtomicU32,
}

impl StatusBus {
    pub const fn new() -> Self {
        Self {
            motor_state: AtomicU8::new(MotorState::Standby as u8),
            current_frequency_bits: AtomicU32::new(0),
            current_pitch_bits: AtomicU32::new(0),
            system_initialised: AtomicBool::new(false),
            has_critical_error: AtomicBool::new(false),
            session_seconds: AtomicU32::new(0),
            total_seconds: AtomicU32::new(0),
        }
    }

    pub fn set_motor_state(&self, state: MotorState) {
        self.motor_state.store(state as u8, Ordering::Release);
    }

    pub fn motor_state(&self) -> MotorState {
        MotorState::try_from(self.motor_state.load(Ordering::Acquire))
            .unwrap_or(MotorState::Standby)
    }

    pub fn set_current_frequency(&self, hz: f32) {
        self.current_frequency_bits
            .store(hz.to_bits(), Ordering::Release);
    }

    pub fn current_frequency(&self) -> f32 {
        f32::from_bits(self.current_frequency_bits.load(Ordering::Acquire))
    }

    pub fn set_current_pitch(&self, pct: f32) {
        self.current_pitch_bits
            .store(pct.to_bits(), Ordering::Release);
    }

    pub fn current_pitch(&self) -> f32 {
        f32::from_bits(self.current_pitch_bits.load(Ordering::Acquire))
    }

    /// Written exactly once, when control-core setup completes. The DDS
    /// core spins on this before touching hardware (§4.5).
    pub fn mark_initialised(&self) {
        self.system_initialised.store(true, Ordering::Release);
    }

    pub fn is_initialised(&self) -> bool {
        self.system_initialised.load(Ordering::Acquire)
    }

    pub fn set_has_critical_error(&self, value: bool) {
        self.has_critical_error.store(value, Ordering::Release);
    }

    pub fn has_critical_error(&self) -> bool {
        self.has_critical_error.load(Ordering::Acquire)
    }

    pub fn set_runtime_counters(&self, session_seconds: u32, total_seconds: u32) {
        self.session_seconds.store(session_seconds, Ordering::Release);
        self.total_seconds.store(total_seconds, Ordering::Release);
    }

    pub fn runtime_counters(&self) -> (u32, u32) {
        (
            self.session_seconds.load(Ordering::Acquire),
            self.total_seconds.load(Ordering::Acquire),
        )
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_motor_state() {
        let bus = StatusBus::new();
        bus.set_motor_state(MotorState::Running);
        assert_eq!(bus.motor_state(), MotorState::Running);
    }

    #[test]
    fn round_trips_frequency_and_pitch() {
        let bus = StatusBus::new();
        bus.set_current_frequency(67.5);
        bus.set_current_pitch(-12.5);
        assert!((bus.current_frequency() - 67.5).abs() < 1e-6);
        assert!((bus.current_pitch() - (-12.5)).abs() < 1e-6);
    }

    #[test]
    fn system_initialised_starts_false() {
        let bus = StatusBus::new();
        assert!(!bus.is_initialised());
        bus.mark_initialised();
        assert!(bus.is_initialised());
    }
}
