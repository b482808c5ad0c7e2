//! External Contracts (C6, §4.6): collaborators that are specified here
//! but, per the Non-goals, implemented elsewhere -- OLED rendering, menu
//! navigation, rotary-encoder quadrature decoding and serial framing are
//! all straightforward and out of scope. This module only fixes their
//! interface to the core and the bit-exact pin map of §6.
use crate::motor::state::MotorState;

/// Discrete UI-facing events an [`InputProvider`] produces. Rotary motion
/// is reported separately as a signed delta so the core never has to
/// reconstruct direction from raw quadrature edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    NavUp,
    NavDown,
    Select,
    Back,
    Exit,
    DoubleClick,
}

/// Produces discrete events and an encoder delta. A real board backs this
/// with interrupt-driven quadrature decoding and button debouncing; the
/// trait also supports direct event injection so host-side tests can drive
/// the controller without hardware.
pub trait InputProvider {
    /// Drains and returns the next pending event, if any.
    fn poll_event(&mut self) -> Option<InputEvent>;
    /// Signed encoder ticks accumulated since the last call; resets to 0.
    fn take_encoder_delta(&mut self) -> i32;
}

/// A fixed-capacity [`InputProvider`] for tests and simulation: events and
/// deltas are injected directly rather than decoded from hardware.
#[derive(Default)]
pub struct InjectedInput {
    events: heapless::Deque<InputEvent, 8>,
    encoder_delta: i32,
}

impl InjectedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_event(&mut self, event: InputEvent) {
        let _ = self.events.push_back(event);
    }

    pub fn inject_encoder_delta(&mut self, delta: i32) {
        self.encoder_delta += delta;
    }
}

impl InputProvider for InjectedInput {
    fn poll_event(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    fn take_encoder_delta(&mut self) -> i32 {
        core::mem::take(&mut self.encoder_delta)
    }
}

/// Actions a UI (OLED menu, serial CLI, or test harness) can invoke on the
/// controller. The UI itself only reads the status bus and calls these;
/// it never touches `GlobalConfig` or the DDS state directly.
pub trait UiProvider {
    fn start(&mut self);
    fn stop(&mut self);
    fn cycle_speed(&mut self);
    fn toggle_standby(&mut self);
    fn set_pitch(&mut self, percent: f32);
    /// Current state for rendering; forwarded from the status bus.
    fn motor_state(&self) -> MotorState;
}

/// Monotonic timing source (§4.6). Implementations on real hardware read
/// the RP2040 system timer; tests use a manually-advanced fake.
pub trait Timebase {
    fn millis(&self) -> u32;
    fn micros(&self) -> u64;
}

/// A [`Timebase`] driven entirely by test code.
#[derive(Default)]
pub struct FakeTimebase {
    micros: u64,
}

impl FakeTimebase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_micros(&mut self, delta: u64) {
        self.micros += delta;
    }
}

impl Timebase for FakeTimebase {
    fn millis(&self) -> u32 {
        (self.micros / 1_000) as u32
    }

    fn micros(&self) -> u64 {
        self.micros
    }
}

/// Bit-exact GPIO assignments (§6). Board bring-up wires these pins to
/// their peripheral function; nothing else in the crate should hardcode a
/// pin number.
pub mod pins {
    pub const PWM_A: u8 = 0;
    pub const PWM_B: u8 = 1;
    pub const PWM_C: u8 = 2;
    pub const PWM_D: u8 = 3;
    pub const I2C_SDA: u8 = 4;
    pub const I2C_SCL: u8 = 5;
    pub const ENCODER_CLK: u8 = 10;
    pub const ENCODER_DT: u8 = 11;
    pub const ENCODER_SW: u8 = 12;
    pub const PITCH_ENCODER_CLK: u8 = 13;
    pub const PITCH_ENCODER_DT: u8 = 14;
    pub const PITCH_ENCODER_SW: u8 = 15;
    pub const STANDBY_RELAY: u8 = 16;
    pub const PHASE_MUTE: [u8; 4] = [17, 18, 19, 20];
    pub const BUTTON_STANDBY: u8 = 21;
    pub const BUTTON_SPEED: u8 = 22;
    pub const BUTTON_START_STOP: u8 = 23;

    pub const OLED_I2C_ADDRESS: u8 = 0x3C;
}
