//! Rotary-encoder/button decoding (§6 "Input-event semantics"). Per §1,
//! quadrature decoding and menu navigation are themselves out of scope --
//! only the event contract is specified -- but the timing constants in
//! §6 (debounce, double-click window, hold thresholds, acceleration) are
//! bit-exact, so this binding implements them rather than leaving a
//! no-op stub.
use heapless::Deque;

use crate::external::{InputEvent, InputProvider};

/// §6 "Debounce = 20 ms".
pub const DEBOUNCE_MS: u32 = 20;
/// §6 "Double-click window = 400 ms".
pub const DOUBLE_CLICK_WINDOW_MS: u32 = 400;
/// §6 "≥3 s = Back".
pub const HOLD_BACK_MS: u32 = 3_000;
/// §6 "≥5 s = Exit".
pub const HOLD_EXIT_MS: u32 = 5_000;
/// §6 acceleration thresholds: "if Δt between steps < 50 ms, multiply
/// delta by 2 after 2 steps, by 5 after 5".
pub const ACCEL_STEP_GAP_MS: u32 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ButtonPhase {
    Idle,
    /// Pressed, waiting to see whether it's a hold or a release. `second`
    /// marks this as the second press of a double-click (i.e. the press
    /// landed while `AwaitingDoubleClick` was still open) so the matching
    /// release reports `DoubleClick` instead of re-arming the window.
    Pressed { pressed_at_ms: u32, second: bool },
    /// Released once; waiting out the double-click window for a second press.
    AwaitingDoubleClick { released_at_ms: u32 },
    /// Already classified as Back/Exit by hold duration; suppress further
    /// events until release.
    Consumed,
}

/// Debounces a single button/switch input and classifies presses into
/// `Select` / `DoubleClick` / `Back` / `Exit` per §6.
pub struct ButtonDecoder {
    phase: ButtonPhase,
    last_raw: bool,
    last_edge_ms: Option<u32>,
}

impl ButtonDecoder {
    pub fn new() -> Self {
        Self {
            phase: ButtonPhase::Idle,
            last_raw: false,
            last_edge_ms: None,
        }
    }

    /// Feed the current raw (already-polarity-resolved: `true` = pressed)
    /// button level at `now_ms`. Returns an event the instant it becomes
    /// unambiguous: `Select`/`DoubleClick` on release, `Back`/`Exit` the
    /// moment their hold threshold is crossed while still pressed.
    pub fn poll(&mut self, raw_pressed: bool, now_ms: u32) -> Option<InputEvent> {
        if raw_pressed != self.last_raw {
            if let Some(last_edge_ms) = self.last_edge_ms {
                if now_ms.saturating_sub(last_edge_ms) < DEBOUNCE_MS {
                    return None;
                }
            }
            self.last_edge_ms = Some(now_ms);
            self.last_raw = raw_pressed;
            return self.on_edge(raw_pressed, now_ms);
        }

        if let ButtonPhase::Pressed { pressed_at_ms, .. } = self.phase {
            let held_ms = now_ms.saturating_sub(pressed_at_ms);
            if held_ms >= HOLD_EXIT_MS {
                self.phase = ButtonPhase::Consumed;
                return Some(InputEvent::Exit);
            }
            if held_ms >= HOLD_BACK_MS {
                self.phase = ButtonPhase::Consumed;
                return Some(InputEvent::Back);
            }
        }

        if let ButtonPhase::AwaitingDoubleClick { released_at_ms } = self.phase {
            if now_ms.saturating_sub(released_at_ms) >= DOUBLE_CLICK_WINDOW_MS {
                self.phase = ButtonPhase::Idle;
                return Some(InputEvent::Select);
            }
        }

        None
    }

    fn on_edge(&mut self, pressed: bool, now_ms: u32) -> Option<InputEvent> {
        if pressed {
            let second = matches!(self.phase, ButtonPhase::AwaitingDoubleClick { .. });
            self.phase = ButtonPhase::Pressed {
                pressed_at_ms: now_ms,
                second,
            };
            return None;
        }

        match self.phase {
            ButtonPhase::Consumed => {
                self.phase = ButtonPhase::Idle;
                None
            }
            ButtonPhase::Pressed { second: true, .. } => {
                self.phase = ButtonPhase::Idle;
                Some(InputEvent::DoubleClick)
            }
            _ => {
                self.phase = ButtonPhase::AwaitingDoubleClick {
                    released_at_ms: now_ms,
                };
                None
            }
        }
    }
}

impl Default for ButtonDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Two-bit quadrature decoder with §6's step-rate acceleration.
pub struct QuadratureDecoder {
    last_state: u8,
    last_step_ms: u32,
    consecutive_fast_steps: u32,
}

impl QuadratureDecoder {
    pub fn new() -> Self {
        Self {
            last_state: 0,
            last_step_ms: 0,
            consecutive_fast_steps: 0,
        }
    }

    /// Feed the raw `(clk, dt)` pin levels at `now_ms`; returns the signed
    /// delta (possibly accelerated) produced by this sample, or 0.
    pub fn poll(&mut self, clk: bool, dt: bool, now_ms: u32) -> i32 {
        let state = (clk as u8) << 1 | dt as u8;
        if state == self.last_state {
            return 0;
        }
        // A rising edge on CLK with DT's level indicating direction is the
        // standard two-bit-per-detent quadrature convention; only react
        // on CLK transitions to avoid double-counting each detent.
        let clk_edge = (self.last_state >> 1) != (state >> 1);
        self.last_state = state;
        if !clk_edge {
            return 0;
        }

        let direction: i32 = if dt != clk { 1 } else { -1 };

        let gap_ms = now_ms.saturating_sub(self.last_step_ms);
        self.last_step_ms = now_ms;
        let multiplier = if gap_ms < ACCEL_STEP_GAP_MS {
            self.consecutive_fast_steps += 1;
            if self.consecutive_fast_steps >= 5 {
                5
            } else if self.consecutive_fast_steps >= 2 {
                2
            } else {
                1
            }
        } else {
            self.consecutive_fast_steps = 0;
            1
        };

        direction * multiplier
    }
}

impl Default for QuadratureDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the primary encoder, pitch encoder and standalone buttons every
/// poll, producing the discrete event stream and encoder delta
/// [`InputProvider`] exposes to the control core. Generic over whatever
/// digital-input pin type a board wires in, read via plain booleans
/// sampled by the caller (keeping this module free of a specific GPIO
/// peripheral type).
pub struct HardwareInput {
    primary_button: ButtonDecoder,
    primary_quad: QuadratureDecoder,
    standby_button: ButtonDecoder,
    speed_button: ButtonDecoder,
    start_stop_button: ButtonDecoder,
    events: Deque<InputEvent, 8>,
    encoder_delta: i32,
}

impl HardwareInput {
    pub fn new() -> Self {
        Self {
            primary_button: ButtonDecoder::new(),
            primary_quad: QuadratureDecoder::new(),
            standby_button: ButtonDecoder::new(),
            speed_button: ButtonDecoder::new(),
            start_stop_button: ButtonDecoder::new(),
            events: Deque::new(),
            encoder_delta: 0,
        }
    }

    /// Sample raw (already debounce-polarity-resolved) pin levels once per
    /// control-core tick.
    #[allow(clippy::too_many_arguments)]
    pub fn sample(
        &mut self,
        now_ms: u32,
        encoder_clk: bool,
        encoder_dt: bool,
        encoder_sw_pressed: bool,
        standby_pressed: bool,
        speed_pressed: bool,
        start_stop_pressed: bool,
    ) {
        self.encoder_delta += self.primary_quad.poll(encoder_clk, encoder_dt, now_ms);

        for event in [
            self.primary_button.poll(encoder_sw_pressed, now_ms),
            self.standby_button.poll(standby_pressed, now_ms),
            self.speed_button.poll(speed_pressed, now_ms),
            self.start_stop_button.poll(start_stop_pressed, now_ms),
        ]
        .into_iter()
        .flatten()
        {
            let _ = self.events.push_back(event);
        }
    }
}

impl Default for HardwareInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputProvider for HardwareInput {
    fn poll_event(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    fn take_encoder_delta(&mut self) -> i32 {
        core::mem::take(&mut self.encoder_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_press_emits_select_after_double_click_window() {
        let mut btn = ButtonDecoder::new();
        assert_eq!(btn.poll(true, 0), None);
        assert_eq!(btn.poll(false, 100), None);
        assert_eq!(btn.poll(false, 100 + DOUBLE_CLICK_WINDOW_MS), Some(InputEvent::Select));
    }

    #[test]
    fn two_quick_presses_emit_double_click() {
        let mut btn = ButtonDecoder::new();
        btn.poll(true, 0);
        btn.poll(false, 50);
        btn.poll(true, 150);
        assert_eq!(btn.poll(false, 200), Some(InputEvent::DoubleClick));
    }

    #[test]
    fn three_second_hold_emits_back() {
        let mut btn = ButtonDecoder::new();
        btn.poll(true, 0);
        assert_eq!(btn.poll(true, HOLD_BACK_MS), Some(InputEvent::Back));
    }

    #[test]
    fn five_second_hold_emits_exit_not_back() {
        let mut btn = ButtonDecoder::new();
        btn.poll(true, 0);
        assert_eq!(btn.poll(true, HOLD_EXIT_MS), Some(InputEvent::Exit));
    }

    #[test]
    fn edges_within_debounce_window_are_ignored() {
        let mut btn = ButtonDecoder::new();
        btn.poll(true, 0);
        assert_eq!(btn.poll(false, 5), None);
        assert_eq!(btn.last_raw, true);
    }

    #[test]
    fn quadrature_accelerates_on_fast_steps() {
        let mut quad = QuadratureDecoder::new();
        quad.poll(false, false, 0);
        // First step: already within the acceleration window of the
        // decoder's initial (zeroed) timestamp, but not yet past the
        // 2-consecutive-step threshold, so it is unscaled.
        assert_eq!(quad.poll(true, false, 10), 1);
        // Second step within 50ms crosses the 2-step threshold: 2x.
        assert_eq!(quad.poll(false, false, 20), -2);
        assert_eq!(quad.poll(true, false, 30), 2);
    }

    #[test]
    fn quadrature_resets_acceleration_after_a_slow_step() {
        let mut quad = QuadratureDecoder::new();
        quad.poll(false, false, 0);
        quad.poll(true, false, 1_000);
        assert_eq!(quad.poll(false, false, 1_010), -1);
    }
}
