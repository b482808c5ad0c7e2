//! GPIO binding for the staggered relay sequencer of §4.4 "Relay
//! sequencing". Pin assignment is bit-exact per §6 (`STANDBY_RELAY`,
//! `PHASE_MUTE`); polarity (`active_high`) is applied here so
//! [`crate::motor::RelayOutput`] itself only ever speaks in logical
//! "muted"/"active" terms, as documented on the trait.
use core::convert::Infallible;

use embedded_hal::digital::v2::OutputPin;

use crate::motor::RelayOutput;

/// Drives the standby relay and four phase-mute lines over GPIO. Borrowed
/// pin references rather than owned pins, so the same GPIO bank can be
/// split once at setup and handed to whichever module needs a given pin
/// (the encoder/button pins never overlap these).
pub struct GpioRelayOutput<'a> {
    standby: &'a mut dyn OutputPin<Error = Infallible>,
    phase_mute: [&'a mut dyn OutputPin<Error = Infallible>; 4],
    active_high: bool,
}

impl<'a> GpioRelayOutput<'a> {
    pub fn new(
        standby: &'a mut dyn OutputPin<Error = Infallible>,
        phase_mute: [&'a mut dyn OutputPin<Error = Infallible>; 4],
        active_high: bool,
    ) -> Self {
        Self {
            standby,
            phase_mute,
            active_high,
        }
    }

    /// Re-read whenever `GlobalConfig::relay_active_high` changes (menu
    /// commit, CLI `set`, preset load); the controller itself never
    /// touches GPIO polarity.
    pub fn set_active_high(&mut self, active_high: bool) {
        self.active_high = active_high;
    }

    fn write(pin: &mut dyn OutputPin<Error = Infallible>, asserted: bool, active_high: bool) {
        let level = asserted == active_high;
        if level {
            let _ = pin.set_high();
        } else {
            let _ = pin.set_low();
        }
    }
}

impl<'a> RelayOutput for GpioRelayOutput<'a> {
    fn set_standby_relay(&mut self, active: bool) {
        // `active` already carries the caller-resolved polarity (see
        // `motor::controller::standby_relay_level`); write it directly.
        if active {
            let _ = self.standby.set_high();
        } else {
            let _ = self.standby.set_low();
        }
    }

    fn set_phase_mute(&mut self, channel: usize, muted: bool) {
        Self::write(self.phase_mute[channel], muted, self.active_high);
    }
}
