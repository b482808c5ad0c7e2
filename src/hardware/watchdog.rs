//! Hardware watchdog binding (§4.4 "Failure behaviour", §5 "Cancellation &
//! timeouts"): a 2 s timeout external to the core resets the MCU if the
//! control core's main loop stalls. This module only arms and feeds it;
//! no retry or cancellation logic lives here by design.
use rp2040_hal as hal;

use crate::WATCHDOG_TIMEOUT_MS;

pub struct HardwareWatchdog {
    inner: hal::Watchdog,
}

impl HardwareWatchdog {
    pub fn new(mut inner: hal::Watchdog) -> Self {
        inner.start(fugit::MicrosDurationU32::millis(WATCHDOG_TIMEOUT_MS));
        Self { inner }
    }

    /// Feed the watchdog. Called from the control-core main loop at least
    /// every [`crate::should_feed_watchdog`] cadence.
    pub fn feed(&mut self) {
        self.inner.feed();
    }
}
