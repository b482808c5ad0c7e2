//! Monotonic millisecond/microsecond counters (§4.6 "Timebase"), backed
//! by the RP2040's always-running 64-bit system timer.
use rp2040_hal as hal;

use crate::external::Timebase;

pub struct HardwareTimebase {
    timer: hal::Timer,
}

impl HardwareTimebase {
    pub fn new(timer: hal::Timer) -> Self {
        Self { timer }
    }
}

impl Timebase for HardwareTimebase {
    fn millis(&self) -> u32 {
        (self.timer.get_counter().ticks() / 1_000) as u32
    }

    fn micros(&self) -> u64 {
        self.timer.get_counter().ticks()
    }
}
