//! RP2040 peripheral bindings for the External Contracts of §4.6/§6.
//!
//! Everything above this module (`config`, `motor`, `exchange`, `status`,
//! `dsp`) is pure logic with no peripheral access, the way the teacher
//! keeps `dsp`/`ad9959` hardware-free and confines register access to
//! `hardware::*`. This module is the only place `rp2040-hal` appears.
use rp2040_hal as hal;

pub mod clocks;
pub mod input;
pub mod relay;
pub mod synth;
pub mod timebase;
pub mod watchdog;

pub use relay::GpioRelayOutput;
pub use synth::{spawn_synthesis_core, SynthesisCoreResources};
pub use timebase::HardwareTimebase;
pub use watchdog::HardwareWatchdog;

/// The subset of `rp2040_hal::pac::Peripherals` and GPIO pins Core 0 needs
/// after Core 1 has been spawned and handed its own slice of hardware
/// (§5 "Ownership": Core 0 exclusively owns GlobalConfig, motor state,
/// persistence, status bus; it never touches the DDS/DMA peripherals once
/// handed off).
pub struct ControlCoreResources<'a> {
    pub relay: GpioRelayOutput<'a>,
    pub timebase: HardwareTimebase,
    pub watchdog: HardwareWatchdog,
}

/// Bit-exact GPIO function assignment applied during setup; re-exported so
/// callers do not need to depend on both `crate::external::pins` and this
/// module to wire a board up.
pub use crate::external::pins;
