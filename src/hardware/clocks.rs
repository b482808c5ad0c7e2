//! Clock tree bring-up. Grounded in the `rp2040-hal` clock-init call used
//! by every bare-metal RP2040 application in the retrieval pack (see
//! `electronjoe-noise-generator-rust-on-pi-pico`'s `main.rs`): the PLLs
//! must be running before any peripheral that derives its clock from
//! them -- PWM included -- can be configured.
use rp2040_hal as hal;
use rp2040_hal::clocks::ClocksManager;
use rp2040_hal::pac;

/// Crystal frequency on the reference RP2040 board (12 MHz), matching the
/// constant used throughout the pack's Pico examples.
pub const XTAL_FREQ_HZ: u32 = 12_000_000;

/// Bring up the system/peripheral/USB clock tree from the external
/// crystal. Must run before [`crate::hardware::synth::configure_pwm_slices`],
/// which derives its clock divisor from `clocks.system_clock().freq()`.
pub fn init(
    xosc_dev: pac::XOSC,
    clocks_dev: pac::CLOCKS,
    pll_sys_dev: pac::PLL_SYS,
    pll_usb_dev: pac::PLL_USB,
    resets: &mut pac::RESETS,
    watchdog_dev: &mut hal::Watchdog,
) -> ClocksManager {
    hal::clocks::init_clocks_and_plls(
        XTAL_FREQ_HZ,
        xosc_dev,
        clocks_dev,
        pll_sys_dev,
        pll_usb_dev,
        resets,
        watchdog_dev,
    )
    .ok()
    .expect("clock configuration is fixed at build time and known to be valid")
}
