//! Application entry point: hardware bring-up plus the Core 0 control loop.
//!
//! Core 1 (DDS synthesis, §4.2/§4.3) is handed off to
//! `hardware::spawn_synthesis_core` and never returns to this file -- from
//! here on it owns the DMA/PWM peripherals exclusively (§5 "Ownership").
//! Everything below this point runs on Core 0: input polling, the motor
//! state machine, the status bus, the CLI, and the watchdog feed.
#![no_std]
#![no_main]

use cortex_m_rt::entry;
use embedded_hal::digital::v2::InputPin;
use embedded_hal::serial::Read as _;
use panic_halt as _;
use rp2040_hal as hal;
use rp2040_hal::gpio::FunctionUart;
use rp2040_hal::pac;

use console::{parse_line, Command};
use turntable_firmware::external::Timebase;
use turntable_firmware::hardware::{self, GpioRelayOutput, HardwareTimebase, HardwareWatchdog};
use turntable_firmware::hardware::input::HardwareInput;
use turntable_firmware::hardware::synth::SynthesisCoreResources;
use turntable_firmware::persistence::PersistenceProvider;
use turntable_firmware::{
    load_config_or_default, should_feed_watchdog, App, Error, GlobalConfig, ParameterExchange,
    StatusBus,
};

/// Second-stage bootloader the RP2040's boot ROM expects at the start of flash.
#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

/// Shared with Core 1 (§4.3): must be `'static` so a raw reference to it
/// survives the `spawn` closure.
static EXCHANGE: ParameterExchange = ParameterExchange::new();
/// The UI-facing scalars of §4.5. `'static` for the same reason.
static STATUS: StatusBus = StatusBus::new();

/// In-RAM stand-in for the LittleFS-backed settings/preset store (§6).
/// Per §1's Non-goals, persistence's actual flash driver is an external
/// collaborator whose implementation is specified but not built here --
/// this satisfies [`PersistenceProvider`]'s contract without ever having
/// anything to load, so every boot falls back to
/// [`GlobalConfig::default`] until a board brings up its own flash-backed
/// implementation in its place.
struct NoPersistence;

impl PersistenceProvider for NoPersistence {
    fn load_config(&mut self, _out: &mut GlobalConfig) -> bool {
        false
    }
    fn save_config(&mut self, _config: &GlobalConfig) -> Result<(), Error> {
        Err(Error::StorageFailure)
    }
    fn load_preset(&mut self, _slot: usize, _out: &mut GlobalConfig) -> bool {
        false
    }
    fn save_preset(&mut self, _slot: usize, _config: &GlobalConfig) -> Result<(), Error> {
        Err(Error::StorageFailure)
    }
    fn reset_all(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

#[entry]
fn main() -> ! {
    let mut pac = pac::Peripherals::take().unwrap();
    let mut watchdog_dev = hal::Watchdog::new(pac.WATCHDOG);

    let clocks = hardware::clocks::init(
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog_dev,
    );

    let mut sio = hal::Sio::new(pac.SIO);
    let gpio_pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    rtt_target::rtt_init_print!();
    log::set_max_level(log::LevelFilter::Info);

    let mut persistence = NoPersistence;
    let config = load_config_or_default(&mut persistence);

    let timebase = HardwareTimebase::new(hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks));
    let boot_ms = timebase.millis();

    hardware::spawn_synthesis_core(
        SynthesisCoreResources {
            pwm: pac.PWM,
            dma: pac.DMA,
        },
        clocks.system_clock.freq().to_Hz(),
        &mut pac.PSM,
        &mut pac.PPB,
        &mut sio.fifo,
        &EXCHANGE,
    );

    let encoder_clk_pin = gpio_pins.gpio10.into_pull_up_input();
    let encoder_dt_pin = gpio_pins.gpio11.into_pull_up_input();
    let encoder_sw_pin = gpio_pins.gpio12.into_pull_up_input();
    let standby_btn_pin = gpio_pins.gpio21.into_pull_up_input();
    let speed_btn_pin = gpio_pins.gpio22.into_pull_up_input();
    let start_stop_btn_pin = gpio_pins.gpio23.into_pull_up_input();

    let mut standby_pin = gpio_pins.gpio16.into_push_pull_output();
    let mut mute0 = gpio_pins.gpio17.into_push_pull_output();
    let mut mute1 = gpio_pins.gpio18.into_push_pull_output();
    let mut mute2 = gpio_pins.gpio19.into_push_pull_output();
    let mut mute3 = gpio_pins.gpio20.into_push_pull_output();
    let mut relay_output = GpioRelayOutput::new(
        &mut standby_pin,
        [&mut mute0, &mut mute1, &mut mute2, &mut mute3],
        config.relay_active_high,
    );

    let uart_pins = (
        gpio_pins.gpio4.into_mode::<FunctionUart>(),
        gpio_pins.gpio5.into_mode::<FunctionUart>(),
    );
    let mut uart = hal::uart::UartPeripheral::new(pac.UART0, uart_pins, &mut pac.RESETS)
        .enable(
            hal::uart::UartConfig::new(
                fugit::HertzU32::from_raw(115_200),
                hal::uart::DataBits::Eight,
                None,
                hal::uart::StopBits::One,
            ),
            clocks.peripheral_clock.freq(),
        )
        .unwrap();

    let mut app = App::new(config, boot_ms, false, false);
    let mut input = HardwareInput::new();
    let mut watchdog = HardwareWatchdog::new(watchdog_dev);
    let mut last_fed_ms = boot_ms;
    let mut cli_line: heapless::String<64> = heapless::String::new();

    STATUS.mark_initialised();

    loop {
        let now_ms = timebase.millis();

        // §6 pin map, sampled raw every tick -- quadrature/debounce state
        // lives entirely in `HardwareInput`.
        let clk = encoder_clk_pin.is_high().unwrap_or(false);
        let dt = encoder_dt_pin.is_high().unwrap_or(false);
        let sw = encoder_sw_pin.is_low().unwrap_or(false);
        let standby_btn = standby_btn_pin.is_low().unwrap_or(false);
        let speed_btn = speed_btn_pin.is_low().unwrap_or(false);
        let start_stop_btn = start_stop_btn_pin.is_low().unwrap_or(false);
        input.sample(now_ms, clk, dt, sw, standby_btn, speed_btn, start_stop_btn);

        app.tick(now_ms, &mut input, &EXCHANGE, &STATUS, &mut relay_output);

        if app.errors.has_critical_error() {
            app.controller.force_mute_for_critical_fault(&mut relay_output);
        }

        poll_cli(&mut uart, &mut cli_line, &mut app);

        if should_feed_watchdog(last_fed_ms, now_ms) {
            watchdog.feed();
            last_fed_ms = now_ms;
        }
    }
}

/// Drain whatever bytes the serial peripheral has buffered, echoing parsed
/// commands' results back. §6's CLI surface is newline-terminated; this
/// only tokenizes and dispatches one full line per call so the main loop
/// never blocks on serial I/O (§5 "Suspension points: none in the core").
fn poll_cli<U>(uart: &mut U, line: &mut heapless::String<64>, app: &mut App)
where
    U: embedded_hal::serial::Read<u8> + core::fmt::Write,
{
    while let Ok(byte) = uart.read() {
        match byte {
            b'\n' | b'\r' => {
                if !line.is_empty() {
                    dispatch_cli(uart, line.as_str(), app);
                    line.clear();
                }
            }
            b if line.push(b as char).is_err() => line.clear(),
            _ => {}
        }
    }
}

fn dispatch_cli<U>(uart: &mut U, line: &str, app: &mut App)
where
    U: core::fmt::Write,
{
    let now_ms = 0; // CLI-triggered transitions use the next tick's real time.
    match parse_line(line) {
        Ok(Command::Start) => app.controller.start(now_ms),
        Ok(Command::Stop) => app.controller.stop(now_ms),
        Ok(Command::Speed(n)) => {
            if let Some(slot) = turntable_firmware::config::SpeedSlot::from_index(n) {
                while app.controller.speed_slot() != slot {
                    app.controller.cycle_speed(now_ms, &app.config);
                }
            }
        }
        Ok(Command::CycleSpeed) => app.controller.cycle_speed(now_ms, &app.config),
        Ok(Command::ToggleStandby) => app.controller.toggle_standby(now_ms),
        Ok(Command::ResetPitch) => app.controller.set_pitch(0.0, app.config.pitch_range_pct),
        Ok(Command::Status) => {
            let _ = writeln!(
                uart,
                "state={:?} freq={:.1} pitch={:.1}",
                app.controller.state(),
                STATUS.current_frequency(),
                STATUS.current_pitch()
            );
            return;
        }
        Ok(Command::List) => {
            for key in console::ALL_KEYS {
                let _ = writeln!(uart, "{}", key.name());
            }
            return;
        }
        Ok(Command::Get(key)) => {
            match app.config.get_setting(key, app.controller.speed_slot()) {
                Some(value) => {
                    let _ = writeln!(uart, "{}={}", key.name(), value.as_str());
                }
                None => {
                    let _ = writeln!(uart, "error: {} is not handled by this core", key.name());
                }
            }
            return;
        }
        Ok(Command::Set(key, value)) => {
            if app
                .config
                .set_setting(key, app.controller.speed_slot(), value.as_str())
                .is_err()
            {
                let _ = writeln!(uart, "error: invalid value for {}", key.name());
                return;
            }
        }
        Ok(Command::ErrorDump) => {
            if let Some(report) = app.errors.latest() {
                let _ = writeln!(uart, "{:?}: {}", report.kind, report.message.as_str());
            }
            return;
        }
        Ok(Command::ErrorClear) => {
            app.acknowledge_error();
        }
        Ok(Command::FactoryReset) => {
            app.config = GlobalConfig::default();
        }
        Ok(Command::Help) => {
            let _ = writeln!(uart, "start stop speed s t p status list get set error f help");
            return;
        }
        Err(parse_error) => {
            let _ = writeln!(uart, "{}", parse_error.0);
            return;
        }
    }
    let _ = writeln!(uart, "ok");
}
