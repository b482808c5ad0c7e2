//! Persistence contract (§6). Per the Non-goals, the LittleFS-backed flash
//! driver itself is an external collaborator -- only its interface, the
//! on-disk format, and the schema migration logic live here. A real board
//! wires [`PersistenceProvider`] to `sequential-storage` over the RP2040's
//! onboard flash; tests exercise the format/migration logic against an
//! in-memory stand-in.
use heapless::String;
use postcard::{from_bytes, to_slice};
use serde::{Deserialize, Serialize};

use crate::config::{BootSpeed, BrakeMode, GlobalConfig, SCHEMA_VERSION, SoftStartCurve, SpeedProfile};
use crate::error::Error;

/// Five preset slots, `preset_0.bin` .. `preset_4.bin`.
pub const PRESET_SLOT_COUNT: usize = 5;

/// Large enough for a packed `GlobalConfig` plus the schema prefix with
/// headroom; callers size their backing buffers to this.
pub const MAX_RECORD_BYTES: usize = 1024;

/// Blocking persistence surface the control core calls outside hot paths
/// (§6). Implementors own the actual flash/LittleFS access; this crate only
/// defines the contract and the format the bytes must follow.
pub trait PersistenceProvider {
    /// Loads and validates `settings.bin`. Returns `false` (and leaves
    /// `out` unchanged) on any failure -- corrupt or missing persistence
    /// is never fatal (§7); callers fall back to `GlobalConfig::default()`.
    fn load_config(&mut self, out: &mut GlobalConfig) -> bool;
    fn save_config(&mut self, config: &GlobalConfig) -> Result<(), Error>;
    fn load_preset(&mut self, slot: usize, out: &mut GlobalConfig) -> bool;
    fn save_preset(&mut self, slot: usize, config: &GlobalConfig) -> Result<(), Error>;
    /// Factory reset: erases the settings file and all preset files.
    fn reset_all(&mut self) -> Result<(), Error>;
}

/// Encode `schema_version` followed by the packed config into `buf`,
/// returning the used prefix.
pub fn encode_record<'a>(
    config: &GlobalConfig,
    buf: &'a mut [u8; MAX_RECORD_BYTES],
) -> Result<&'a [u8], Error> {
    buf[0..4].copy_from_slice(&SCHEMA_VERSION.to_le_bytes());
    let written = to_slice(config, &mut buf[4..]).map_err(|_| Error::Malformed)?;
    let total = 4 + written.len();
    Ok(&buf[..total])
}

/// Decode a record written by [`encode_record`], running whatever migrator
/// applies to its stored `schema_version`. Returns `Err` only when the
/// bytes are corrupt or from a schema with no migration path -- callers
/// treat that as "use defaults" per §7, never as a crash.
pub fn decode_record(bytes: &[u8]) -> Result<GlobalConfig, Error> {
    if bytes.len() < 4 {
        return Err(Error::Malformed);
    }
    let mut version_bytes = [0u8; 4];
    version_bytes.copy_from_slice(&bytes[0..4]);
    let version = u32::from_le_bytes(version_bytes);
    let payload = &bytes[4..];

    match version {
        SCHEMA_VERSION => from_bytes(payload).map_err(|_| Error::SettingsCorrupt),
        2 => migrate_v2(payload),
        3 => migrate_v3(payload),
        other => Err(Error::UnsupportedSchema(other)),
    }
}

/// `postcard` is positional, not self-describing, so a legacy record can
/// only be decoded against a struct with exactly the legacy field layout
/// -- decoding it straight into the current `GlobalConfig` would misread
/// every field after the first one that moved. `ConfigV3`/`ConfigV2`
/// mirror the on-disk shape of schema versions 3 and 2 byte-for-byte;
/// the migrators below decode into those, then build the current
/// `GlobalConfig` field-by-field, filling in whatever that version never
/// had.

/// Schema version 3: added `fda_percent`, did not yet have `boot_speed`.
#[derive(Serialize, Deserialize)]
struct ConfigV3 {
    phase_mode: u8,
    max_amplitude_pct: f32,
    soft_start_curve: SoftStartCurve,
    fda_percent: f32,
    smooth_switch_enable: bool,
    smooth_switch_ramp_s: f32,
    brake_mode: BrakeMode,
    brake_duration_s: f32,
    brake_pulse_gap_s: f32,
    brake_ramp_start_freq_hz: f32,
    brake_ramp_stop_freq_hz: f32,
    relay_active_high: bool,
    relay_linked_to_standby: bool,
    relay_linked_to_start_stop: bool,
    power_on_mute_delay_s: f32,
    auto_standby_minutes: u16,
    auto_dim_minutes: u16,
    speed78_enabled: bool,
    pitch_range_pct: u8,
    speeds: [SpeedProfile; 3],
    preset_names: [String<16>; 5],
}

/// Schema version 2: had neither `fda_percent` nor `boot_speed`.
#[derive(Serialize, Deserialize)]
struct ConfigV2 {
    phase_mode: u8,
    max_amplitude_pct: f32,
    soft_start_curve: SoftStartCurve,
    smooth_switch_enable: bool,
    smooth_switch_ramp_s: f32,
    brake_mode: BrakeMode,
    brake_duration_s: f32,
    brake_pulse_gap_s: f32,
    brake_ramp_start_freq_hz: f32,
    brake_ramp_stop_freq_hz: f32,
    relay_active_high: bool,
    relay_linked_to_standby: bool,
    relay_linked_to_start_stop: bool,
    power_on_mute_delay_s: f32,
    auto_standby_minutes: u16,
    auto_dim_minutes: u16,
    speed78_enabled: bool,
    pitch_range_pct: u8,
    speeds: [SpeedProfile; 3],
    preset_names: [String<16>; 5],
}

fn migrate_v2(payload: &[u8]) -> Result<GlobalConfig, Error> {
    let legacy: ConfigV2 = from_bytes(payload).map_err(|_| Error::SettingsCorrupt)?;
    Ok(GlobalConfig {
        phase_mode: legacy.phase_mode,
        max_amplitude_pct: legacy.max_amplitude_pct,
        soft_start_curve: legacy.soft_start_curve,
        fda_percent: 0.0,
        smooth_switch_enable: legacy.smooth_switch_enable,
        smooth_switch_ramp_s: legacy.smooth_switch_ramp_s,
        brake_mode: legacy.brake_mode,
        brake_duration_s: legacy.brake_duration_s,
        brake_pulse_gap_s: legacy.brake_pulse_gap_s,
        brake_ramp_start_freq_hz: legacy.brake_ramp_start_freq_hz,
        brake_ramp_stop_freq_hz: legacy.brake_ramp_stop_freq_hz,
        relay_active_high: legacy.relay_active_high,
        relay_linked_to_standby: legacy.relay_linked_to_standby,
        relay_linked_to_start_stop: legacy.relay_linked_to_start_stop,
        power_on_mute_delay_s: legacy.power_on_mute_delay_s,
        auto_standby_minutes: legacy.auto_standby_minutes,
        auto_dim_minutes: legacy.auto_dim_minutes,
        boot_speed: BootSpeed::LastUsed,
        speed78_enabled: legacy.speed78_enabled,
        pitch_range_pct: legacy.pitch_range_pct,
        speeds: legacy.speeds,
        preset_names: legacy.preset_names,
    })
}

fn migrate_v3(payload: &[u8]) -> Result<GlobalConfig, Error> {
    let legacy: ConfigV3 = from_bytes(payload).map_err(|_| Error::SettingsCorrupt)?;
    Ok(GlobalConfig {
        phase_mode: legacy.phase_mode,
        max_amplitude_pct: legacy.max_amplitude_pct,
        soft_start_curve: legacy.soft_start_curve,
        fda_percent: legacy.fda_percent,
        smooth_switch_enable: legacy.smooth_switch_enable,
        smooth_switch_ramp_s: legacy.smooth_switch_ramp_s,
        brake_mode: legacy.brake_mode,
        brake_duration_s: legacy.brake_duration_s,
        brake_pulse_gap_s: legacy.brake_pulse_gap_s,
        brake_ramp_start_freq_hz: legacy.brake_ramp_start_freq_hz,
        brake_ramp_stop_freq_hz: legacy.brake_ramp_stop_freq_hz,
        relay_active_high: legacy.relay_active_high,
        relay_linked_to_standby: legacy.relay_linked_to_standby,
        relay_linked_to_start_stop: legacy.relay_linked_to_start_stop,
        power_on_mute_delay_s: legacy.power_on_mute_delay_s,
        auto_standby_minutes: legacy.auto_standby_minutes,
        auto_dim_minutes: legacy.auto_dim_minutes,
        boot_speed: BootSpeed::LastUsed,
        speed78_enabled: legacy.speed78_enabled,
        pitch_range_pct: legacy.pitch_range_pct,
        speeds: legacy.speeds,
        preset_names: legacy.preset_names,
    })
}

/// Append-only CSV-like fault log (§6): `millis,code,message\n` records,
/// rotated to a `.bak` file once the live file exceeds this size.
pub const ERROR_LOG_ROTATE_BYTES: usize = 10 * 1024;

/// Format one fault report as a CSV-like log line (without trailing `\n`,
/// left to the caller's writer).
pub fn format_log_line(
    buf: &mut heapless::String<96>,
    timestamp_ms: u32,
    code: u16,
    message: &str,
) -> Result<(), Error> {
    use core::fmt::Write;
    buf.clear();
    write!(buf, "{timestamp_ms},{code},{message}").map_err(|_| Error::Malformed)
}

/// Whether the log file should be rotated (current file renamed to
/// `error.bak`, a fresh `error.log` started) before appending `incoming_len`
/// more bytes.
pub fn should_rotate(current_len: usize, incoming_len: usize) -> bool {
    current_len + incoming_len > ERROR_LOG_ROTATE_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_current_schema() {
        let config = GlobalConfig::default();
        let mut buf = [0u8; MAX_RECORD_BYTES];
        let record = encode_record(&config, &mut buf).unwrap();
        let decoded = decode_record(record).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn unsupported_schema_version_is_reported() {
        let mut bytes = [0u8; 8];
        bytes[0..4].copy_from_slice(&99u32.to_le_bytes());
        let err = decode_record(&bytes).unwrap_err();
        assert_eq!(err, Error::UnsupportedSchema(99));
    }

    #[test]
    fn truncated_record_is_malformed() {
        let err = decode_record(&[1, 2, 3]).unwrap_err();
        assert_eq!(err, Error::Malformed);
    }

    fn encode_legacy<T: Serialize>(version: u32, value: &T) -> heapless::Vec<u8, MAX_RECORD_BYTES> {
        let mut payload = [0u8; MAX_RECORD_BYTES];
        let written = to_slice(value, &mut payload).unwrap();
        let mut record = heapless::Vec::<u8, MAX_RECORD_BYTES>::new();
        record.extend_from_slice(&version.to_le_bytes()).unwrap();
        record.extend_from_slice(written).unwrap();
        record
    }

    /// A genuinely v2-shaped record -- missing `fda_percent`/`boot_speed`
    /// entirely, not a current `GlobalConfig` with those two fields
    /// overwritten -- so a migrator that (wrongly) decoded it straight
    /// into `GlobalConfig` would misread every field from
    /// `smooth_switch_enable` onward, not just the two new ones.
    #[test]
    fn v2_migration_recovers_every_surviving_field() {
        let defaults = GlobalConfig::default();
        let legacy = ConfigV2 {
            phase_mode: 3,
            max_amplitude_pct: defaults.max_amplitude_pct,
            soft_start_curve: defaults.soft_start_curve,
            smooth_switch_enable: defaults.smooth_switch_enable,
            smooth_switch_ramp_s: defaults.smooth_switch_ramp_s,
            brake_mode: defaults.brake_mode,
            brake_duration_s: defaults.brake_duration_s,
            brake_pulse_gap_s: defaults.brake_pulse_gap_s,
            brake_ramp_start_freq_hz: defaults.brake_ramp_start_freq_hz,
            brake_ramp_stop_freq_hz: defaults.brake_ramp_stop_freq_hz,
            relay_active_high: defaults.relay_active_high,
            relay_linked_to_standby: defaults.relay_linked_to_standby,
            relay_linked_to_start_stop: defaults.relay_linked_to_start_stop,
            power_on_mute_delay_s: defaults.power_on_mute_delay_s,
            auto_standby_minutes: 42,
            auto_dim_minutes: defaults.auto_dim_minutes,
            speed78_enabled: defaults.speed78_enabled,
            pitch_range_pct: defaults.pitch_range_pct,
            speeds: defaults.speeds.clone(),
            preset_names: defaults.preset_names.clone(),
        };
        let record = encode_legacy(2, &legacy);

        let migrated = decode_record(&record).unwrap();
        assert_eq!(migrated.fda_percent, 0.0);
        assert_eq!(migrated.boot_speed, BootSpeed::LastUsed);
        // Fields that did exist in v2 must survive the migration unchanged,
        // proving the decode didn't shift offsets partway through.
        assert_eq!(migrated.phase_mode, 3);
        assert_eq!(migrated.auto_standby_minutes, 42);
        assert_eq!(migrated.preset_names, defaults.preset_names);
        assert_eq!(migrated.speeds, defaults.speeds);
    }

    #[test]
    fn v3_migration_keeps_fda_percent_and_fills_boot_speed() {
        let defaults = GlobalConfig::default();
        let legacy = ConfigV3 {
            phase_mode: defaults.phase_mode,
            max_amplitude_pct: defaults.max_amplitude_pct,
            soft_start_curve: defaults.soft_start_curve,
            fda_percent: 37.0,
            smooth_switch_enable: defaults.smooth_switch_enable,
            smooth_switch_ramp_s: defaults.smooth_switch_ramp_s,
            brake_mode: defaults.brake_mode,
            brake_duration_s: defaults.brake_duration_s,
            brake_pulse_gap_s: defaults.brake_pulse_gap_s,
            brake_ramp_start_freq_hz: defaults.brake_ramp_start_freq_hz,
            brake_ramp_stop_freq_hz: defaults.brake_ramp_stop_freq_hz,
            relay_active_high: defaults.relay_active_high,
            relay_linked_to_standby: defaults.relay_linked_to_standby,
            relay_linked_to_start_stop: defaults.relay_linked_to_start_stop,
            power_on_mute_delay_s: defaults.power_on_mute_delay_s,
            auto_standby_minutes: defaults.auto_standby_minutes,
            auto_dim_minutes: defaults.auto_dim_minutes,
            speed78_enabled: defaults.speed78_enabled,
            pitch_range_pct: defaults.pitch_range_pct,
            speeds: defaults.speeds.clone(),
            preset_names: defaults.preset_names.clone(),
        };
        let record = encode_legacy(3, &legacy);

        let migrated = decode_record(&record).unwrap();
        assert_eq!(migrated.fda_percent, 37.0);
        assert_eq!(migrated.boot_speed, BootSpeed::LastUsed);
        assert_eq!(migrated.speeds, defaults.speeds);
    }

    #[test]
    fn log_rotation_triggers_past_threshold() {
        assert!(!should_rotate(ERROR_LOG_ROTATE_BYTES - 10, 5));
        assert!(should_rotate(ERROR_LOG_ROTATE_BYTES - 10, 20));
    }

    #[test]
    fn log_line_formats_as_csv() {
        let mut buf = heapless::String::<96>::new();
        format_log_line(&mut buf, 12_345, 2, "stall").unwrap();
        assert_eq!(buf.as_str(), "12345,2,stall");
    }
}
