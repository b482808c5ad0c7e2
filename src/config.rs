//! Data model (§3): `SpeedProfile`, `GlobalConfig`, and the validation
//! pass that enforces every post-validation invariant in §3/§7 by
//! clamping rather than rejecting.
use console::SettingKey;
use dsp::{FilterKind, FirProfile};
use core::fmt::Write as _;
use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Current on-disk schema version (§6). Bump alongside a new migrator.
pub const SCHEMA_VERSION: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoftStartCurve {
    Linear,
    SCurve,
}

impl Default for SoftStartCurve {
    fn default() -> Self {
        SoftStartCurve::SCurve
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrakeMode {
    #[default]
    Off,
    Pulse,
    Ramp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BootSpeed {
    Speed33,
    Speed45,
    Speed78,
    LastUsed,
}

impl Default for BootSpeed {
    fn default() -> Self {
        // §6 migration default for new schema fields.
        BootSpeed::LastUsed
    }
}

/// Index into `GlobalConfig::speeds`. The nominal 33 1/3, 45 and 78 RPM slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(usize)]
pub enum SpeedSlot {
    Speed33 = 0,
    Speed45 = 1,
    Speed78 = 2,
}

impl SpeedSlot {
    pub fn next(self) -> Self {
        match self {
            SpeedSlot::Speed33 => SpeedSlot::Speed45,
            SpeedSlot::Speed45 => SpeedSlot::Speed78,
            SpeedSlot::Speed78 => SpeedSlot::Speed33,
        }
    }

    pub fn from_index(i: u8) -> Option<Self> {
        match i {
            0 => Some(SpeedSlot::Speed33),
            1 => Some(SpeedSlot::Speed45),
            2 => Some(SpeedSlot::Speed78),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedProfile {
    pub nominal_freq_hz: f32,
    pub min_freq_hz: f32,
    pub max_freq_hz: f32,
    pub phase_offsets_deg: [f32; 4],
    pub soft_start_duration_s: f32,
    pub kick_mult: u8,
    pub kick_hold_duration_s: f32,
    pub kick_ramp_duration_s: f32,
    pub reduced_amplitude_pct: f32,
    pub reduced_amplitude_delay_s: f32,
    pub filter_kind: FilterKind,
    pub iir_alpha: f32,
    pub fir_profile: FirProfile,
}

impl SpeedProfile {
    pub fn at_33() -> Self {
        Self::with_nominal(33.333333)
    }

    pub fn at_45() -> Self {
        Self::with_nominal(45.0)
    }

    pub fn at_78() -> Self {
        Self::with_nominal(78.26)
    }

    fn with_nominal(nominal_rpm: f32) -> Self {
        // Default motor is a 2-phase synchronous drive geared so the DDS
        // frequency in Hz equals the RPM; boards using a different pole
        // count/gear ratio override this per-profile.
        let nominal_freq_hz = nominal_rpm;
        Self {
            nominal_freq_hz,
            min_freq_hz: nominal_freq_hz * 0.7,
            max_freq_hz: nominal_freq_hz * 1.3,
            phase_offsets_deg: [0.0, 90.0, 180.0, 270.0],
            soft_start_duration_s: 1.0,
            kick_mult: 1,
            kick_hold_duration_s: 0.0,
            kick_ramp_duration_s: 0.0,
            reduced_amplitude_pct: 100.0,
            reduced_amplitude_delay_s: 0.0,
            filter_kind: FilterKind::None,
            iir_alpha: 0.1,
            fir_profile: FirProfile::Gentle,
        }
    }

    /// Clamp/normalize every field into its documented invariant range.
    pub fn validate(&mut self) {
        if self.min_freq_hz > self.max_freq_hz {
            core::mem::swap(&mut self.min_freq_hz, &mut self.max_freq_hz);
        }
        self.nominal_freq_hz = self.nominal_freq_hz.clamp(10.0, 3000.0);
        self.min_freq_hz = self.min_freq_hz.clamp(10.0, self.nominal_freq_hz);
        self.max_freq_hz = self.max_freq_hz.max(self.nominal_freq_hz).min(3000.0);

        for offset in &mut self.phase_offsets_deg {
            *offset = normalize_degrees(*offset);
        }

        self.soft_start_duration_s = self.soft_start_duration_s.clamp(0.0, 10.0);
        self.kick_mult = self.kick_mult.clamp(1, 4);
        self.kick_hold_duration_s = self.kick_hold_duration_s.clamp(0.0, 15.0);
        self.kick_ramp_duration_s = self.kick_ramp_duration_s.clamp(0.0, 15.0);
        self.reduced_amplitude_pct = self.reduced_amplitude_pct.clamp(50.0, 100.0);
        self.reduced_amplitude_delay_s = self.reduced_amplitude_delay_s.clamp(0.0, 60.0);
        self.iir_alpha = self.iir_alpha.clamp(0.01, 0.99);
    }
}

/// Wrap a phase offset in degrees into `[0, 360)`.
pub fn normalize_degrees(mut deg: f32) -> f32 {
    deg %= 360.0;
    if deg < 0.0 {
        deg += 360.0;
    }
    deg
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub phase_mode: u8,
    pub max_amplitude_pct: f32,
    pub soft_start_curve: SoftStartCurve,
    pub fda_percent: f32,
    pub smooth_switch_enable: bool,
    pub smooth_switch_ramp_s: f32,
    pub brake_mode: BrakeMode,
    pub brake_duration_s: f32,
    pub brake_pulse_gap_s: f32,
    pub brake_ramp_start_freq_hz: f32,
    pub brake_ramp_stop_freq_hz: f32,
    pub relay_active_high: bool,
    pub relay_linked_to_standby: bool,
    pub relay_linked_to_start_stop: bool,
    pub power_on_mute_delay_s: f32,
    pub auto_standby_minutes: u16,
    pub auto_dim_minutes: u16,
    pub boot_speed: BootSpeed,
    pub speed78_enabled: bool,
    /// Pitch control span, percent either side of nominal (§4.4 "Pitch
    /// control"). Only `{10, 20, 30, 40, 50}` are valid; `validate()` snaps
    /// any other value to the nearest member of that set.
    pub pitch_range_pct: u8,
    pub speeds: [SpeedProfile; 3],
    pub preset_names: [String<16>; 5],
}

/// The only pitch-range values the hardware's pitch encoder menu offers.
pub const PITCH_RANGE_STEPS: [u8; 5] = [10, 20, 30, 40, 50];

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            phase_mode: 2,
            max_amplitude_pct: 100.0,
            soft_start_curve: SoftStartCurve::SCurve,
            fda_percent: 0.0,
            smooth_switch_enable: true,
            smooth_switch_ramp_s: 3.0,
            brake_mode: BrakeMode::Off,
            brake_duration_s: 2.0,
            brake_pulse_gap_s: 0.5,
            brake_ramp_start_freq_hz: 50.0,
            brake_ramp_stop_freq_hz: 5.0,
            relay_active_high: false,
            relay_linked_to_standby: true,
            relay_linked_to_start_stop: true,
            power_on_mute_delay_s: 1.0,
            auto_standby_minutes: 0,
            auto_dim_minutes: 0,
            boot_speed: BootSpeed::LastUsed,
            speed78_enabled: true,
            pitch_range_pct: 20,
            speeds: [
                SpeedProfile::at_33(),
                SpeedProfile::at_45(),
                SpeedProfile::at_78(),
            ],
            preset_names: [
                String::from("Preset 1"),
                String::from("Preset 2"),
                String::from("Preset 3"),
                String::from("Preset 4"),
                String::from("Preset 5"),
            ],
        }
    }
}

impl GlobalConfig {
    pub fn speed(&self, slot: SpeedSlot) -> &SpeedProfile {
        &self.speeds[slot as usize]
    }

    pub fn speed_mut(&mut self, slot: SpeedSlot) -> &mut SpeedProfile {
        &mut self.speeds[slot as usize]
    }

    /// Enforce every invariant in §3. Out-of-range configuration is never
    /// an error (§7): this clamps and continues.
    pub fn validate(&mut self) {
        self.phase_mode = self.phase_mode.clamp(1, 4);
        self.max_amplitude_pct = self.max_amplitude_pct.clamp(0.0, 100.0);
        self.fda_percent = self.fda_percent.clamp(0.0, 100.0);
        self.smooth_switch_ramp_s = self.smooth_switch_ramp_s.clamp(1.0, 5.0);
        self.brake_duration_s = self.brake_duration_s.max(0.0);
        self.brake_pulse_gap_s = self.brake_pulse_gap_s.max(0.0);
        self.power_on_mute_delay_s = self.power_on_mute_delay_s.max(0.0);
        self.pitch_range_pct = *PITCH_RANGE_STEPS
            .iter()
            .min_by_key(|&&step| (step as i16 - self.pitch_range_pct as i16).abs())
            .unwrap_or(&20);

        for speed in &mut self.speeds {
            speed.validate();
        }
    }

    /// Render `key`'s current value for the CLI `get` command (§6), reading
    /// the per-speed fields off `active_slot`'s profile. `None` for keys
    /// the OLED/menu layer owns and this core has no backing field for
    /// (§1 Non-goals) -- `brightness`, `pitch_step`, `rev_enc`,
    /// `saver_mode`.
    pub fn get_setting(&self, key: SettingKey, active_slot: SpeedSlot) -> Option<String<32>> {
        let profile = self.speed(active_slot);
        let mut out = String::new();
        let formatted = match key {
            SettingKey::Freq => write!(out, "{:.1}", profile.nominal_freq_hz),
            SettingKey::Phase1 => write!(out, "{:.1}", profile.phase_offsets_deg[0]),
            SettingKey::Phase2 => write!(out, "{:.1}", profile.phase_offsets_deg[1]),
            SettingKey::Phase3 => write!(out, "{:.1}", profile.phase_offsets_deg[2]),
            SettingKey::Phase4 => write!(out, "{:.1}", profile.phase_offsets_deg[3]),
            SettingKey::SoftStart => write!(
                out,
                "{}",
                match self.soft_start_curve {
                    SoftStartCurve::Linear => "linear",
                    SoftStartCurve::SCurve => "s_curve",
                }
            ),
            SettingKey::Kick => write!(out, "{}", profile.kick_mult),
            SettingKey::KickDur => write!(out, "{:.1}", profile.kick_ramp_duration_s),
            SettingKey::Pitch => write!(out, "{}", self.pitch_range_pct),
            SettingKey::Ramp => write!(out, "{:.1}", self.smooth_switch_ramp_s),
            SettingKey::Brightness | SettingKey::PitchStep | SettingKey::RevEnc | SettingKey::SaverMode => {
                return None;
            }
        };
        formatted.ok().map(|_| out)
    }

    /// Parse and apply `value` to `key` for the CLI `set` command (§6),
    /// then re-run [`GlobalConfig::validate`] so an out-of-range write
    /// clamps rather than sticking (§7 "Out-of-range configuration is
    /// never an error"). Returns `Err(Error::Malformed)` both for a value
    /// that fails to parse and for a key this core has no backing field
    /// for, same as [`GlobalConfig::get_setting`].
    pub fn set_setting(
        &mut self,
        key: SettingKey,
        active_slot: SpeedSlot,
        value: &str,
    ) -> Result<(), Error> {
        match key {
            SettingKey::Freq => self.speed_mut(active_slot).nominal_freq_hz = parse(value)?,
            SettingKey::Phase1 => self.speed_mut(active_slot).phase_offsets_deg[0] = parse(value)?,
            SettingKey::Phase2 => self.speed_mut(active_slot).phase_offsets_deg[1] = parse(value)?,
            SettingKey::Phase3 => self.speed_mut(active_slot).phase_offsets_deg[2] = parse(value)?,
            SettingKey::Phase4 => self.speed_mut(active_slot).phase_offsets_deg[3] = parse(value)?,
            SettingKey::SoftStart => {
                self.soft_start_curve = match value {
                    "linear" => SoftStartCurve::Linear,
                    "s_curve" => SoftStartCurve::SCurve,
                    _ => return Err(Error::Malformed),
                };
            }
            SettingKey::Kick => self.speed_mut(active_slot).kick_mult = parse(value)?,
            SettingKey::KickDur => self.speed_mut(active_slot).kick_ramp_duration_s = parse(value)?,
            SettingKey::Pitch => self.pitch_range_pct = parse(value)?,
            SettingKey::Ramp => self.smooth_switch_ramp_s = parse(value)?,
            SettingKey::Brightness | SettingKey::PitchStep | SettingKey::RevEnc | SettingKey::SaverMode => {
                return Err(Error::Malformed);
            }
        }
        self.validate();
        Ok(())
    }
}

fn parse<T: core::str::FromStr>(value: &str) -> Result<T, Error> {
    value.parse().map_err(|_| Error::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_already_valid() {
        let mut config = GlobalConfig::default();
        let before = config.clone();
        config.validate();
        assert_eq!(config, before);
    }

    #[test]
    fn inverted_min_max_are_swapped() {
        let mut speed = SpeedProfile::at_33();
        speed.min_freq_hz = 100.0;
        speed.max_freq_hz = 10.0;
        speed.nominal_freq_hz = 50.0;
        speed.validate();
        assert!(speed.min_freq_hz <= speed.nominal_freq_hz);
        assert!(speed.nominal_freq_hz <= speed.max_freq_hz);
    }

    #[test]
    fn phase_offsets_wrap_into_0_360() {
        let mut speed = SpeedProfile::at_33();
        speed.phase_offsets_deg = [-90.0, 450.0, 720.5, -720.0];
        speed.validate();
        for offset in speed.phase_offsets_deg {
            assert!((0.0..360.0).contains(&offset));
        }
        assert!((speed.phase_offsets_deg[0] - 270.0).abs() < 1e-3);
        assert!((speed.phase_offsets_deg[1] - 90.0).abs() < 1e-3);
    }

    #[test]
    fn amplitude_ceiling_never_exceeds_100() {
        let mut config = GlobalConfig::default();
        config.max_amplitude_pct = 250.0;
        config.validate();
        assert!(config.max_amplitude_pct <= 100.0);
    }

    #[test]
    fn pitch_range_snaps_to_nearest_allowed_step() {
        let mut config = GlobalConfig::default();
        config.pitch_range_pct = 23;
        config.validate();
        assert_eq!(config.pitch_range_pct, 20);
        config.pitch_range_pct = 47;
        config.validate();
        assert_eq!(config.pitch_range_pct, 50);
    }

    #[test]
    fn phase_mode_clamped_into_1_4() {
        let mut config = GlobalConfig::default();
        config.phase_mode = 9;
        config.validate();
        assert_eq!(config.phase_mode, 4);
        config.phase_mode = 0;
        config.validate();
        assert_eq!(config.phase_mode, 1);
    }

    #[test]
    fn set_then_get_round_trips_a_backed_key() {
        let mut config = GlobalConfig::default();
        config
            .set_setting(SettingKey::Freq, SpeedSlot::Speed45, "50.0")
            .unwrap();
        assert_eq!(
            config
                .get_setting(SettingKey::Freq, SpeedSlot::Speed45)
                .unwrap()
                .as_str(),
            "50.0"
        );
        // Unaffected speed slots are untouched.
        assert_eq!(config.speed(SpeedSlot::Speed33).nominal_freq_hz, 33.333333);
    }

    #[test]
    fn set_validates_and_clamps_out_of_range_values() {
        let mut config = GlobalConfig::default();
        config
            .set_setting(SettingKey::Kick, SpeedSlot::Speed33, "9")
            .unwrap();
        assert_eq!(config.speed(SpeedSlot::Speed33).kick_mult, 4);
    }

    #[test]
    fn set_rejects_an_unparsable_value() {
        let mut config = GlobalConfig::default();
        let err = config
            .set_setting(SettingKey::Pitch, SpeedSlot::Speed33, "not-a-number")
            .unwrap_err();
        assert_eq!(err, Error::Malformed);
    }

    #[test]
    fn soft_start_key_round_trips_by_name() {
        let mut config = GlobalConfig::default();
        config
            .set_setting(SettingKey::SoftStart, SpeedSlot::Speed33, "linear")
            .unwrap();
        assert_eq!(config.soft_start_curve, SoftStartCurve::Linear);
        assert_eq!(
            config
                .get_setting(SettingKey::SoftStart, SpeedSlot::Speed33)
                .unwrap()
                .as_str(),
            "linear"
        );
        let err = config
            .set_setting(SettingKey::SoftStart, SpeedSlot::Speed33, "bogus")
            .unwrap_err();
        assert_eq!(err, Error::Malformed);
    }

    #[test]
    fn menu_owned_keys_are_not_handled_by_this_core() {
        let config = GlobalConfig::default();
        assert!(config
            .get_setting(SettingKey::Brightness, SpeedSlot::Speed33)
            .is_none());
        assert!(config
            .get_setting(SettingKey::SaverMode, SpeedSlot::Speed33)
            .is_none());

        let mut config = GlobalConfig::default();
        assert_eq!(
            config
                .set_setting(SettingKey::RevEnc, SpeedSlot::Speed33, "1")
                .unwrap_err(),
            Error::Malformed
        );
        assert_eq!(
            config
                .set_setting(SettingKey::PitchStep, SpeedSlot::Speed33, "1")
                .unwrap_err(),
            Error::Malformed
        );
    }
}
