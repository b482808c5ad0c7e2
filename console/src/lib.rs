//! Line-oriented CLI surface (115200 baud, newline-terminated commands).
//!
//! Grounded in the teacher's `serial-settings` member crate (referenced
//! from the root `Cargo.toml` as a workspace path dependency): a small
//! declarative command table driving a serial console, rather than a
//! hand-rolled byte-by-byte state machine.
#![no_std]

use heapless::String;

/// A settings key accepted by `get`/`set`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingKey {
    Brightness,
    Ramp,
    PitchStep,
    RevEnc,
    SaverMode,
    Freq,
    Phase1,
    Phase2,
    Phase3,
    Phase4,
    SoftStart,
    Kick,
    KickDur,
    Pitch,
}

impl SettingKey {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "brightness" => Self::Brightness,
            "ramp" => Self::Ramp,
            "pitch_step" => Self::PitchStep,
            "rev_enc" => Self::RevEnc,
            "saver_mode" => Self::SaverMode,
            "freq" => Self::Freq,
            "phase1" => Self::Phase1,
            "phase2" => Self::Phase2,
            "phase3" => Self::Phase3,
            "phase4" => Self::Phase4,
            "soft_start" => Self::SoftStart,
            "kick" => Self::Kick,
            "kick_dur" => Self::KickDur,
            "pitch" => Self::Pitch,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Ramp => "ramp",
            Self::PitchStep => "pitch_step",
            Self::RevEnc => "rev_enc",
            Self::SaverMode => "saver_mode",
            Self::Freq => "freq",
            Self::Phase1 => "phase1",
            Self::Phase2 => "phase2",
            Self::Phase3 => "phase3",
            Self::Phase4 => "phase4",
            Self::SoftStart => "soft_start",
            Self::Kick => "kick",
            Self::KickDur => "kick_dur",
            Self::Pitch => "pitch",
        }
    }
}

/// The full set of keys, for `list`.
pub const ALL_KEYS: [SettingKey; 14] = [
    SettingKey::Brightness,
    SettingKey::Ramp,
    SettingKey::PitchStep,
    SettingKey::RevEnc,
    SettingKey::SaverMode,
    SettingKey::Freq,
    SettingKey::Phase1,
    SettingKey::Phase2,
    SettingKey::Phase3,
    SettingKey::Phase4,
    SettingKey::SoftStart,
    SettingKey::Kick,
    SettingKey::KickDur,
    SettingKey::Pitch,
];

/// A parsed CLI command, ready for dispatch against the motor controller.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Speed(u8),
    CycleSpeed,
    ToggleStandby,
    ResetPitch,
    Status,
    List,
    Get(SettingKey),
    Set(SettingKey, String<32>),
    ErrorDump,
    ErrorClear,
    FactoryReset,
    Help,
}

/// Parse error: carries the single-line message the CLI should echo back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError(pub &'static str);

/// Parse one newline-terminated command line (newline already stripped).
pub fn parse_line(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let mut tokens = line.split_whitespace();
    let head = tokens.next().ok_or(ParseError("error: empty command"))?;

    match head {
        "start" => Ok(Command::Start),
        "stop" => Ok(Command::Stop),
        "speed" => {
            let n = tokens
                .next()
                .ok_or(ParseError("error: speed requires an argument"))?;
            let n: u8 = n
                .parse()
                .map_err(|_| ParseError("error: speed argument must be 0..2"))?;
            if n > 2 {
                return Err(ParseError("error: speed argument must be 0..2"));
            }
            Ok(Command::Speed(n))
        }
        "s" => Ok(Command::CycleSpeed),
        "t" => Ok(Command::ToggleStandby),
        "p" => Ok(Command::ResetPitch),
        "status" | "i" => Ok(Command::Status),
        "list" => Ok(Command::List),
        "get" => {
            let key = tokens
                .next()
                .and_then(SettingKey::parse)
                .ok_or(ParseError("error: unknown key"))?;
            Ok(Command::Get(key))
        }
        "set" => {
            let key = tokens
                .next()
                .and_then(SettingKey::parse)
                .ok_or(ParseError("error: unknown key"))?;
            let value = tokens
                .next()
                .ok_or(ParseError("error: set requires a value"))?;
            let value = String::from(value);
            Ok(Command::Set(key, value))
        }
        "error" => match tokens.next() {
            Some("dump") => Ok(Command::ErrorDump),
            Some("clear") => Ok(Command::ErrorClear),
            _ => Err(ParseError("error: expected 'dump' or 'clear'")),
        },
        "f" => Ok(Command::FactoryReset),
        "help" => Ok(Command::Help),
        _ => Err(ParseError("error: unknown command")),
    }
}
