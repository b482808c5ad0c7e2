//! Crate-wide error kinds and the fault-report policy of §7.
use heapless::String;

/// Internal fallible-operation error type. Distinct from [`ErrorKind`],
/// which is the externally-reported fault taxonomy surfaced to the UI/log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// A persisted settings/preset blob failed CRC or schema validation.
    SettingsCorrupt,
    /// A migration path does not exist for the stored schema version.
    UnsupportedSchema(u32),
    /// The flash/storage backend returned an I/O failure.
    StorageFailure,
    /// A CLI or configuration value was outside its accepted shape (not the
    /// same as an out-of-range *value*, which is clamped, never rejected).
    Malformed,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::SettingsCorrupt => write!(f, "settings corrupt"),
            Error::UnsupportedSchema(v) => write!(f, "unsupported schema version {v}"),
            Error::StorageFailure => write!(f, "storage failure"),
            Error::Malformed => write!(f, "malformed input"),
        }
    }
}

/// Externally-reported fault kinds (§7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    SystemFreeze,
    MotorStall,
    SettingsCorrupt,
    I2CFailure,
    OutOfMemory,
}

/// A single fault report, as logged to `error.log` and surfaced to the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String<64>,
    pub critical: bool,
    pub timestamp_ms: u32,
}

impl ErrorReport {
    pub fn new(kind: ErrorKind, message: &str, critical: bool, timestamp_ms: u32) -> Self {
        Self {
            kind,
            message: String::from(message),
            critical,
            timestamp_ms,
        }
    }

    /// Minimum seconds the UI must display this report (§7: critical errors
    /// clamp to at least 10 s).
    pub fn display_duration_s(&self, configured_duration_s: u32) -> u32 {
        if self.critical {
            configured_duration_s.max(10)
        } else {
            configured_duration_s
        }
    }
}

/// Sink for fault reports: applies the local-recovery / surfaced / fatal
/// policy of §7 without forcing the motor state machine out of its current
/// state. The fatal path (driving all mute relays inactive) is performed by
/// the caller (the control core's tick), which owns relay GPIOs; this type
/// only tracks the sticky flag and latest report for the UI.
#[derive(Default)]
pub struct ErrorHandler {
    has_critical_error: bool,
    latest: Option<ErrorReport>,
}

impl ErrorHandler {
    pub fn report(&mut self, report: ErrorReport) -> &ErrorReport {
        if report.critical {
            self.has_critical_error = true;
        }
        self.latest = Some(report);
        // Note(unwrap): just inserted above.
        self.latest.as_ref().unwrap()
    }

    pub fn has_critical_error(&self) -> bool {
        self.has_critical_error
    }

    /// User-initiated recovery: clears the sticky flag. Does not touch the
    /// motor state machine, which recovers independently.
    pub fn acknowledge(&mut self) {
        self.has_critical_error = false;
    }

    pub fn latest(&self) -> Option<&ErrorReport> {
        self.latest.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_report_sets_sticky_flag() {
        let mut handler = ErrorHandler::default();
        handler.report(ErrorReport::new(ErrorKind::MotorStall, "stall", true, 0));
        assert!(handler.has_critical_error());
    }

    #[test]
    fn non_critical_report_does_not_set_sticky_flag() {
        let mut handler = ErrorHandler::default();
        handler.report(ErrorReport::new(ErrorKind::I2CFailure, "i2c glitch", false, 0));
        assert!(!handler.has_critical_error());
    }

    #[test]
    fn critical_display_duration_clamps_to_at_least_ten_seconds() {
        let report = ErrorReport::new(ErrorKind::SystemFreeze, "freeze", true, 0);
        assert_eq!(report.display_duration_s(3), 10);
        assert_eq!(report.display_duration_s(15), 15);
    }

    #[test]
    fn acknowledge_clears_sticky_flag_without_touching_latest() {
        let mut handler = ErrorHandler::default();
        handler.report(ErrorReport::new(ErrorKind::MotorStall, "stall", true, 0));
        handler.acknowledge();
        assert!(!handler.has_critical_error());
        assert!(handler.latest().is_some());
    }
}
