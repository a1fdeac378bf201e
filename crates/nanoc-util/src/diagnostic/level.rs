//! Diagnostic/logging severity levels.
//!
//! Mirrors the six-level scale exposed on the command line: each level
//! includes everything above it, so selecting `Warn` also prints `Error`,
//! selecting `Info` also prints `Warn` and `Error`, and so on down to
//! `InfoLowLevel`, the most verbose setting.

use std::fmt;

/// A diagnostic's severity, and also the CLI's verbosity threshold.
///
/// # Examples
///
/// ```
/// use nanoc_util::diagnostic::Level;
///
/// assert!(Level::Error.is_error());
/// assert!(!Level::Warn.is_error());
/// assert!(Level::Warn > Level::Error);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Suppresses all output.
    None,
    Error,
    Warn,
    Info,
    InfoMediumLevel,
    InfoLowLevel,
}

impl Level {
    /// Parses the numeric CLI argument form (`0`..`5`).
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Level::None),
            1 => Some(Level::Error),
            2 => Some(Level::Warn),
            3 => Some(Level::Info),
            4 => Some(Level::InfoMediumLevel),
            5 => Some(Level::InfoLowLevel),
            _ => None,
        }
    }

    /// Parses the symbolic CLI argument form (`"WARN"`, `"INFO_LOW_LEVEL"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NONE" => Some(Level::None),
            "ERROR" => Some(Level::Error),
            "WARN" => Some(Level::Warn),
            "INFO" => Some(Level::Info),
            "INFO_MEDIUM_LEVEL" => Some(Level::InfoMediumLevel),
            "INFO_LOW_LEVEL" => Some(Level::InfoLowLevel),
            _ => None,
        }
    }

    pub const fn is_error(self) -> bool {
        matches!(self, Level::Error)
    }

    pub const fn is_warning(self) -> bool {
        matches!(self, Level::Warn)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::None => "none",
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::InfoMediumLevel => "info_medium_level",
            Level::InfoLowLevel => "info_low_level",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_and_named_forms_identically() {
        assert_eq!(Level::from_index(2), Level::from_name("WARN"));
    }

    #[test]
    fn ordering_matches_verbosity() {
        assert!(Level::None < Level::Error);
        assert!(Level::Error < Level::InfoLowLevel);
    }

    #[test]
    fn rejects_unknown_values() {
        assert_eq!(Level::from_index(9), None);
        assert_eq!(Level::from_name("VERBOSE"), None);
    }
}
