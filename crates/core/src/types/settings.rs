//! Print settings for a draft order.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors from parsing a named setting update.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// The setting name is not one of `color`, `duplex`, `copies`.
    #[error("unknown setting: {0}")]
    UnknownKey(String),
    /// The value cannot be parsed for this setting.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Setting name.
        key: SettingKey,
        /// Raw value that failed to parse.
        value: String,
    },
}

/// Color, duplex and copy count for every document in the order.
///
/// Defaults are mono, single-sided, one copy. `copies` is never below 1, even
/// when deserialized from a server payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawPrintSettings")]
pub struct PrintSettings {
    pub color: bool,
    pub duplex: bool,
    copies: u32,
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            color: false,
            duplex: false,
            copies: 1,
        }
    }
}

#[derive(Deserialize)]
struct RawPrintSettings {
    #[serde(default)]
    color: bool,
    #[serde(default)]
    duplex: bool,
    #[serde(default)]
    copies: u32,
}

impl From<RawPrintSettings> for PrintSettings {
    fn from(raw: RawPrintSettings) -> Self {
        Self::new(raw.color, raw.duplex, raw.copies)
    }
}

impl PrintSettings {
    /// Minimum copy count.
    pub const MIN_COPIES: u32 = 1;

    /// Build settings, clamping `copies` to at least one.
    #[must_use]
    pub fn new(color: bool, duplex: bool, copies: u32) -> Self {
        Self {
            color,
            duplex,
            copies: copies.max(Self::MIN_COPIES),
        }
    }

    /// Number of copies (always `>= 1`).
    #[must_use]
    pub const fn copies(&self) -> u32 {
        self.copies
    }

    /// Apply a single keyed update.
    pub fn apply(&mut self, update: SettingUpdate) {
        match update {
            SettingUpdate::Color(color) => self.color = color,
            SettingUpdate::Duplex(duplex) => self.duplex = duplex,
            SettingUpdate::Copies(copies) => {
                self.copies = u32::try_from(copies.max(i64::from(Self::MIN_COPIES)))
                    .unwrap_or(u32::MAX);
            }
        }
    }
}

/// Names of the individual settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    Color,
    Duplex,
    Copies,
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color => write!(f, "color"),
            Self::Duplex => write!(f, "duplex"),
            Self::Copies => write!(f, "copies"),
        }
    }
}

impl FromStr for SettingKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "color" => Ok(Self::Color),
            "duplex" => Ok(Self::Duplex),
            "copies" => Ok(Self::Copies),
            other => Err(SettingsError::UnknownKey(other.to_string())),
        }
    }
}

/// One setting change. Copies are signed so out-of-range input from a form
/// can be clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingUpdate {
    Color(bool),
    Duplex(bool),
    Copies(i64),
}

impl SettingUpdate {
    /// The key this update targets.
    #[must_use]
    pub const fn key(&self) -> SettingKey {
        match self {
            Self::Color(_) => SettingKey::Color,
            Self::Duplex(_) => SettingKey::Duplex,
            Self::Copies(_) => SettingKey::Copies,
        }
    }

    /// Parse a `(name, value)` pair as submitted by a settings form.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::UnknownKey` for an unrecognized name and
    /// `SettingsError::InvalidValue` when the value does not parse.
    pub fn parse(key: &str, value: &str) -> Result<Self, SettingsError> {
        let key: SettingKey = key.parse()?;
        let raw = value.trim();
        let invalid = || SettingsError::InvalidValue {
            key,
            value: value.to_string(),
        };

        match key {
            SettingKey::Color => parse_flag(raw).map(Self::Color).ok_or_else(invalid),
            SettingKey::Duplex => parse_flag(raw).map(Self::Duplex).ok_or_else(invalid),
            SettingKey::Copies => raw.parse::<i64>().map(Self::Copies).map_err(|_| invalid()),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = PrintSettings::default();
        assert!(!settings.color);
        assert!(!settings.duplex);
        assert_eq!(settings.copies(), 1);
    }

    #[test]
    fn test_copies_clamp_to_one() {
        let mut settings = PrintSettings::default();
        settings.apply(SettingUpdate::Copies(0));
        assert_eq!(settings.copies(), 1);
        settings.apply(SettingUpdate::Copies(-5));
        assert_eq!(settings.copies(), 1);
        settings.apply(SettingUpdate::Copies(3));
        assert_eq!(settings.copies(), 3);
        assert_eq!(PrintSettings::new(true, false, 0).copies(), 1);
    }

    #[test]
    fn test_huge_copy_count_saturates() {
        let mut settings = PrintSettings::default();
        settings.apply(SettingUpdate::Copies(i64::MAX));
        assert_eq!(settings.copies(), u32::MAX);
    }

    #[test]
    fn test_parse_named_updates() {
        assert_eq!(
            SettingUpdate::parse("color", "true").unwrap(),
            SettingUpdate::Color(true)
        );
        assert_eq!(
            SettingUpdate::parse("duplex", "off").unwrap(),
            SettingUpdate::Duplex(false)
        );
        assert_eq!(
            SettingUpdate::parse("copies", " 4 ").unwrap(),
            SettingUpdate::Copies(4)
        );
        assert!(matches!(
            SettingUpdate::parse("staple", "true"),
            Err(SettingsError::UnknownKey(_))
        ));
        assert!(matches!(
            SettingUpdate::parse("copies", "many"),
            Err(SettingsError::InvalidValue {
                key: SettingKey::Copies,
                ..
            })
        ));
    }

    #[test]
    fn test_deserialized_settings_keep_server_copies() {
        let settings: PrintSettings =
            serde_json::from_str(r#"{"color":true,"duplex":true,"copies":2}"#).unwrap();
        assert_eq!(settings, PrintSettings::new(true, true, 2));

        let clamped: PrintSettings = serde_json::from_str(r#"{"copies":0}"#).unwrap();
        assert_eq!(clamped.copies(), 1);
    }
}
