//! Shared vocabulary types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier of one alert instance
pub type AlertId = Uuid;

/// Role of a connected field device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    /// Worker-worn wearable that receives alerts and acknowledges them
    Band,
    /// Fixed device that sounds on escalation
    Siren,
    /// Observer receiving all lifecycle and log events
    Dashboard,
}

/// Error for role strings outside the known set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown device role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for DeviceRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "band" => Ok(DeviceRole::Band),
            "siren" => Ok(DeviceRole::Siren),
            "dashboard" => Ok(DeviceRole::Dashboard),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl DeviceRole {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceRole::Band => "band",
            DeviceRole::Siren => "siren",
            DeviceRole::Dashboard => "dashboard",
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for severity values outside 1..=3
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("severity out of range: {0} (expected 1..=3)")]
pub struct InvalidSeverity(pub u8);

/// Alert severity, 1 (low) to 3 (high)
///
/// Serialized as its integer value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Severity {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::High
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> u8 {
        severity as u8
    }
}

impl TryFrom<u8> for Severity {
    type Error = InvalidSeverity;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Severity::Low),
            2 => Ok(Severity::Medium),
            3 => Ok(Severity::High),
            other => Err(InvalidSeverity(other)),
        }
    }
}

impl Severity {
    /// Derive severity from a scenario magnitude: ceil, clamped to 1..=3.
    ///
    /// Non-finite magnitudes map to high so a garbled scenario errs on
    /// the loud side.
    pub fn from_magnitude(magnitude: f64) -> Severity {
        if !magnitude.is_finite() {
            return Severity::High;
        }
        match magnitude.ceil() as i64 {
            i64::MIN..=1 => Severity::Low,
            2 => Severity::Medium,
            _ => Severity::High,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("band".parse::<DeviceRole>(), Ok(DeviceRole::Band));
        assert_eq!("Siren".parse::<DeviceRole>(), Ok(DeviceRole::Siren));
        assert_eq!("DASHBOARD".parse::<DeviceRole>(), Ok(DeviceRole::Dashboard));
        assert!("drone".parse::<DeviceRole>().is_err());
    }

    #[test]
    fn test_severity_bounds() {
        assert_eq!(Severity::try_from(1), Ok(Severity::Low));
        assert_eq!(Severity::try_from(3), Ok(Severity::High));
        assert!(Severity::try_from(0).is_err());
        assert!(Severity::try_from(4).is_err());
        assert_eq!(Severity::default(), Severity::High);
    }

    #[test]
    fn test_magnitude_mapping() {
        assert_eq!(Severity::from_magnitude(0.3), Severity::Low);
        assert_eq!(Severity::from_magnitude(1.0), Severity::Low);
        assert_eq!(Severity::from_magnitude(1.2), Severity::Medium);
        assert_eq!(Severity::from_magnitude(2.0), Severity::Medium);
        assert_eq!(Severity::from_magnitude(2.1), Severity::High);
        assert_eq!(Severity::from_magnitude(7.8), Severity::High);
        assert_eq!(Severity::from_magnitude(-4.0), Severity::Low);
        assert_eq!(Severity::from_magnitude(f64::NAN), Severity::High);
    }

    proptest! {
        #[test]
        fn magnitude_always_in_range(magnitude in -100.0f64..100.0) {
            let severity = Severity::from_magnitude(magnitude) as u8;
            prop_assert!((1..=3).contains(&severity));
        }
    }
}
