use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DomainError;

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum whose
/// wire form is a fixed snake_case string.
macro_rules! wire_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(DomainError::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Clinic,
}

wire_enum!(Role, "role", { Patient => "patient", Clinic => "clinic" });

/// Lifecycle of one scheduled dose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseStatus {
    Pending,
    Taken,
    Skipped,
    Missed,
}

wire_enum!(DoseStatus, "dose status", {
    Pending => "pending",
    Taken => "taken",
    Skipped => "skipped",
    Missed => "missed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalKind {
    BloodPressure,
    Weight,
    HeartRate,
    Glucose,
}

wire_enum!(VitalKind, "vital type", {
    BloodPressure => "blood_pressure",
    Weight => "weight",
    HeartRate => "heart_rate",
    Glucose => "glucose",
});

impl VitalKind {
    /// Unit assumed when a measurement arrives without one.
    pub fn default_unit(&self) -> &'static str {
        match self {
            Self::BloodPressure => "mmHg",
            Self::Weight => "kg",
            Self::HeartRate => "bpm",
            Self::Glucose => "mg/dL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    MissedMedication,
    HighBp,
    LowAdherence,
}

wire_enum!(AlertKind, "alert type", {
    MissedMedication => "missed_medication",
    HighBp => "high_bp",
    LowAdherence => "low_adherence",
});

impl AlertKind {
    /// Prefix of the per-patient alert id (`missed_<patientId>`).
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::MissedMedication => "missed",
            Self::HighBp => "bp",
            Self::LowAdherence => "adherence",
        }
    }

    pub fn from_id_prefix(prefix: &str) -> Option<Self> {
        [Self::MissedMedication, Self::HighBp, Self::LowAdherence]
            .into_iter()
            .find(|kind| kind.id_prefix() == prefix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

wire_enum!(Severity, "severity", { Low => "low", Medium => "medium", High => "high" });

// ---------------------------------------------------------------------------
// TimeOfDay
// ---------------------------------------------------------------------------

/// A clock time with minute precision, written as zero-padded `HH:MM`.
///
/// Ordering follows the clock, which is the same as the lexicographic order
/// of the string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = DomainError;

    /// Accepts `HH:MM`, and `HH:MM:SS` with zero seconds (the form SQL `time`
    /// columns come back in).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidTime(s.to_string());
        let trimmed = s.trim();

        let mut parts = trimmed.split(':');
        let (Some(h), Some(m)) = (parts.next(), parts.next()) else {
            return Err(invalid());
        };
        if let Some(sec) = parts.next() {
            if sec != "00" || parts.next().is_some() {
                return Err(invalid());
            }
        }
        if h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }

        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
