//! Time-to-live classes a writer can request

use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown active duration: {0:?}")]
pub struct UnknownDuration(pub String);

/// How long a secret stays readable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ActiveDuration {
    #[default]
    OneHour,
    TwoHours,
    TwelveHours,
    TwentyFourHours,
}

impl ActiveDuration {
    pub const ALL: [ActiveDuration; 4] = [
        Self::OneHour,
        Self::TwoHours,
        Self::TwelveHours,
        Self::TwentyFourHours,
    ];

    /// Map a requested value to a duration class. Absent and unrecognised
    /// values fall back to one hour.
    pub fn normalize(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneHour => "1h",
            Self::TwoHours => "2h",
            Self::TwelveHours => "12h",
            Self::TwentyFourHours => "24h",
        }
    }

    pub fn hours(&self) -> i64 {
        match self {
            Self::OneHour => 1,
            Self::TwoHours => 2,
            Self::TwelveHours => 12,
            Self::TwentyFourHours => 24,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::hours(self.hours())
    }
}

impl FromStr for ActiveDuration {
    type Err = UnknownDuration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Self::OneHour),
            "2h" => Ok(Self::TwoHours),
            "12h" => Ok(Self::TwelveHours),
            "24h" => Ok(Self::TwentyFourHours),
            other => Err(UnknownDuration(other.to_string())),
        }
    }
}

impl std::fmt::Display for ActiveDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
