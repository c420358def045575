//! Observable sync status and scheduler interval presets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::SyncError;

/// Engine state visible to callers.
///
/// Transitions: `Idle -> Syncing -> {Completed, Failed} -> Idle`. A pass
/// that ends because the session disappeared returns to `Idle` without
/// passing through `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Completed,
    Failed { reason: String },
}

impl SyncStatus {
    pub fn is_syncing(&self) -> bool {
        matches!(self, SyncStatus::Syncing)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "idle"),
            SyncStatus::Syncing => write!(f, "syncing"),
            SyncStatus::Completed => write!(f, "completed"),
            SyncStatus::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Scheduler cadence presets.
///
/// Persisted in the settings store under `sync_interval` as the short
/// string form ("30m", "1h", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncInterval {
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "3h")]
    ThreeHours,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl SyncInterval {
    pub fn as_secs(&self) -> u64 {
        match self {
            SyncInterval::ThirtyMinutes => 30 * 60,
            SyncInterval::OneHour => 60 * 60,
            SyncInterval::ThreeHours => 3 * 60 * 60,
            SyncInterval::SixHours => 6 * 60 * 60,
            SyncInterval::OneDay => 24 * 60 * 60,
        }
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.as_secs())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncInterval::ThirtyMinutes => "30m",
            SyncInterval::OneHour => "1h",
            SyncInterval::ThreeHours => "3h",
            SyncInterval::SixHours => "6h",
            SyncInterval::OneDay => "1d",
        }
    }

    pub const ALL: [SyncInterval; 5] = [
        SyncInterval::ThirtyMinutes,
        SyncInterval::OneHour,
        SyncInterval::ThreeHours,
        SyncInterval::SixHours,
        SyncInterval::OneDay,
    ];
}

impl Default for SyncInterval {
    fn default() -> Self {
        SyncInterval::OneHour
    }
}

impl fmt::Display for SyncInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncInterval {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "30m" => Ok(SyncInterval::ThirtyMinutes),
            "1h" => Ok(SyncInterval::OneHour),
            "3h" => Ok(SyncInterval::ThreeHours),
            "6h" => Ok(SyncInterval::SixHours),
            "1d" => Ok(SyncInterval::OneDay),
            other => Err(SyncError::InvalidInterval(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_string_round_trip() {
        for interval in SyncInterval::ALL {
            assert_eq!(interval.as_str().parse::<SyncInterval>().unwrap(), interval);
        }
    }

    #[test]
    fn unknown_interval_is_rejected() {
        assert!(matches!(
            "45m".parse::<SyncInterval>(),
            Err(SyncError::InvalidInterval(_))
        ));
    }

    #[test]
    fn interval_durations() {
        assert_eq!(SyncInterval::ThirtyMinutes.as_secs(), 1800);
        assert_eq!(SyncInterval::OneDay.as_secs(), 86400);
    }

    #[test]
    fn status_serializes_with_state_tag() {
        let json = serde_json::to_value(SyncStatus::Failed {
            reason: "network down".into(),
        })
        .unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["reason"], "network down");
    }
}
