//! Presentation helpers shared by the region list and the offline viewer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classified severity of a threat level label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
    Safe,
    Unknown,
}

impl Severity {
    /// Case-insensitive; anything unrecognised is `Unknown`.
    pub fn from_level(level: &str) -> Self {
        match level.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            "safe" => Self::Safe,
            _ => Self::Unknown,
        }
    }

    /// Map pin color
    pub fn marker_color(&self) -> &'static str {
        match self {
            Self::High => "#FF0000",
            Self::Medium => "#FFA500",
            Self::Low => "#FFFF00",
            Self::Safe => "#00FF00",
            Self::Unknown => "#808080",
        }
    }
}

/// Relative age label for a threat report, e.g. "5 mins ago".
///
/// Empty when the timestamp is missing or not RFC 3339.
pub fn time_ago(timestamp: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(reported) = timestamp.and_then(|t| DateTime::parse_from_rfc3339(t).ok()) else {
        return String::new();
    };

    let minutes = (now - reported.with_timezone(&Utc)).num_minutes();
    if minutes < 60 {
        format!("{} mins ago", minutes)
    } else if minutes < 1440 {
        format!("{} hours ago", minutes / 60)
    } else {
        format!("{} days ago", minutes / 1440)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ThreatLevel;

    #[test]
    fn test_severity_classification() {
        assert_eq!(Severity::from_level("HIGH"), Severity::High);
        assert_eq!(Severity::from_level("Medium"), Severity::Medium);
        assert_eq!(Severity::from_level("low"), Severity::Low);
        assert_eq!(Severity::from_level("safe"), Severity::Safe);
        assert_eq!(Severity::from_level("critical"), Severity::Unknown);
        assert_eq!(ThreatLevel::new("High").severity(), Severity::High);
    }

    #[test]
    fn test_marker_colors() {
        assert_eq!(Severity::High.marker_color(), "#FF0000");
        assert_eq!(Severity::Unknown.marker_color(), "#808080");
    }

    #[test]
    fn test_time_ago() {
        let now = DateTime::parse_from_rfc3339("2024-01-03T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(time_ago(Some("2024-01-03T11:55:30Z"), now), "4 mins ago");
        assert_eq!(time_ago(Some("2024-01-03T09:00:00Z"), now), "3 hours ago");
        assert_eq!(time_ago(Some("2024-01-01T11:00:00Z"), now), "2 days ago");
        assert_eq!(time_ago(None, now), "");
        assert_eq!(time_ago(Some("yesterday"), now), "");
    }
}
