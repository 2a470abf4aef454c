//! User-facing notifications raised by attendance attempts

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

pub(crate) const LOCATION_UNAVAILABLE: &str = "Unable to get your location. \
    Please enable location services and allow location access, then try again.";
pub(crate) const MARK_FAILED: &str = "Failed to mark attendance";
pub(crate) const CLOCK_OUT_FAILED: &str = "Failed to clock out";

/// Server messages that come with generic advice.
const REMEDIATIONS: &[(&str, &str)] = &[
    (
        "location verification failed",
        "Make sure location services are on and you are inside the classroom, then try again.",
    ),
    (
        "too far from class",
        "Move closer to the classroom and try again.",
    ),
    (
        "location permission required",
        "Allow location access for this app in your device settings.",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// A single alert, dismissed automatically after its time to live
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NoticeLevel,
    pub message: String,
    pub issued_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl Notification {
    pub fn new(
        level: NoticeLevel,
        message: impl Into<String>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            issued_at,
            ttl,
        }
    }

    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => now < self.issued_at + ttl,
            Err(_) => true,
        }
    }
}

/// The server's message, followed by advice when it matches a known pattern.
pub fn with_remediation(message: &str) -> String {
    let lowered = message.to_lowercase();
    REMEDIATIONS
        .iter()
        .find(|(pattern, _)| lowered.contains(pattern))
        .map(|(_, advice)| format!("{} {}", message, advice))
        .unwrap_or_else(|| message.to_string())
}

pub(crate) fn clocked_in_message(end: DateTime<Utc>) -> String {
    format!(
        "Clocked in successfully. You can clock out after {}.",
        end.format("%H:%M UTC")
    )
}

pub(crate) fn clocked_out_message(minutes: i64) -> String {
    format!("Clocked out successfully. Time attended: {} minutes.", minutes)
}

pub(crate) fn wait_message(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!(
        "Please wait until the class ends before clocking out ({}:{:02} remaining).",
        secs / 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn known_messages_get_advice() {
        let msg = with_remediation("Too far from class (212m away)");
        assert!(msg.starts_with("Too far from class (212m away)"));
        assert!(msg.contains("Move closer"));

        assert!(with_remediation("Location verification failed").contains("location services"));
        assert!(with_remediation("Location permission required").contains("device settings"));
    }

    #[test]
    fn other_messages_are_verbatim() {
        assert_eq!(with_remediation("OTP expired"), "OTP expired");
        assert_eq!(
            with_remediation("Attendance already marked"),
            "Attendance already marked"
        );
    }

    #[test]
    fn visibility_ends_after_ttl() {
        let issued = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let notice = Notification::new(NoticeLevel::Error, "x", issued, Duration::from_secs(5));
        assert!(notice.is_visible_at(issued));
        assert!(notice.is_visible_at(issued + chrono::Duration::seconds(4)));
        assert!(!notice.is_visible_at(issued + chrono::Duration::seconds(5)));
    }

    #[test]
    fn serializes_for_display() {
        let issued = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let notice = Notification::new(
            NoticeLevel::Warning,
            "Please enter the attendance code",
            issued,
            Duration::from_secs(5),
        );
        let value = serde_json::to_value(&notice).unwrap();
        assert_eq!(value["level"], "warning");
        assert_eq!(value["message"], "Please enter the attendance code");
    }

    #[test]
    fn wait_message_formats_minutes_and_seconds() {
        assert!(wait_message(Duration::from_secs(125)).contains("2:05 remaining"));
    }
}
