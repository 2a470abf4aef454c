//! Wire models for the Attendance API

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Body of `POST /attendance/mark`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    pub otp: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_resolution: Option<String>,
}

/// Body of `POST /attendance/clock-out`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockOutRequest {
    pub otp: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Response of `POST /attendance/mark`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub attendance: Option<AttendanceRecord>,
    /// Set when the session requires an explicit clock-out.
    #[serde(default)]
    pub is_clocked_in: bool,
    #[serde(default)]
    pub session_end_time: Option<DateTime<Utc>>,
}

impl MarkAttendanceResponse {
    /// End of the session the clock-in belongs to.
    ///
    /// Prefers the explicit `sessionEndTime` and falls back to the
    /// `validUntil` of the session embedded in the attendance record.
    pub fn resolved_session_end(&self) -> Option<DateTime<Utc>> {
        self.session_end_time.or_else(|| {
            self.attendance
                .as_ref()
                .and_then(|a| a.session.as_ref())
                .map(|s| s.valid_until)
        })
    }
}

/// Response of `POST /attendance/clock-out`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockOutResponse {
    /// Attended time in whole minutes; fractional values are rounded.
    #[serde(deserialize_with = "whole_minutes")]
    pub time_elapsed: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub attendance: Option<AttendanceRecord>,
}

fn whole_minutes<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let minutes = f64::deserialize(deserializer)?;
    if !minutes.is_finite() || minutes < 0.0 {
        return Err(de::Error::custom(format!("invalid elapsed minutes: {}", minutes)));
    }
    Ok(minutes.round() as i64)
}

/// Attendance status as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    ClockedIn,
    ClockedOut,
    Present,
    Late,
    Absent,
    #[serde(other)]
    Unknown,
}

/// One attendance record of the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub clock_in_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clock_out_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<AttendanceStatus>,
    #[serde(default)]
    pub session: Option<SessionSummary>,
}

impl AttendanceRecord {
    /// Clocked in and still waiting for a clock-out.
    pub fn is_open_clock_in(&self) -> bool {
        self.clock_in_time.is_some()
            && (self.clock_out_time.is_none() || self.status == Some(AttendanceStatus::ClockedIn))
    }
}

/// Server-issued attendance session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    pub otp: String,
    pub valid_until: DateTime<Utc>,
    #[serde(default, alias = "classId")]
    pub class: Option<ClassRef>,
}

impl SessionSummary {
    pub fn class_id(&self) -> Option<&str> {
        match self.class.as_ref()? {
            ClassRef::Id(id) => Some(id),
            ClassRef::Summary(summary) => summary.id.as_deref(),
        }
    }
}

/// A class either referenced by id or embedded as a summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassRef {
    Id(String),
    Summary(ClassSummary),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// `GET /attendance` returns either a bare list or a wrapped one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AttendanceList {
    Bare(Vec<AttendanceRecord>),
    Wrapped {
        #[serde(alias = "records", alias = "data")]
        attendance: Vec<AttendanceRecord>,
    },
}

impl AttendanceList {
    pub(crate) fn into_records(self) -> Vec<AttendanceRecord> {
        match self {
            AttendanceList::Bare(records) => records,
            AttendanceList::Wrapped { attendance } => attendance,
        }
    }
}
