//! Clock state and its derivation from attendance history

use super::time::remaining_until;
use chrono::{DateTime, Utc};
use log::warn;
use rollcall_api::{AttendanceRecord, SessionSummary};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Where the controller is in an attendance attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Submitting,
    ClockedIn,
    ClockingOut,
}

impl Phase {
    /// A request is running and no new attempt may start.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Phase::Submitting | Phase::ClockingOut)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Submitting => "submitting",
            Phase::ClockedIn => "clocked in",
            Phase::ClockingOut => "clocking out",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockStatus {
    NotClockedIn,
    ClockedIn,
    /// Terminal for the session
    ClockedOut,
}

/// Client-side view of the caller's clock-in.
///
/// A `ClockedIn` state always carries the OTP and the session end; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClockState {
    status: ClockStatus,
    active_otp: Option<String>,
    session_end_time: Option<DateTime<Utc>>,
    time_remaining: Duration,
}

impl Default for ClockState {
    fn default() -> Self {
        Self::not_clocked_in()
    }
}

impl ClockState {
    pub fn not_clocked_in() -> Self {
        Self {
            status: ClockStatus::NotClockedIn,
            active_otp: None,
            session_end_time: None,
            time_remaining: Duration::ZERO,
        }
    }

    pub fn clocked_in(otp: &str, session_end_time: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            status: ClockStatus::ClockedIn,
            active_otp: Some(otp.to_string()),
            session_end_time: Some(session_end_time),
            time_remaining: remaining_until(session_end_time, now),
        }
    }

    pub fn clocked_out() -> Self {
        Self {
            status: ClockStatus::ClockedOut,
            ..Self::not_clocked_in()
        }
    }

    pub fn status(&self) -> ClockStatus {
        self.status
    }

    pub fn active_otp(&self) -> Option<&str> {
        self.active_otp.as_deref()
    }

    pub fn session_end_time(&self) -> Option<DateTime<Utc>> {
        self.session_end_time
    }

    /// Value as of the last recomputation
    pub fn time_remaining(&self) -> Duration {
        self.time_remaining
    }

    pub fn is_clocked_in(&self) -> bool {
        self.status == ClockStatus::ClockedIn
    }

    /// Recompute the remaining time; `None` when there is no session end to
    /// count down to.
    pub(crate) fn recompute(&mut self, now: DateTime<Utc>) -> Option<Duration> {
        let end = self.session_end_time?;
        self.time_remaining = remaining_until(end, now);
        Some(self.time_remaining)
    }
}

/// Rebuild the clock state from the caller's attendance history.
///
/// The most recent record that was clocked in and still awaits a clock-out
/// wins, provided its session carries an end time and, when `cutoff` is set,
/// that end is not further than `cutoff` in the past.
pub fn derive_clock_state(
    records: &[AttendanceRecord],
    now: DateTime<Utc>,
    cutoff: Option<Duration>,
) -> ClockState {
    let open: Vec<(&AttendanceRecord, &SessionSummary)> = records
        .iter()
        .filter(|r| r.is_open_clock_in())
        .filter_map(|r| r.session.as_ref().map(|s| (r, s)))
        .filter(|(_, s)| !is_abandoned(s.valid_until, now, cutoff))
        .collect();

    if open.len() > 1 {
        warn!(
            "{} open clock-ins found in attendance history, using the most recent",
            open.len()
        );
    }

    if let Some((_, session)) = open.into_iter().max_by_key(|(r, _)| clock_in_key(r)) {
        return ClockState::clocked_in(&session.otp, session.valid_until, now);
    }

    let latest = records
        .iter()
        .filter(|r| r.clock_in_time.is_some())
        .max_by_key(|r| clock_in_key(r));

    match latest {
        Some(record) if record.clock_out_time.is_some() && !record.is_open_clock_in() => {
            ClockState::clocked_out()
        }
        _ => ClockState::not_clocked_in(),
    }
}

fn clock_in_key(record: &AttendanceRecord) -> (DateTime<Utc>, DateTime<Utc>) {
    (record.clock_in_time.unwrap_or(record.timestamp), record.timestamp)
}

fn is_abandoned(valid_until: DateTime<Utc>, now: DateTime<Utc>, cutoff: Option<Duration>) -> bool {
    match cutoff.and_then(|c| chrono::Duration::from_std(c).ok()) {
        Some(cutoff) => now > valid_until + cutoff,
        None => false,
    }
}
