//! Attendance API client for rollcall
//!
//! Typed access to the remote attendance service: marking attendance with an
//! OTP and coordinates, clocking out, and listing the caller's records.

mod client;
mod error;
mod fetch;
mod models;

pub use client::{AttendanceApi, AttendanceClient};
pub use error::{ApiError, Result};
pub use fetch::{Fetch, FetchBuilder};
pub use models::{
    AttendanceRecord, AttendanceStatus, ClassRef, ClassSummary, ClockOutRequest,
    ClockOutResponse, MarkAttendanceRequest, MarkAttendanceResponse, SessionSummary,
};
