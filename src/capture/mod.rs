//! Geofenced OTP attendance capture
//!
//! [`AttendanceCaptureController`] drives one attendance attempt at a time:
//! OTP validation, a position fix, submission, and for sessions that need it
//! the clock-out that only opens once the class has ended.
//!
//! ```text
//! Idle --submit--> Submitting --clocked in--> ClockedIn --clock_out--> ClockingOut --ok--> Idle
//!                      |  \--marked / error--> Idle         ^                |
//!                                                           \----error-------/
//! ```

mod countdown;
mod error;
mod notice;
mod otp;
mod state;
mod time;

pub use error::{CaptureError, Result, ValidationError};
pub use notice::{with_remediation, NoticeLevel, Notification};
pub use otp::{decode_scanned, normalize_otp};
pub use state::{derive_clock_state, ClockState, ClockStatus, Phase};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};

use crate::config::ClientOptions;
use chrono::{DateTime, Utc};
use countdown::Countdown;
use log::{debug, info, trace, warn};
use rollcall_api::{
    ApiError, AttendanceApi, ClockOutRequest, ClockOutResponse, MarkAttendanceRequest,
    MarkAttendanceResponse,
};
use rollcall_geolocation::{acquire, GeolocationProvider, PositionOptions};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;

/// Something observers of the controller may want to render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CaptureEvent {
    PhaseChanged(Phase),
    Tick { remaining: Duration },
    Notice(Notification),
}

/// Result of a successful submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Attendance recorded; nothing else to do.
    Marked,
    /// Clocked in; clock-out opens at `session_end_time`.
    ClockedIn { session_end_time: DateTime<Utc> },
}

/// Result of a successful clock-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClockOutOutcome {
    pub minutes_attended: i64,
}

struct Inner {
    phase: Phase,
    clock: ClockState,
    draft_otp: String,
    notice: Option<Notification>,
    countdown: Option<Countdown>,
    /// Bumped on every committed clock transition.
    generation: u64,
    shut_down: bool,
}

/// State shared between the controller and its countdown task
pub(crate) struct Shared {
    inner: Mutex<Inner>,
    time: Arc<dyn TimeSource>,
    events: broadcast::Sender<CaptureEvent>,
}

impl Shared {
    fn new(time: Arc<dyn TimeSource>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            inner: Mutex::new(Inner {
                phase: Phase::Idle,
                clock: ClockState::not_clocked_in(),
                draft_otp: String::new(),
                notice: None,
                countdown: None,
                generation: 0,
                shut_down: false,
            }),
            time,
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: CaptureEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    /// Recompute the remaining time while clocked in.
    pub(crate) fn tick(&self) -> Option<Duration> {
        let mut inner = self.lock();
        if inner.phase != Phase::ClockedIn {
            return None;
        }
        let remaining = inner.clock.recompute(self.time.now())?;
        trace!("Countdown tick: {:?} remaining", remaining);
        self.emit(CaptureEvent::Tick { remaining });
        Some(remaining)
    }
}

/// Drives OTP submission, clock-in and the countdown-gated clock-out.
///
/// All methods take `&self`; share the controller behind an `Arc` to drive
/// it from several tasks. Only one attempt runs at a time, others are
/// refused with [`CaptureError::Busy`] before any request is made.
pub struct AttendanceCaptureController {
    api: Arc<dyn AttendanceApi>,
    geolocator: Arc<dyn GeolocationProvider>,
    options: ClientOptions,
    shared: Arc<Shared>,
}

impl AttendanceCaptureController {
    pub fn new(
        api: Arc<dyn AttendanceApi>,
        geolocator: Arc<dyn GeolocationProvider>,
        options: ClientOptions,
    ) -> Self {
        Self {
            api,
            geolocator,
            options,
            shared: Arc::new(Shared::new(Arc::new(SystemTimeSource))),
        }
    }

    /// Measure session ends against `time` instead of the system clock.
    pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.shared = Arc::new(Shared::new(time));
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.shared.events.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.shared.lock().phase
    }

    pub fn clock_state(&self) -> ClockState {
        self.shared.lock().clock.clone()
    }

    /// `max(0, session end - now)`, zero when not clocked in.
    pub fn time_remaining(&self) -> Duration {
        let inner = self.shared.lock();
        inner
            .clock
            .session_end_time()
            .map(|end| time::remaining_until(end, self.shared.time.now()))
            .unwrap_or(Duration::ZERO)
    }

    pub fn can_clock_out(&self) -> bool {
        self.phase() == Phase::ClockedIn && self.time_remaining().is_zero()
    }

    /// The current notification unless it has been dismissed.
    pub fn notice(&self) -> Option<Notification> {
        let now = self.shared.time.now();
        self.shared
            .lock()
            .notice
            .clone()
            .filter(|n| n.is_visible_at(now))
    }

    /// OTP kept after a failed submission so it can be corrected.
    pub fn draft_otp(&self) -> String {
        self.shared.lock().draft_otp.clone()
    }

    pub fn is_counting_down(&self) -> bool {
        self.shared.lock().countdown.is_some()
    }

    /// Recompute the remaining time now instead of waiting for the next tick.
    pub fn tick(&self) -> Option<Duration> {
        self.shared.tick()
    }

    /// Submit a typed OTP.
    pub async fn submit(&self, otp: &str) -> Result<SubmitOutcome> {
        let otp = {
            let mut inner = self.shared.lock();
            Self::ensure_idle(&inner)?;
            inner.draft_otp = otp.to_string();
            let otp = match normalize_otp(otp) {
                Ok(otp) => otp,
                Err(e) => {
                    self.notify(&mut inner, NoticeLevel::Warning, e.to_string());
                    return Err(e.into());
                }
            };
            self.set_phase(&mut inner, Phase::Submitting);
            otp
        };
        info!("Submitting attendance");

        let result = self.mark(&otp).await;

        let outcome = {
            let mut inner = self.shared.lock();
            if inner.shut_down {
                debug!("Discarding submission result after shutdown");
                return Err(CaptureError::Detached);
            }
            match result {
                Ok(resp) => Ok(self.commit_mark(&mut inner, &otp, resp)),
                Err(e) => {
                    self.set_phase(&mut inner, Phase::Idle);
                    self.notify_failure(&mut inner, &e);
                    Err(e)
                }
            }
        };

        if outcome.is_ok() {
            self.refresh_after_success().await;
        }
        outcome
    }

    /// Submit the OTP carried by a scanned QR payload.
    pub async fn submit_scanned(&self, payload: &str) -> Result<SubmitOutcome> {
        match decode_scanned(payload) {
            Ok(otp) => self.submit(&otp).await,
            Err(e) => {
                let mut inner = self.shared.lock();
                Self::ensure_idle(&inner)?;
                self.notify(&mut inner, NoticeLevel::Warning, e.to_string());
                Err(e.into())
            }
        }
    }

    async fn mark(&self, otp: &str) -> Result<MarkAttendanceResponse> {
        let options = PositionOptions::default()
            .with_timeout(self.options.geolocation_timeout)
            .with_maximum_age(self.options.mark_maximum_age);
        let position = acquire(self.geolocator.as_ref(), &options).await?;

        let request = MarkAttendanceRequest {
            otp: otp.to_string(),
            latitude: position.coords.latitude,
            longitude: position.coords.longitude,
            user_agent: Some(self.options.user_agent.clone()),
            screen_resolution: self.options.screen_resolution.clone(),
        };
        self.api
            .mark(&request)
            .await
            .map_err(|e| api_failure(e, notice::MARK_FAILED))
    }

    fn commit_mark(
        &self,
        inner: &mut Inner,
        otp: &str,
        resp: MarkAttendanceResponse,
    ) -> SubmitOutcome {
        inner.draft_otp.clear();
        inner.generation += 1;

        if resp.is_clocked_in {
            if let Some(end) = resp.resolved_session_end() {
                let state = ClockState::clocked_in(otp, end, self.shared.time.now());
                self.enter_clocked_in(inner, state);
                self.notify(inner, NoticeLevel::Success, notice::clocked_in_message(end));
                return SubmitOutcome::ClockedIn {
                    session_end_time: end,
                };
            }
            warn!("Clock-in confirmed without a session end time, waiting for history refresh");
        }

        self.set_phase(inner, Phase::Idle);
        let message = resp
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Attendance marked successfully".to_string());
        self.notify(inner, NoticeLevel::Success, message);
        SubmitOutcome::Marked
    }

    /// Clock out of the current session once it has ended.
    pub async fn clock_out(&self) -> Result<ClockOutOutcome> {
        let (otp, previous) = {
            let mut inner = self.shared.lock();
            if inner.shut_down {
                return Err(CaptureError::Detached);
            }
            match inner.phase {
                Phase::ClockedIn => {}
                Phase::Idle => {
                    let e = ValidationError::NotClockedIn;
                    self.notify(&mut inner, NoticeLevel::Warning, e.to_string());
                    return Err(e.into());
                }
                phase => return Err(CaptureError::Busy { phase }),
            }

            let (otp, end) = match (inner.clock.active_otp(), inner.clock.session_end_time()) {
                (Some(otp), Some(end)) => (otp.to_string(), end),
                _ => return Err(ValidationError::NotClockedIn.into()),
            };

            let remaining = time::remaining_until(end, self.shared.time.now());
            if !remaining.is_zero() {
                debug!("Clock-out refused, {:?} remaining", remaining);
                self.notify(&mut inner, NoticeLevel::Warning, notice::wait_message(remaining));
                return Err(ValidationError::ClockOutTooEarly { remaining }.into());
            }

            let previous = inner.clock.clone();
            inner.countdown = None;
            self.set_phase(&mut inner, Phase::ClockingOut);
            (otp, previous)
        };
        info!("Clocking out");

        let result = self.request_clock_out(&otp).await;

        let outcome = {
            let mut inner = self.shared.lock();
            if inner.shut_down {
                debug!("Discarding clock-out result after shutdown");
                return Err(CaptureError::Detached);
            }
            match result {
                Ok(resp) => {
                    inner.clock = ClockState::clocked_out();
                    inner.generation += 1;
                    self.set_phase(&mut inner, Phase::Idle);
                    self.notify(
                        &mut inner,
                        NoticeLevel::Success,
                        notice::clocked_out_message(resp.time_elapsed),
                    );
                    Ok(ClockOutOutcome {
                        minutes_attended: resp.time_elapsed,
                    })
                }
                Err(e) => {
                    self.enter_clocked_in(&mut inner, previous);
                    self.notify_failure(&mut inner, &e);
                    Err(e)
                }
            }
        };

        if outcome.is_ok() {
            self.refresh_after_success().await;
        }
        outcome
    }

    async fn request_clock_out(&self, otp: &str) -> Result<ClockOutResponse> {
        let options = PositionOptions::default()
            .with_timeout(self.options.geolocation_timeout)
            .with_maximum_age(Duration::ZERO);
        let position = acquire(self.geolocator.as_ref(), &options).await?;

        let request = ClockOutRequest {
            otp: otp.to_string(),
            latitude: position.coords.latitude,
            longitude: position.coords.longitude,
        };
        self.api
            .clock_out(&request)
            .await
            .map_err(|e| api_failure(e, notice::CLOCK_OUT_FAILED))
    }

    /// Fetch the attendance history and rebuild the clock state from it.
    ///
    /// The result replaces the local state wholesale. While an attempt is in
    /// flight the derived state is returned but not applied, and history
    /// loaded before a newer clock transition is discarded.
    pub async fn refresh(&self) -> Result<ClockState> {
        let started_at = {
            let inner = self.shared.lock();
            if inner.shut_down {
                return Err(CaptureError::Detached);
            }
            inner.generation
        };

        let records = self
            .api
            .list_attendance()
            .await
            .map_err(|e| api_failure(e, "Failed to load attendance history"))?;

        let mut inner = self.shared.lock();
        if inner.shut_down {
            return Err(CaptureError::Detached);
        }

        let derived = derive_clock_state(
            &records,
            self.shared.time.now(),
            self.options.abandoned_clock_in_cutoff,
        );
        if inner.phase.is_in_flight() {
            debug!("Attempt in flight, not applying refreshed clock state");
            return Ok(derived);
        }
        if inner.generation != started_at {
            debug!("Clock state changed while loading history, discarding refresh");
            return Ok(inner.clock.clone());
        }

        self.apply_derived(&mut inner, derived);
        Ok(inner.clock.clone())
    }

    async fn refresh_after_success(&self) {
        if let Err(e) = self.refresh().await {
            warn!("Attendance history refresh failed: {}", e);
        }
    }

    fn apply_derived(&self, inner: &mut Inner, derived: ClockState) {
        if derived.is_clocked_in() {
            let unchanged = inner.phase == Phase::ClockedIn
                && inner.countdown.is_some()
                && inner.clock.active_otp() == derived.active_otp()
                && inner.clock.session_end_time() == derived.session_end_time();
            if unchanged {
                inner.clock = derived;
            } else {
                self.enter_clocked_in(inner, derived);
            }
            return;
        }

        inner.countdown = None;
        inner.clock = derived;
        inner.generation += 1;
        if inner.phase != Phase::Idle {
            self.set_phase(inner, Phase::Idle);
        }
    }

    /// Stop the countdown and discard the results of attempts still running.
    pub fn shutdown(&self) {
        let mut inner = self.shared.lock();
        if !inner.shut_down {
            info!("Shutting down attendance capture");
        }
        inner.shut_down = true;
        inner.countdown = None;
    }

    fn ensure_idle(inner: &Inner) -> Result<()> {
        if inner.shut_down {
            return Err(CaptureError::Detached);
        }
        match inner.phase {
            Phase::Idle => Ok(()),
            phase => {
                debug!("Ignoring submission while {}", phase);
                Err(CaptureError::Busy { phase })
            }
        }
    }

    /// The session end is stored before the countdown starts.
    fn enter_clocked_in(&self, inner: &mut Inner, state: ClockState) {
        inner.clock = state;
        inner.generation += 1;
        inner.countdown = None;
        self.set_phase(inner, Phase::ClockedIn);
        inner.countdown =
            Countdown::start(Arc::downgrade(&self.shared), self.options.tick_interval);
    }

    fn set_phase(&self, inner: &mut Inner, phase: Phase) {
        if inner.phase != phase {
            info!("Attendance capture {} -> {}", inner.phase, phase);
            inner.phase = phase;
            self.shared.emit(CaptureEvent::PhaseChanged(phase));
        }
    }

    fn notify(&self, inner: &mut Inner, level: NoticeLevel, message: String) {
        let notice = Notification::new(
            level,
            message,
            self.shared.time.now(),
            self.options.notice_ttl,
        );
        inner.notice = Some(notice.clone());
        self.shared.emit(CaptureEvent::Notice(notice));
    }

    fn notify_failure(&self, inner: &mut Inner, error: &CaptureError) {
        let message = match error {
            CaptureError::Location(_) => notice::LOCATION_UNAVAILABLE.to_string(),
            CaptureError::BusinessRule { message } => with_remediation(message),
            other => other.to_string(),
        };
        self.notify(inner, NoticeLevel::Error, message);
    }
}

/// Server refusals keep their message, everything else gets `fallback`.
fn api_failure(error: ApiError, fallback: &str) -> CaptureError {
    match error {
        ApiError::Rejected { message, .. } => CaptureError::BusinessRule { message },
        other => {
            warn!("{}: {}", fallback, other);
            CaptureError::Transport {
                message: fallback.to_string(),
            }
        }
    }
}
