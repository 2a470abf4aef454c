use chrono::{TimeZone, Utc};
use rollcall::capture::{CaptureError, ClockStatus, ManualTimeSource, Phase, SubmitOutcome};
use rollcall::config::{ClientOptions, RollcallConfig};
use rollcall::geolocation::FixedLocation;
use rollcall::Rollcall;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn setup() {
    let _ = pretty_env_logger::try_init();
}

fn open_history() -> serde_json::Value {
    json!([{
        "_id": "att-1",
        "timestamp": "2025-01-01T09:00:00Z",
        "clockInTime": "2025-01-01T09:00:00Z",
        "status": "CLOCKED_IN",
        "session": { "otp": "482913", "validUntil": "2025-01-01T10:30:00Z" }
    }])
}

fn closed_history() -> serde_json::Value {
    json!({ "records": [{
        "_id": "att-1",
        "timestamp": "2025-01-01T09:00:00Z",
        "clockInTime": "2025-01-01T09:00:00Z",
        "clockOutTime": "2025-01-01T10:31:00Z",
        "status": "CLOCKED_OUT",
        "session": { "otp": "482913", "validUntil": "2025-01-01T10:30:00Z" }
    }]})
}

#[tokio::test]
async fn test_clock_in_and_out_over_http() {
    setup();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/attendance/mark"))
        .and(header("Authorization", "Bearer student-token"))
        .and(body_json(json!({
            "otp": "482913",
            "latitude": 43.5842,
            "longitude": -84.7674,
            "userAgent": "rollcall-test"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Clocked in",
            "isClockedIn": true,
            "sessionEndTime": "2025-01-01T10:30:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/attendance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(open_history()))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/attendance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(closed_history()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/attendance/clock-out"))
        .and(body_json(json!({
            "otp": "482913",
            "latitude": 43.5842,
            "longitude": -84.7674
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timeElapsed": 47,
            "message": "Clocked out"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let clock = Arc::new(ManualTimeSource::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap(),
    ));
    let rollcall = Rollcall::new_with_options(
        &server.uri(),
        ClientOptions::default().with_user_agent("rollcall-test"),
    )
    .unwrap()
    .with_token("student-token");
    let capture = rollcall
        .capture(FixedLocation::new(43.5842, -84.7674))
        .unwrap()
        .with_time_source(clock.clone());

    let outcome = capture.submit("482913").await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::ClockedIn { .. }));
    assert_eq!(capture.phase(), Phase::ClockedIn);

    clock.set(Utc.with_ymd_and_hms(2025, 1, 1, 10, 30, 1).unwrap());
    assert!(capture.can_clock_out());

    let outcome = capture.clock_out().await.unwrap();
    assert_eq!(outcome.minutes_attended, 47);
    assert_eq!(capture.phase(), Phase::Idle);
    assert_eq!(capture.clock_state().status(), ClockStatus::ClockedOut);
    assert!(capture.notice().unwrap().message.contains("47 minutes"));
}

#[tokio::test]
async fn test_rejected_mark_over_http() {
    setup();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/attendance/mark"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Invalid or expired OTP"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/attendance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let config = RollcallConfig::new(&server.uri(), Some("student-token".to_string())).unwrap();
    let rollcall = Rollcall::from_config(config).unwrap();
    let capture = rollcall.capture(FixedLocation::new(43.5842, -84.7674)).unwrap();

    let err = capture.submit("000000").await.unwrap_err();

    assert_eq!(
        err,
        CaptureError::BusinessRule {
            message: "Invalid or expired OTP".to_string()
        }
    );
    assert_eq!(capture.phase(), Phase::Idle);
    assert_eq!(capture.draft_otp(), "000000");
}

#[tokio::test]
async fn test_server_error_over_http_is_generic() {
    setup();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/attendance/mark"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&server)
        .await;

    let rollcall = Rollcall::new(&server.uri()).unwrap();
    let capture = rollcall.capture(FixedLocation::new(0.0, 0.0)).unwrap();

    let err = capture.submit("482913").await.unwrap_err();

    assert_eq!(
        err,
        CaptureError::Transport {
            message: "Failed to mark attendance".to_string()
        }
    );
}

#[tokio::test]
async fn test_refresh_restores_clock_in_over_http() {
    setup();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/attendance"))
        .and(header("Authorization", "Bearer student-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(open_history()))
        .expect(1)
        .mount(&server)
        .await;

    let clock = Arc::new(ManualTimeSource::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap(),
    ));
    let capture = Rollcall::new(&server.uri())
        .unwrap()
        .with_token("student-token")
        .capture(FixedLocation::new(0.0, 0.0))
        .unwrap()
        .with_time_source(clock);

    let state = capture.refresh().await.unwrap();

    assert_eq!(state.active_otp(), Some("482913"));
    assert_eq!(capture.phase(), Phase::ClockedIn);
    assert_eq!(capture.time_remaining(), std::time::Duration::from_secs(30 * 60));
    capture.shutdown();
}
