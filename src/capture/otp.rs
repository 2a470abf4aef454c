//! OTP input handling: typed codes and scanned QR payloads

use super::error::ValidationError;
use url::Url;

/// Trim a typed OTP, refusing blank input.
pub fn normalize_otp(input: &str) -> Result<String, ValidationError> {
    let otp = input.trim();
    if otp.is_empty() {
        return Err(ValidationError::EmptyOtp);
    }
    Ok(otp.to_string())
}

/// Extract the OTP from a scanned QR payload.
///
/// Accepts a bare code, a link carrying the code in an `otp` or `code` query
/// parameter, or a JSON object with an `otp` field.
pub fn decode_scanned(payload: &str) -> Result<String, ValidationError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(ValidationError::UnreadableCode);
    }

    if payload.starts_with('{') {
        return from_json(payload);
    }

    if let Ok(url) = Url::parse(payload) {
        return url
            .query_pairs()
            .find(|(key, _)| *key == "otp" || *key == "code")
            .map(|(_, value)| value.trim().to_string())
            .filter(|otp| !otp.is_empty())
            .ok_or(ValidationError::UnreadableCode);
    }

    if payload.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Ok(payload.to_string());
    }

    Err(ValidationError::UnreadableCode)
}

fn from_json(payload: &str) -> Result<String, ValidationError> {
    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|_| ValidationError::UnreadableCode)?;
    let otp = match value.get("otp") {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return Err(ValidationError::UnreadableCode),
    };
    if otp.is_empty() {
        return Err(ValidationError::UnreadableCode);
    }
    Ok(otp)
}
