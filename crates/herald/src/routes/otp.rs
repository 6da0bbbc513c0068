//! OTP request and verification endpoints.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use herald_common::constants::messages;
use herald_common::{IssueRequest, OtpError, SuccessResponse, VerifyRequest, mask_contact};

use super::ApiError;
use crate::state::AppState;

/// Issue a code to a phone number or email address
///
/// Returns:
/// - 200: Code stored and handed to the gateway
/// - 400: Missing fields or unknown method
/// - 429: Caller's issue window is full (applied by middleware)
/// - 500: Gateway failed or timed out
pub async fn request_otp(
    State(state): State<AppState>,
    payload: Result<Json<IssueRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let payload = body_or_default(payload);

    let (Some(contact), Some(method)) = (non_empty(payload.contact), non_empty(payload.method))
    else {
        return Err(OtpError::Validation(messages::ISSUE_FIELDS_REQUIRED.to_string()).into());
    };

    let receipt = state.issuer.issue(&contact, &method).await?;

    Ok(Json(SuccessResponse::new(format!(
        "OTP sent to {}",
        receipt.contact
    ))))
}

/// Check a code, consuming it on a match
///
/// Returns:
/// - 200: Code matched; the challenge is gone
/// - 400: Missing fields, no challenge, expired challenge, or wrong code
pub async fn verify_otp(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let payload = body_or_default(payload);

    let (Some(contact), Some(otp)) = (non_empty(payload.contact), non_empty(payload.otp)) else {
        return Err(OtpError::Validation(messages::VERIFY_FIELDS_REQUIRED.to_string()).into());
    };

    match state.store.consume(&contact, &otp) {
        Ok(()) => {
            tracing::info!(contact = %mask_contact(&contact), "OTP verified");
            Ok(Json(SuccessResponse::new(messages::VERIFIED)))
        }
        Err(e) => {
            tracing::debug!(
                contact = %mask_contact(&contact),
                reason = ?e,
                "OTP verification failed"
            );
            Err(e.into())
        }
    }
}

/// An unreadable body is treated like an empty one, so the caller gets the
/// "fields required" message
fn body_or_default<T: Default>(payload: Result<Json<T>, JsonRejection>) -> T {
    match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Unreadable request body");
            T::default()
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
