//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use tracing::error;

use crate::domain::redirect::RedirectDecision;
use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its destination.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Resolve the code through the resolution cache (store on a miss)
/// 2. Reject expired links with 410 Gone, without counting a click
/// 3. Queue a click event for the background worker
/// 4. Return 302 Found with the composed target
///
/// # Errors
///
/// - 404 Not Found if the short code doesn't exist
/// - 410 Gone if the link has expired
/// - 500 Internal Server Error if the store fails or times out, or the
///   stored target cannot be sent as a `Location` header
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    match state.redirect_service.resolve(&code).await? {
        RedirectDecision::Redirect(target) => {
            let location = HeaderValue::try_from(target).map_err(|e| {
                error!(code = %code, error = %e, "Redirect target is not a valid header value");
                AppError::internal("Corrupt link record", json!({ "code": code }))
            })?;
            Ok((StatusCode::FOUND, [(header::LOCATION, location)]))
        }
        RedirectDecision::Expired => Err(AppError::expired(&code)),
    }
}
