//! Handlers for short link management (create, read, delete).

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::url::{CreateUrlRequest, UrlResponse};
use crate::domain::entities::Link;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link.
///
/// # Endpoint
///
/// `POST /api/urls`
///
/// # Request Body
///
/// ```json
/// {
///   "original_url": "https://example.com",
///   "custom_slug": "promo",                          // optional
///   "expiration_date": "2030-01-01T00:00:00Z",       // optional
///   "utm_parameters": { "utm_source": "newsletter" } // optional
/// }
/// ```
///
/// # Response Codes
///
/// - **201 Created**: Link stored, body is the record plus `short_url`
/// - **400 Bad Request**: Invalid destination, expiration or slug
/// - **409 Conflict**: Custom slug already taken
/// - **500 Internal Server Error**: No free code found or store failure
pub async fn create_url_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateUrlRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UrlResponse>), AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let link = state.link_service.create_short_link(payload.into()).await?;

    Ok((StatusCode::CREATED, Json(to_response(&state, link))))
}

/// Returns a stored link by id.
///
/// # Endpoint
///
/// `GET /api/urls/{id}`
///
/// # Errors
///
/// Returns 404 Not Found if no link has this id.
pub async fn get_url_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<UrlResponse>, AppError> {
    let link = state.link_service.get_link(id).await?;
    Ok(Json(to_response(&state, link)))
}

/// Deletes a link and evicts it from the resolution cache.
///
/// # Endpoint
///
/// `DELETE /api/urls/{id}`
///
/// # Errors
///
/// Returns 404 Not Found if no link has this id.
pub async fn delete_url_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.link_service.delete_link(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn to_response(state: &AppState, link: Link) -> UrlResponse {
    let short_url = state.link_service.short_url(&link.code);
    let is_expired = state.link_service.is_expired(&link);
    UrlResponse::new(link, short_url, is_expired)
}
