//! API route configuration.

use crate::api::handlers::{create_url_handler, delete_url_handler, get_url_handler};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Short link management routes, nested under `/api`.
///
/// # Endpoints
///
/// - `POST   /urls`      - Create a short link
/// - `GET    /urls/{id}` - Fetch a stored link
/// - `DELETE /urls/{id}` - Delete a link
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/urls", post(create_url_handler))
        .route("/urls/{id}", get(get_url_handler).delete(delete_url_handler))
}
